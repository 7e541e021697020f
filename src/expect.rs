//! Pattern-matched waiting on the controller's reply stream.
//!
//! Incoming bytes accumulate in a [`ResponseBuffer`]. After every chunk the buffer is matched
//! against the awaited [`Pattern`]; on a match, everything up to the end of the match is consumed
//! and the remainder stays buffered for the next wait.

use std::time::{Duration, Instant};

use regex::bytes::{Regex, RegexBuilder};

use crate::error::{Error, Result};
#[cfg(feature = "async")]
use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
use crate::transport::Transport;

/// Read size per transport call.
const CHUNK_SIZE: usize = 4096;

/// Most unmatched reply bytes held before a wait gives up.
const MAX_PENDING: usize = 256 * 1024;

const TIMED_OUT: &str = "timed out waiting for controller";
const CLOSED: &str = "controller closed the stream";

/// A named reply pattern.
#[derive(Debug)]
pub(crate) struct Pattern {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    name: &'static str,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern from a constant expression.
    ///
    /// Unicode mode is off so that `.` and classes match arbitrary bytes; controllers do not
    /// always send valid UTF-8.
    pub(crate) fn new(name: &'static str, expr: &str) -> Self {
        Self {
            name,
            regex: RegexBuilder::new(expr)
                .unicode(false)
                .build()
                .expect("reply pattern is valid"),
        }
    }
}

/// A successful wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Match {
    /// Text received before the match.
    pub(crate) before: String,
    groups: Vec<Option<String>>,
}

impl Match {
    /// Capture group `index` (1-based, like the regex).
    pub(crate) fn group(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(|g| g.as_deref())
    }
}

/// Received-but-unmatched reply bytes.
#[derive(Debug, Default)]
pub(crate) struct ResponseBuffer {
    pending: Vec<u8>,
}

impl ResponseBuffer {
    /// Append a received chunk, refusing to grow past [`MAX_PENDING`].
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<()> {
        crate::debug::dump_text("ribcl recv", chunk);
        if self.pending.len() + chunk.len() > MAX_PENDING {
            self.pending.clear();
            return Err(Error::Protocol("controller reply exceeds buffer limit"));
        }
        self.pending.extend_from_slice(chunk);
        Ok(())
    }

    /// Match `pattern` against the buffered bytes, consuming through the end of the match.
    pub(crate) fn take_match(&mut self, pattern: &Pattern) -> Option<Match> {
        let caps = pattern.regex.captures(&self.pending)?;
        let whole = caps.get(0)?;
        let end = whole.end();
        let before = String::from_utf8_lossy(&self.pending[..whole.start()]).into_owned();
        let groups = caps
            .iter()
            .skip(1)
            .map(|g| g.map(|g| String::from_utf8_lossy(g.as_bytes()).into_owned()))
            .collect();
        self.pending.drain(..end);
        Some(Match { before, groups })
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Write `text` to the transport.
#[cfg(feature = "blocking")]
pub(crate) fn send<T: Transport + ?Sized>(transport: &mut T, text: &str) -> Result<()> {
    crate::debug::dump_text("ribcl send", text.as_bytes());
    transport.send(text.as_bytes())
}

/// Wait until `pattern` shows up in the reply stream or `timeout` expires.
///
/// Timeouts and end of stream are reported as [`Error::AccessDenied`].
#[cfg(feature = "blocking")]
pub(crate) fn expect<T: Transport + ?Sized>(
    transport: &mut T,
    buffer: &mut ResponseBuffer,
    pattern: &Pattern,
    timeout: Duration,
) -> Result<Match> {
    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        if let Some(found) = buffer.take_match(pattern) {
            return Ok(found);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(wait_failed(pattern, TIMED_OUT));
        }
        match transport.recv(&mut chunk, remaining) {
            Ok(0) => return Err(wait_failed(pattern, CLOSED)),
            Ok(n) => buffer.push(&chunk[..n])?,
            Err(Error::Timeout) => return Err(wait_failed(pattern, TIMED_OUT)),
            Err(e) => return Err(e),
        }
    }
}

/// Write `text` to the transport.
#[cfg(feature = "async")]
pub(crate) async fn send_async<T: AsyncTransport + ?Sized>(
    transport: &mut T,
    text: &str,
) -> Result<()> {
    crate::debug::dump_text("ribcl send", text.as_bytes());
    transport.send(text.as_bytes()).await
}

/// Async variant of [`expect`].
#[cfg(feature = "async")]
pub(crate) async fn expect_async<T: AsyncTransport + ?Sized>(
    transport: &mut T,
    buffer: &mut ResponseBuffer,
    pattern: &Pattern,
    timeout: Duration,
) -> Result<Match> {
    let deadline = Instant::now() + timeout;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if let Some(found) = buffer.take_match(pattern) {
            return Ok(found);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(wait_failed(pattern, TIMED_OUT));
        }
        match transport.recv(&mut chunk, remaining).await {
            Ok(0) => return Err(wait_failed(pattern, CLOSED)),
            Ok(n) => buffer.push(&chunk[..n])?,
            Err(Error::Timeout) => return Err(wait_failed(pattern, TIMED_OUT)),
            Err(e) => return Err(e),
        }
    }
}

fn wait_failed(pattern: &Pattern, reason: &'static str) -> Error {
    let _ = pattern;

    #[cfg(feature = "tracing")]
    tracing::debug!(pattern = pattern.name, reason, "ribcl wait failed");

    Error::AccessDenied(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_match_consumes_through_match() {
        let pattern = Pattern::new("end", r"</RIBCL>|<END_RIBCL/>");
        let mut buffer = ResponseBuffer::default();
        buffer
            .push(b"<RIBCL VERSION=\"2.22\">\r\n<RESPONSE />\r\n</RIB")
            .expect("push");
        assert!(buffer.take_match(&pattern).is_none());

        buffer.push(b"CL>\r\ntrailing").expect("push");
        let found = buffer.take_match(&pattern).expect("match");
        assert_eq!(found.before, "<RIBCL VERSION=\"2.22\">\r\n<RESPONSE />\r\n");
        assert_eq!(buffer.pending(), b"\r\ntrailing");
    }

    #[test]
    fn groups_are_one_based() {
        let pattern = Pattern::new("power", r#"HOST_POWER="(.*?)""#);
        let mut buffer = ResponseBuffer::default();
        buffer
            .push(b"<GET_HOST_POWER HOST_POWER=\"ON\" />")
            .expect("push");
        let found = buffer.take_match(&pattern).expect("match");
        assert_eq!(found.group(1), Some("ON"));
        assert_eq!(found.group(0), None);
        assert_eq!(found.group(2), None);
        assert_eq!(found.before, "<GET_HOST_POWER ");
    }

    #[test]
    fn invalid_utf8_still_matches() {
        let pattern = Pattern::new("power", r#"HOST_POWER="(.*?)""#);
        let mut buffer = ResponseBuffer::default();
        buffer
            .push(b"\xfe<GET_HOST_POWER HOST_POWER=\"O\xffN\" />")
            .expect("push");
        let found = buffer.take_match(&pattern).expect("match");
        assert_eq!(found.group(1), Some("O\u{fffd}N"));
        assert!(found.before.starts_with('\u{fffd}'));
    }

    #[test]
    fn oversized_reply_is_rejected() {
        let mut buffer = ResponseBuffer::default();
        let chunk = vec![b'x'; CHUNK_SIZE];
        for _ in 0..MAX_PENDING / CHUNK_SIZE {
            buffer.push(&chunk).expect("within limit");
        }
        let err = buffer.push(b"x").expect_err("over limit");
        assert!(err.is_protocol());
        assert!(buffer.pending().is_empty());
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use std::collections::VecDeque;

        use super::*;

        struct Scripted(VecDeque<Result<Vec<u8>>>);

        impl Transport for Scripted {
            fn send(&mut self, _data: &[u8]) -> Result<()> {
                Ok(())
            }

            fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
                match self.0.pop_front() {
                    Some(Ok(bytes)) => {
                        buf[..bytes.len()].copy_from_slice(&bytes);
                        Ok(bytes.len())
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(0),
                }
            }
        }

        #[test]
        fn expect_accumulates_chunks() {
            let pattern = Pattern::new("tag end", r"/>");
            let mut transport = Scripted(VecDeque::from([
                Ok(b"FIRMWARE_VERSION = \"1.50\"\n".to_vec()),
                Ok(b"MANAGEMENT_PROCESSOR = \"iLO2\"\n/>".to_vec()),
            ]));
            let mut buffer = ResponseBuffer::default();
            let found = expect(&mut transport, &mut buffer, &pattern, Duration::from_secs(1))
                .expect("match");
            assert!(found.before.contains("MANAGEMENT_PROCESSOR"));
        }

        #[test]
        fn expect_maps_timeout_and_eof_to_access_denied() {
            let pattern = Pattern::new("never", r"NEVER");

            let mut transport = Scripted(VecDeque::from([Err(Error::Timeout)]));
            let err = expect(
                &mut transport,
                &mut ResponseBuffer::default(),
                &pattern,
                Duration::from_secs(1),
            )
            .expect_err("timeout");
            assert!(matches!(err, Error::AccessDenied(TIMED_OUT)));

            let mut transport = Scripted(VecDeque::from([Ok(b"noise".to_vec())]));
            let err = expect(
                &mut transport,
                &mut ResponseBuffer::default(),
                &pattern,
                Duration::from_secs(1),
            )
            .expect_err("eof");
            assert!(matches!(err, Error::AccessDenied(CLOSED)));
        }

        #[test]
        fn expect_respects_zero_deadline() {
            let pattern = Pattern::new("never", r"NEVER");
            let mut transport = Scripted(VecDeque::from([Ok(b"NEVER".to_vec())]));
            let err = expect(
                &mut transport,
                &mut ResponseBuffer::default(),
                &pattern,
                Duration::ZERO,
            )
            .expect_err("deadline");
            assert!(matches!(err, Error::AccessDenied(TIMED_OUT)));
        }
    }
}
