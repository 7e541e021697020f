use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// `set_read_timeout` rejects a zero duration.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Blocking TCP transport.
///
/// Carries RIBCL in the clear. Real iLO cards only speak RIBCL inside TLS on port 443; wrap the
/// stream yourself (or go through a TLS tunnel) and implement [`Transport`] for it.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `target`, giving up after `timeout`.
    pub fn connect(target: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&target, timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.stream
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(Error::Timeout),
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    #[test]
    fn recv_reports_timeout_then_data() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().expect("accept");
            let mut line = [0u8; 4];
            peer.read_exact(&mut line).expect("read");
            peer.write_all(b"pong").expect("write");
        });

        let mut transport = TcpTransport::connect(addr, Duration::from_secs(1)).expect("connect");
        let mut buf = [0u8; 16];
        let err = transport
            .recv(&mut buf, Duration::from_millis(20))
            .expect_err("nothing sent yet");
        assert!(matches!(err, Error::Timeout));

        transport.send(b"ping").expect("send");
        let mut got = Vec::new();
        while got.len() < 4 {
            let n = transport
                .recv(&mut buf, Duration::from_secs(1))
                .expect("recv");
            assert_ne!(n, 0, "unexpected eof");
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"pong");
        server.join().expect("server");

        let n = transport
            .recv(&mut buf, Duration::from_secs(1))
            .expect("eof");
        assert_eq!(n, 0);
    }
}
