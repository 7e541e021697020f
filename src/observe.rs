use std::time::Duration;

use crate::error::Error;
use crate::session::Session;
use crate::types::ProtocolVersion;

pub(crate) fn record_ok(mode: &'static str, command: &'static str, elapsed: Duration) {
    let _ = (mode, command, elapsed);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ribcl_requests_total", "mode" => mode, "command" => command, "outcome" => "ok")
            .increment(1);
        metrics::histogram!("ribcl_request_seconds", "mode" => mode, "command" => command)
            .record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(
            mode,
            command,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "ribcl request ok"
        );
    }
}

pub(crate) fn record_err(
    mode: &'static str,
    command: &'static str,
    elapsed: Duration,
    err: &Error,
) {
    let _ = (mode, command, elapsed, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ribcl_requests_total", "mode" => mode, "command" => command, "outcome" => "err")
            .increment(1);
        metrics::counter!(
            "ribcl_request_errors_total",
            "mode" => mode,
            "command" => command,
            "kind" => error_kind(err)
        )
        .increment(1);
        metrics::histogram!("ribcl_request_seconds", "mode" => mode, "command" => command)
            .record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::warn!(
            mode,
            command,
            error = %err,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "ribcl request failed"
        );
    }
}

pub(crate) fn record_session(session: &Session, advertised: ProtocolVersion) {
    let _ = (session, advertised);

    #[cfg(feature = "tracing")]
    {
        match &session.capabilities {
            Some(caps) => tracing::info!(
                advertised = %advertised,
                version = %session.version,
                firmware = caps.firmware_version,
                processor = %caps.processor,
                dialect = ?session.dialect,
                "ribcl session negotiated"
            ),
            None => tracing::info!(
                advertised = %advertised,
                version = %session.version,
                dialect = ?session.dialect,
                "ribcl session negotiated"
            ),
        }
    }
}

#[cfg(feature = "metrics")]
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Io(_) => "io",
        Error::Timeout => "timeout",
        Error::AccessDenied(_) => "access_denied",
        Error::Protocol(_) | Error::ProtocolOwned(_) => "protocol",
        Error::InvalidArgument(_) => "invalid_argument",
        Error::PowerStateNotReached { .. } => "power_state_not_reached",
    }
}
