use crate::client::core::Settings;
use crate::error::Result;
#[cfg(feature = "blocking")]
use crate::expect::{expect, send};
#[cfg(feature = "async")]
use crate::expect::{expect_async, send_async};
use crate::expect::ResponseBuffer;
use crate::protocol;
#[cfg(feature = "async")]
use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
use crate::transport::Transport;
use crate::types::{Capabilities, PowerControlDialect, ProtocolVersion};

/// What negotiation learned about the controller. Read-only afterwards.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) version: ProtocolVersion,
    pub(crate) capabilities: Option<Capabilities>,
    pub(crate) dialect: PowerControlDialect,
}

impl Session {
    pub(crate) fn new(version: ProtocolVersion, capabilities: Option<Capabilities>) -> Self {
        let dialect = PowerControlDialect::select(version, capabilities.as_ref());
        Self {
            version,
            capabilities,
            dialect,
        }
    }
}

/// Greet the controller, log in and, on RIBCL 2.0+, read its firmware metadata.
#[cfg(feature = "blocking")]
pub(crate) fn establish_session<T: Transport + ?Sized>(
    transport: &mut T,
    buffer: &mut ResponseBuffer,
    settings: &Settings,
) -> Result<Session> {
    // --- Greeting ---
    send(transport, protocol::PROLOGUE)?;
    let greeting = expect(
        transport,
        buffer,
        &protocol::GREETING_END,
        settings.login_timeout,
    )?;
    let discovered = protocol::parse_greeting_version(&greeting.before)?;
    let version = settings.pinned_version.unwrap_or(discovered);

    // --- Login ---
    send(transport, &protocol::dialect_declaration(version))?;
    send(transport, &protocol::login_open(&settings.credentials))?;

    let capabilities = if version.is_v2() {
        send(transport, protocol::FW_VERSION_QUERY)?;
        send(transport, protocol::RIB_INFO_CLOSE)?;
        expect(
            transport,
            buffer,
            &protocol::FW_VERSION_REPLY,
            settings.command_timeout,
        )?;
        let attributes = expect(
            transport,
            buffer,
            &protocol::TAG_END,
            settings.command_timeout,
        )?;
        Some(protocol::parse_capabilities(&attributes.before)?)
    } else {
        None
    };

    send(transport, protocol::LOGIN_CLOSE)?;

    let session = Session::new(version, capabilities);
    crate::observe::record_session(&session, discovered);
    Ok(session)
}

/// Async variant of [`establish_session`].
#[cfg(feature = "async")]
pub(crate) async fn establish_session_async<T: AsyncTransport + ?Sized>(
    transport: &mut T,
    buffer: &mut ResponseBuffer,
    settings: &Settings,
) -> Result<Session> {
    // --- Greeting ---
    send_async(transport, protocol::PROLOGUE).await?;
    let greeting = expect_async(
        transport,
        buffer,
        &protocol::GREETING_END,
        settings.login_timeout,
    )
    .await?;
    let discovered = protocol::parse_greeting_version(&greeting.before)?;
    let version = settings.pinned_version.unwrap_or(discovered);

    // --- Login ---
    send_async(transport, &protocol::dialect_declaration(version)).await?;
    send_async(transport, &protocol::login_open(&settings.credentials)).await?;

    let capabilities = if version.is_v2() {
        send_async(transport, protocol::FW_VERSION_QUERY).await?;
        send_async(transport, protocol::RIB_INFO_CLOSE).await?;
        expect_async(
            transport,
            buffer,
            &protocol::FW_VERSION_REPLY,
            settings.command_timeout,
        )
        .await?;
        let attributes = expect_async(
            transport,
            buffer,
            &protocol::TAG_END,
            settings.command_timeout,
        )
        .await?;
        Some(protocol::parse_capabilities(&attributes.before)?)
    } else {
        None
    };

    send_async(transport, protocol::LOGIN_CLOSE).await?;

    let session = Session::new(version, capabilities);
    crate::observe::record_session(&session, discovered);
    Ok(session)
}
