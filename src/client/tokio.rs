use std::net::SocketAddr;
use std::time::Instant;

use tokio::net::TcpStream;

use crate::client::core::{ClientBuilder, ClientCore, fence_steps};
use crate::error::{Error, Result};
use crate::expect::{ResponseBuffer, expect_async, send_async};
use crate::protocol;
use crate::session::establish_session_async;
use crate::transport::AsyncTransport;
use crate::transport::tokio::StreamTransport;
use crate::types::{Capabilities, PowerAction, PowerControlDialect, PowerState, ProtocolVersion};

/// A Tokio-based RIBCL client.
///
/// Same exchanges as [`crate::Client`], one at a time, over an [`AsyncTransport`].
pub struct AsyncClient {
    transport: Box<dyn AsyncTransport + Send>,
    buffer: ResponseBuffer,
    core: ClientCore,
}

impl ClientBuilder {
    /// Open a plain TCP stream to `target` and negotiate a session over it.
    pub async fn connect_async(self, target: SocketAddr) -> Result<AsyncClient> {
        let transport: StreamTransport<TcpStream> =
            StreamTransport::connect(target, self.login_timeout_value()).await?;
        self.build_async(transport).await
    }

    /// Negotiate a session over an already connected `transport`.
    pub async fn build_async<T: AsyncTransport + Send + 'static>(
        self,
        transport: T,
    ) -> Result<AsyncClient> {
        let settings = self.into_settings()?;
        let mut transport: Box<dyn AsyncTransport + Send> = Box::new(transport);
        let mut buffer = ResponseBuffer::default();

        let start = Instant::now();
        let result = establish_session_async(&mut *transport, &mut buffer, &settings).await;
        record("negotiate", start, &result);
        let session = result?;

        Ok(AsyncClient {
            transport,
            buffer,
            core: ClientCore::new(settings, session),
        })
    }
}

impl AsyncClient {
    /// Create a [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// RIBCL version in effect for this session.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.core.protocol_version()
    }

    /// Firmware metadata, present only on RIBCL 2.0+ sessions.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.core.capabilities()
    }

    /// Power-control dialect chosen for this controller.
    pub fn dialect(&self) -> PowerControlDialect {
        self.core.dialect()
    }

    /// Read the host's current power state.
    pub async fn get_power_status(&mut self) -> Result<PowerState> {
        let start = Instant::now();
        let result = self.get_power_status_inner().await;
        record("get_power_status", start, &result);
        result
    }

    /// Send the power command for `action` in this controller's dialect.
    pub async fn set_power_status(&mut self, action: PowerAction) -> Result<()> {
        let start = Instant::now();
        let result = self.set_power_status_inner(action).await;
        record("set_power_status", start, &result);
        result
    }

    /// Drive the host to the state `action` asks for and wait until it gets there.
    pub async fn fence(&mut self, action: PowerAction) -> Result<()> {
        let start = Instant::now();
        let result = self.fence_inner(action).await;
        record("fence", start, &result);
        result
    }

    async fn get_power_status_inner(&mut self) -> Result<PowerState> {
        let request = self.core.power_status_request();
        send_async(&mut *self.transport, &request).await?;
        let reply = expect_async(
            &mut *self.transport,
            &mut self.buffer,
            &protocol::HOST_POWER,
            self.core.settings().power_timeout,
        )
        .await?;
        ClientCore::parse_power_status(&reply)
    }

    async fn set_power_status_inner(&mut self, action: PowerAction) -> Result<()> {
        let request = self.core.power_command_request(action)?;
        send_async(&mut *self.transport, &request).await
    }

    async fn fence_inner(&mut self, action: PowerAction) -> Result<()> {
        for &step in fence_steps(action) {
            let Some(target) = step.target_state() else {
                continue;
            };
            if self.get_power_status().await? == target {
                continue;
            }
            self.set_power_status(step).await?;
            tokio::time::sleep(self.core.settings().power_wait).await;
            self.wait_for(target).await?;
        }
        Ok(())
    }

    async fn wait_for(&mut self, target: PowerState) -> Result<()> {
        let deadline = Instant::now() + self.core.settings().power_timeout;
        loop {
            if self.get_power_status().await? == target {
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::PowerStateNotReached { expected: target });
            }
            tokio::time::sleep(self.core.settings().poll_interval.min(remaining)).await;
        }
    }
}

impl std::fmt::Debug for AsyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

fn record<T>(command: &'static str, start: Instant, result: &Result<T>) {
    let elapsed = start.elapsed();
    match result {
        Ok(_) => crate::observe::record_ok("async", command, elapsed),
        Err(err) => crate::observe::record_err("async", command, elapsed, err),
    }
}
