use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use crate::client::core::{ClientBuilder, ClientCore, fence_steps};
use crate::error::{Error, Result};
use crate::expect::{ResponseBuffer, expect, send};
use crate::protocol;
use crate::session::establish_session;
use crate::transport::Transport;
use crate::transport::blocking::TcpTransport;
use crate::types::{Capabilities, PowerAction, PowerControlDialect, PowerState, ProtocolVersion};

/// A blocking RIBCL client.
///
/// `Client` owns one logged-in stream to an iLO controller and issues power commands over it.
/// Every call is a complete send-then-wait exchange; nothing is pipelined or retried.
pub struct Client {
    transport: Box<dyn Transport + Send>,
    buffer: ResponseBuffer,
    core: ClientCore,
}

impl ClientBuilder {
    /// Open a plain TCP stream to `target` and negotiate a session over it.
    ///
    /// See [`TcpTransport`] for why this is mostly useful behind a TLS tunnel.
    pub fn connect(self, target: SocketAddr) -> Result<Client> {
        let transport = TcpTransport::connect(target, self.login_timeout_value())?;
        self.build(transport)
    }

    /// Negotiate a session over an already connected `transport`.
    pub fn build<T: Transport + Send + 'static>(self, transport: T) -> Result<Client> {
        let settings = self.into_settings()?;
        let mut transport: Box<dyn Transport + Send> = Box::new(transport);
        let mut buffer = ResponseBuffer::default();

        let start = Instant::now();
        let result = establish_session(&mut *transport, &mut buffer, &settings);
        record("negotiate", start, &result);
        let session = result?;

        Ok(Client {
            transport,
            buffer,
            core: ClientCore::new(settings, session),
        })
    }
}

impl Client {
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
    pub fn get_power_status(&mut self) -> Result<PowerState> {
        let start = Instant::now();
        let result = self.get_power_status_inner();
        record("get_power_status", start, &result);
        result
    }

    /// Send the power command for `action` in this controller's dialect.
    ///
    /// The command is not acknowledged; use [`Client::fence`] to wait for the result.
    pub fn set_power_status(&mut self, action: PowerAction) -> Result<()> {
        let start = Instant::now();
        let result = self.set_power_status_inner(action);
        record("set_power_status", start, &result);
        result
    }

    /// Drive the host to the state `action` asks for and wait until it gets there.
    ///
    /// Commands are only sent when the host is not already in the target state, so toggle-style
    /// dialects never flip a host the wrong way.
    pub fn fence(&mut self, action: PowerAction) -> Result<()> {
        let start = Instant::now();
        let result = self.fence_inner(action);
        record("fence", start, &result);
        result
    }

    fn get_power_status_inner(&mut self) -> Result<PowerState> {
        let request = self.core.power_status_request();
        send(&mut *self.transport, &request)?;
        let reply = expect(
            &mut *self.transport,
            &mut self.buffer,
            &protocol::HOST_POWER,
            self.core.settings().power_timeout,
        )?;
        ClientCore::parse_power_status(&reply)
    }

    fn set_power_status_inner(&mut self, action: PowerAction) -> Result<()> {
        let request = self.core.power_command_request(action)?;
        send(&mut *self.transport, &request)
    }

    fn fence_inner(&mut self, action: PowerAction) -> Result<()> {
        for &step in fence_steps(action) {
            let Some(target) = step.target_state() else {
                continue;
            };
            if self.get_power_status()? == target {
                continue;
            }
            self.set_power_status(step)?;
            thread::sleep(self.core.settings().power_wait);
            self.wait_for(target)?;
        }
        Ok(())
    }

    fn wait_for(&mut self, target: PowerState) -> Result<()> {
        let deadline = Instant::now() + self.core.settings().power_timeout;
        loop {
            if self.get_power_status()? == target {
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::PowerStateNotReached { expected: target });
            }
            thread::sleep(self.core.settings().poll_interval.min(remaining));
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

fn record<T>(command: &'static str, start: Instant, result: &Result<T>) {
    let elapsed: Duration = start.elapsed();
    match result {
        Ok(_) => crate::observe::record_ok("blocking", command, elapsed),
        Err(err) => crate::observe::record_err("blocking", command, elapsed, err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    const GREETING: &str = "<RIBCL VERSION=\"2.30\">\r\n</RIBCL>\r\n";
    const FW_ILO: &str =
        "<GET_FW_VERSION\r\n FIRMWARE_VERSION = \"1.91\"\r\n MANAGEMENT_PROCESSOR = \"iLO\"\r\n />\r\n";

    /// Simulated controller: answers every status query from a shared power state and flips it
    /// when a power command arrives.
    #[derive(Clone)]
    struct FakeIlo {
        state: Arc<Mutex<FakeState>>,
    }

    struct FakeState {
        power: PowerState,
        outbox: Vec<u8>,
        sent: Vec<String>,
        ignore_commands: bool,
    }

    impl FakeIlo {
        fn new(power: PowerState) -> Self {
            let mut outbox = GREETING.as_bytes().to_vec();
            outbox.extend_from_slice(FW_ILO.as_bytes());
            Self {
                state: Arc::new(Mutex::new(FakeState {
                    power,
                    outbox,
                    sent: Vec::new(),
                    ignore_commands: false,
                })),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.state
                .lock()
                .expect("lock")
                .sent
                .iter()
                .filter(|s| s.contains("MODE=\"write\""))
                .cloned()
                .collect()
        }
    }

    impl Transport for FakeIlo {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            let text = String::from_utf8_lossy(data).into_owned();
            let mut state = self.state.lock().expect("lock");
            if text.contains("GET_HOST_POWER_STATUS") {
                let reply = format!(
                    "<GET_HOST_POWER\r\n HOST_POWER=\"{}\"\r\n />\r\n",
                    state.power.as_str().to_uppercase()
                );
                state.outbox.extend_from_slice(reply.as_bytes());
            } else if !state.ignore_commands {
                if text.contains("HOLD_PWR_BTN") {
                    state.power = PowerState::Off;
                } else if text.contains("PRESS_PWR_BTN") {
                    state.power = PowerState::On;
                }
            }
            state.sent.push(text);
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            let mut state = self.state.lock().expect("lock");
            if state.outbox.is_empty() {
                return Err(Error::Timeout);
            }
            let n = state.outbox.len().min(buf.len());
            buf[..n].copy_from_slice(&state.outbox[..n]);
            state.outbox.drain(..n);
            Ok(n)
        }
    }

    fn client(fake: &FakeIlo) -> Client {
        Client::builder()
            .username("admin")
            .password("secret")
            .power_timeout(Duration::from_millis(50))
            .poll_interval(Duration::ZERO)
            .build(fake.clone())
            .expect("client")
    }

    #[test]
    fn fence_off_powers_down_once() {
        let fake = FakeIlo::new(PowerState::On);
        let mut client = client(&fake);
        assert_eq!(client.dialect(), PowerControlDialect::ModernPressOrHold);

        client.fence(PowerAction::Off).expect("fence off");
        assert_eq!(client.get_power_status().expect("status"), PowerState::Off);
        let commands = fake.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("<HOLD_PWR_BTN/>"));
    }

    #[test]
    fn fence_skips_when_already_in_state() {
        let fake = FakeIlo::new(PowerState::Off);
        let mut client = client(&fake);

        client.fence(PowerAction::Off).expect("fence off");
        assert!(fake.commands().is_empty());
    }

    #[test]
    fn fence_cycle_goes_off_then_on() {
        let fake = FakeIlo::new(PowerState::On);
        let mut client = client(&fake);

        client.fence(PowerAction::Cycle).expect("cycle");
        let commands = fake.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("<HOLD_PWR_BTN/>"));
        assert!(commands[1].contains("<PRESS_PWR_BTN/>"));
        assert_eq!(client.get_power_status().expect("status"), PowerState::On);
    }

    #[test]
    fn fence_reports_unreached_state() {
        let fake = FakeIlo::new(PowerState::On);
        fake.state.lock().expect("lock").ignore_commands = true;
        let mut client = client(&fake);

        let err = client.fence(PowerAction::Off).expect_err("stuck");
        assert!(matches!(
            err,
            Error::PowerStateNotReached {
                expected: PowerState::Off
            }
        ));
    }
}
