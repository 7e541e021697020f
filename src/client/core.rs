use std::time::Duration;

use crate::error::{Error, Result};
use crate::expect::Match;
use crate::protocol;
use crate::secret::SecretString;
use crate::session::Session;
use crate::types::{
    Capabilities, Credentials, PowerAction, PowerControlDialect, PowerState, ProtocolVersion,
};

/// Per-client configuration, fixed once the builder finishes.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) credentials: Credentials,
    pub(crate) pinned_version: Option<ProtocolVersion>,
    pub(crate) login_timeout: Duration,
    pub(crate) command_timeout: Duration,
    pub(crate) power_timeout: Duration,
    pub(crate) power_wait: Duration,
    pub(crate) poll_interval: Duration,
}

/// Builder for [`crate::Client`] and [`crate::AsyncClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    username: Option<String>,
    password: Option<SecretString>,
    ribcl_version: Option<ProtocolVersion>,
    login_timeout: Duration,
    command_timeout: Duration,
    power_timeout: Duration,
    power_wait: Duration,
    poll_interval: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            username: None,
            password: None,
            ribcl_version: None,
            login_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(3),
            power_timeout: Duration::from_secs(20),
            power_wait: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Set the login name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Force a RIBCL version instead of the one the controller advertises.
    pub fn ribcl_version(mut self, version: f64) -> Self {
        self.ribcl_version = Some(ProtocolVersion::new(version));
        self
    }

    /// How long to wait for the controller's greeting (default 10s).
    ///
    /// Also used as the TCP connect timeout.
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// How long to wait for replies to ordinary commands (default 3s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// How long to wait for a power status reply, and for the host to reach a requested state
    /// while fencing (default 20s).
    pub fn power_timeout(mut self, timeout: Duration) -> Self {
        self.power_timeout = timeout;
        self
    }

    /// Pause after issuing a power command before polling the status (default 0s).
    pub fn power_wait(mut self, wait: Duration) -> Self {
        self.power_wait = wait;
        self
    }

    /// Pause between status polls while fencing (default 1s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub(crate) fn login_timeout_value(&self) -> Duration {
        self.login_timeout
    }

    pub(crate) fn into_settings(self) -> Result<Settings> {
        let username = self
            .username
            .ok_or(Error::InvalidArgument("username is required"))?;
        let password = self
            .password
            .ok_or(Error::InvalidArgument("password is required"))?;
        if username.is_empty() {
            return Err(Error::InvalidArgument("username must not be empty"));
        }
        if let Some(version) = self.ribcl_version {
            if !version.value().is_finite() || version.value() <= 0.0 {
                return Err(Error::InvalidArgument("RIBCL version must be positive"));
            }
        }

        Ok(Settings {
            credentials: Credentials { username, password },
            pinned_version: self.ribcl_version,
            login_timeout: self.login_timeout,
            command_timeout: self.command_timeout,
            power_timeout: self.power_timeout,
            power_wait: self.power_wait,
            poll_interval: self.poll_interval,
        })
    }
}

/// Transport-independent client state: settings plus the negotiated session.
#[derive(Debug)]
pub(crate) struct ClientCore {
    settings: Settings,
    session: Session,
}

impl ClientCore {
    pub(crate) fn new(settings: Settings, session: Session) -> Self {
        Self { settings, session }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn protocol_version(&self) -> ProtocolVersion {
        self.session.version
    }

    pub(crate) fn capabilities(&self) -> Option<&Capabilities> {
        self.session.capabilities.as_ref()
    }

    pub(crate) fn dialect(&self) -> PowerControlDialect {
        self.session.dialect
    }

    /// Full `GET_HOST_POWER_STATUS` request, inside its own `LOGIN` envelope.
    pub(crate) fn power_status_request(&self) -> String {
        let mut request = protocol::login_open(&self.settings.credentials);
        request.push_str(protocol::POWER_STATUS_QUERY);
        request.push_str(protocol::SERVER_INFO_LOGIN_CLOSE);
        request
    }

    /// Full power-control request for `action` in this session's dialect.
    ///
    /// Fails before anything is built if the dialect cannot express `action`.
    pub(crate) fn power_command_request(&self, action: PowerAction) -> Result<String> {
        let command = protocol::power_command(self.session.dialect, action)?;
        let mut request = protocol::login_open(&self.settings.credentials);
        request.push_str(protocol::SERVER_INFO_WRITE);
        request.push_str(command);
        request.push_str(protocol::SERVER_INFO_LOGIN_CLOSE);
        Ok(request)
    }

    pub(crate) fn parse_power_status(reply: &Match) -> Result<PowerState> {
        let value = reply
            .group(1)
            .ok_or(Error::Protocol("power status reply lacks HOST_POWER value"))?;
        protocol::parse_power_state(value)
    }
}

/// Power commands a fence action issues, in order.
pub(crate) fn fence_steps(action: PowerAction) -> &'static [PowerAction] {
    match action {
        PowerAction::On => &[PowerAction::On],
        PowerAction::Off => &[PowerAction::Off],
        PowerAction::Cycle => &[PowerAction::Off, PowerAction::On],
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    ClientBuilder::new()
        .username("admin")
        .password("secret")
        .into_settings()
        .expect("settings")
}
