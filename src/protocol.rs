//! RIBCL wire vocabulary: command text we send and the patterns we look for in replies.
//!
//! Every outgoing line is terminated with CR-LF.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::expect::Pattern;
use crate::types::{
    Capabilities, Credentials, PowerAction, PowerControlDialect, PowerState, ProcessorFamily,
    ProtocolVersion,
};

pub(crate) const PROLOGUE: &str = "<?xml version=\"1.0\"?>\r\n";
pub(crate) const LOGIN_CLOSE: &str = "</LOGIN>\r\n";
pub(crate) const FW_VERSION_QUERY: &str = "<RIB_INFO MODE=\"read\"><GET_FW_VERSION />\r\n";
pub(crate) const RIB_INFO_CLOSE: &str = "</RIB_INFO>\r\n";
pub(crate) const POWER_STATUS_QUERY: &str =
    "<SERVER_INFO MODE=\"read\"><GET_HOST_POWER_STATUS/>\r\n";
pub(crate) const SERVER_INFO_WRITE: &str = "<SERVER_INFO MODE=\"write\">\r\n";
pub(crate) const SERVER_INFO_LOGIN_CLOSE: &str = "</SERVER_INFO></LOGIN>\r\n";

pub(crate) mod command {
    pub(crate) const HOLD_PWR_BTN_TOGGLE: &str = "<HOLD_PWR_BTN TOGGLE=\"yes\" />\r\n";
    pub(crate) const HOLD_PWR_BTN: &str = "<HOLD_PWR_BTN />\r\n";
    pub(crate) const HOLD_PWR_BTN_MODERN: &str = "<HOLD_PWR_BTN/>\r\n";
    pub(crate) const PRESS_PWR_BTN: &str = "<PRESS_PWR_BTN/>\r\n";
    pub(crate) const SET_HOST_POWER_ON: &str = "<SET_HOST_POWER HOST_POWER=\"on\" />\r\n";
    pub(crate) const SET_HOST_POWER_OFF: &str = "<SET_HOST_POWER HOST_POWER=\"off\" />\r\n";
}

/// End of the controller's greeting.
pub(crate) static GREETING_END: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new("greeting end", r"</RIBCL>|<END_RIBCL/>"));

/// Opening of the `GET_FW_VERSION` reply (attributes follow on separate lines).
pub(crate) static FW_VERSION_REPLY: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new("GET_FW_VERSION reply", r"<GET_FW_VERSION\s*\n"));

/// Self-closing terminator of a reply tag.
pub(crate) static TAG_END: LazyLock<Pattern> = LazyLock::new(|| Pattern::new("tag end", r"/>"));

/// `HOST_POWER` attribute of a `GET_HOST_POWER_STATUS` reply.
pub(crate) static HOST_POWER: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new("HOST_POWER", r#"HOST_POWER="(.*?)""#));

static RIBCL_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<RIBCL VERSION="(.*?)""#).expect("RIBCL version pattern is valid")
});

static FIRMWARE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)FIRMWARE_VERSION\s*=\s*"(.*?)""#).expect("firmware pattern is valid")
});

static MANAGEMENT_PROCESSOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)MANAGEMENT_PROCESSOR\s*=\s*"(.*?)""#).expect("processor pattern is valid")
});

/// `<RIBCL VERSION="...">` declaration for the chosen version.
pub(crate) fn dialect_declaration(version: ProtocolVersion) -> String {
    format!("<RIBCL VERSION=\"{}\">\r\n", version.declaration())
}

/// Opening `LOGIN` envelope carrying the credentials.
pub(crate) fn login_open(credentials: &Credentials) -> String {
    format!(
        "<LOGIN USER_LOGIN=\"{}\" PASSWORD=\"{}\">\r\n",
        xml_escape(&credentials.username),
        xml_escape(credentials.password.expose())
    )
}

/// The single power-control line for `dialect`.
pub(crate) fn power_command(
    dialect: PowerControlDialect,
    action: PowerAction,
) -> Result<&'static str> {
    let line = match dialect {
        PowerControlDialect::HoldButton { toggle: true } => command::HOLD_PWR_BTN_TOGGLE,
        PowerControlDialect::HoldButton { toggle: false } => command::HOLD_PWR_BTN,
        PowerControlDialect::LegacyExplicitSet => match action {
            PowerAction::On => command::SET_HOST_POWER_ON,
            PowerAction::Off => command::SET_HOST_POWER_OFF,
            PowerAction::Cycle => {
                return Err(Error::InvalidArgument(
                    "SET_HOST_POWER has no cycle state; fence with PowerAction::Cycle instead",
                ));
            }
        },
        PowerControlDialect::ModernPressOrHold => match action {
            PowerAction::Off => command::HOLD_PWR_BTN_MODERN,
            PowerAction::On | PowerAction::Cycle => command::PRESS_PWR_BTN,
        },
    };
    Ok(line)
}

/// Extract the advertised version from greeting text.
pub(crate) fn parse_greeting_version(greeting: &str) -> Result<ProtocolVersion> {
    let raw = RIBCL_VERSION
        .captures(greeting)
        .and_then(|caps| caps.get(1))
        .ok_or(Error::Protocol("greeting carries no RIBCL VERSION attribute"))?
        .as_str();
    parse_decimal(raw)
        .map(ProtocolVersion::new)
        .ok_or_else(|| Error::protocol_owned(format!("invalid RIBCL version {raw:?}")))
}

/// Extract firmware version and processor family from a `GET_FW_VERSION` reply.
///
/// Both attributes must be present.
pub(crate) fn parse_capabilities(reply: &str) -> Result<Capabilities> {
    let firmware = FIRMWARE_VERSION
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .ok_or(Error::Protocol("GET_FW_VERSION reply lacks FIRMWARE_VERSION"))?
        .as_str();
    let processor = MANAGEMENT_PROCESSOR
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .ok_or(Error::Protocol(
            "GET_FW_VERSION reply lacks MANAGEMENT_PROCESSOR",
        ))?
        .as_str();

    let firmware_version = parse_decimal(firmware)
        .ok_or_else(|| Error::protocol_owned(format!("invalid firmware version {firmware:?}")))?;

    Ok(Capabilities {
        firmware_version,
        processor: ProcessorFamily::from_tag(processor),
    })
}

/// Interpret a `HOST_POWER` attribute value.
pub(crate) fn parse_power_state(value: &str) -> Result<PowerState> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" => Ok(PowerState::On),
        "off" => Ok(PowerState::Off),
        other => Err(Error::protocol_owned(format!(
            "unknown HOST_POWER value {other:?}"
        ))),
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn xml_escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
