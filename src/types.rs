use core::fmt;

use crate::secret::SecretString;

/// Firmware versions above this accept `TOGGLE="yes"` on `HOLD_PWR_BTN`.
const HOLD_TOGGLE_MIN_FIRMWARE: f64 = 1.29;

/// RIBCL versions below this only understand `SET_HOST_POWER`.
const SET_HOST_POWER_MAX_VERSION: f64 = 2.21;

/// Power state reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Host is powered on.
    On,
    /// Host is powered off.
    Off,
}

impl PowerState {
    /// Lower-case RIBCL spelling (`"on"` / `"off"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested power operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// Power the host on.
    On,
    /// Power the host off.
    Off,
    /// Power the host off and back on.
    Cycle,
}

impl PowerAction {
    /// Action name as used on the wire and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Cycle => "cycle",
        }
    }

    /// The power state an `On`/`Off` action ends in. `Cycle` has no single target.
    pub fn target_state(self) -> Option<PowerState> {
        match self {
            Self::On => Some(PowerState::On),
            Self::Off => Some(PowerState::Off),
            Self::Cycle => None,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RIBCL protocol version, e.g. `2.22`.
///
/// Versions are compared numerically, so `2.3` sorts above `2.22`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ProtocolVersion(f64);

impl ProtocolVersion {
    /// Wrap a raw version number.
    pub fn new(version: f64) -> Self {
        Self(version)
    }

    /// Numeric value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Version 2.0 and above use the `2.0` dialect declaration and support `GET_FW_VERSION`.
    pub fn is_v2(self) -> bool {
        self.0 >= 2.0
    }

    /// Dialect string sent in the `<RIBCL VERSION="...">` declaration.
    pub(crate) fn declaration(self) -> &'static str {
        if self.is_v2() { "2.0" } else { "1.2" }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Management processor generation reported by `GET_FW_VERSION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorFamily {
    /// First generation iLO.
    Ilo,
    /// iLO2.
    Ilo2,
    /// Anything else, tag kept verbatim.
    Other(String),
}

impl ProcessorFamily {
    /// Classify a `MANAGEMENT_PROCESSOR` value. Tags are compared exactly.
    pub(crate) fn from_tag(tag: &str) -> Self {
        match tag {
            "iLO2" => Self::Ilo2,
            "iLO" => Self::Ilo,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProcessorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ilo => f.write_str("iLO"),
            Self::Ilo2 => f.write_str("iLO2"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// Controller metadata discovered on RIBCL 2.0+ sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    /// `FIRMWARE_VERSION` attribute.
    pub firmware_version: f64,
    /// `MANAGEMENT_PROCESSOR` attribute.
    pub processor: ProcessorFamily,
}

/// How power is driven on a given controller generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerControlDialect {
    /// iLO2: emulate holding the power button. Toggles regardless of the requested action.
    HoldButton {
        /// Firmware understands `TOGGLE="yes"`.
        toggle: bool,
    },
    /// Old RIBCL: `SET_HOST_POWER` with an explicit target state.
    LegacyExplicitSet,
    /// Newer RIBCL: hold the button to power off, press it for anything else.
    ModernPressOrHold,
}

impl PowerControlDialect {
    /// Pick the dialect for a negotiated session.
    ///
    /// The processor check runs before the version check, so an iLO2 always gets the
    /// hold-button dialect even on versions that would otherwise use `SET_HOST_POWER`.
    pub fn select(version: ProtocolVersion, capabilities: Option<&Capabilities>) -> Self {
        match capabilities {
            Some(caps) if caps.processor == ProcessorFamily::Ilo2 => Self::HoldButton {
                toggle: caps.firmware_version > HOLD_TOGGLE_MIN_FIRMWARE,
            },
            _ if version.value() < SET_HOST_POWER_MAX_VERSION => Self::LegacyExplicitSet,
            _ => Self::ModernPressOrHold,
        }
    }
}

/// Login credentials, re-sent inside every `LOGIN` envelope.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: SecretString,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(processor: &str, firmware_version: f64) -> Capabilities {
        Capabilities {
            firmware_version,
            processor: ProcessorFamily::from_tag(processor),
        }
    }

    #[test]
    fn ilo2_selects_hold_button_by_firmware() {
        let v = ProtocolVersion::new(2.22);
        assert_eq!(
            PowerControlDialect::select(v, Some(&caps("iLO2", 1.50))),
            PowerControlDialect::HoldButton { toggle: true }
        );
        assert_eq!(
            PowerControlDialect::select(v, Some(&caps("iLO2", 1.22))),
            PowerControlDialect::HoldButton { toggle: false }
        );
        assert_eq!(
            PowerControlDialect::select(v, Some(&caps("iLO2", 1.29))),
            PowerControlDialect::HoldButton { toggle: false }
        );
    }

    #[test]
    fn ilo2_wins_over_legacy_version() {
        let v = ProtocolVersion::new(2.10);
        assert_eq!(
            PowerControlDialect::select(v, Some(&caps("iLO2", 1.50))),
            PowerControlDialect::HoldButton { toggle: true }
        );
    }

    #[test]
    fn version_threshold_without_ilo2() {
        assert_eq!(
            PowerControlDialect::select(ProtocolVersion::new(2.10), Some(&caps("iLO", 1.91))),
            PowerControlDialect::LegacyExplicitSet
        );
        assert_eq!(
            PowerControlDialect::select(ProtocolVersion::new(1.2), None),
            PowerControlDialect::LegacyExplicitSet
        );
        assert_eq!(
            PowerControlDialect::select(ProtocolVersion::new(2.21), None),
            PowerControlDialect::ModernPressOrHold
        );
        assert_eq!(
            PowerControlDialect::select(ProtocolVersion::new(2.30), None),
            PowerControlDialect::ModernPressOrHold
        );
    }

    #[test]
    fn protocol_version_declaration() {
        assert_eq!(ProtocolVersion::new(2.22).declaration(), "2.0");
        assert_eq!(ProtocolVersion::new(2.0).declaration(), "2.0");
        assert_eq!(ProtocolVersion::new(1.9).declaration(), "1.2");
        assert_eq!(ProtocolVersion::new(2.22).to_string(), "2.22");
    }

    #[test]
    fn processor_family_tags() {
        assert_eq!(ProcessorFamily::from_tag("iLO2"), ProcessorFamily::Ilo2);
        assert_eq!(ProcessorFamily::from_tag("iLO"), ProcessorFamily::Ilo);
        assert_eq!(
            ProcessorFamily::from_tag("ILO2"),
            ProcessorFamily::Other("ILO2".to_string())
        );
        assert_eq!(
            ProcessorFamily::from_tag(" iLO2"),
            ProcessorFamily::Other(" iLO2".to_string())
        );
        assert_eq!(
            ProcessorFamily::from_tag("iLO3"),
            ProcessorFamily::Other("iLO3".to_string())
        );
        assert_eq!(ProcessorFamily::Ilo2.to_string(), "iLO2");
    }

    #[test]
    fn only_exact_ilo2_tag_selects_hold_button() {
        assert_eq!(
            PowerControlDialect::select(ProtocolVersion::new(2.30), Some(&caps("ILO2", 1.50))),
            PowerControlDialect::ModernPressOrHold
        );
    }

    #[test]
    fn power_action_targets() {
        assert_eq!(PowerAction::On.target_state(), Some(PowerState::On));
        assert_eq!(PowerAction::Off.target_state(), Some(PowerState::Off));
        assert_eq!(PowerAction::Cycle.target_state(), None);
        assert_eq!(PowerState::Off.to_string(), "off");
    }
}
