use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};

const MAX_TARGET_LEN: usize = 255;

/// Interface named by the target prefix (`TCP:`, `BT:`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetInterface {
    Tcp,
    TcpSecure,
    Bluetooth,
    BluetoothLe,
    Usb,
    /// Bare address without a recognised prefix
    Unspecified,
}

impl TargetInterface {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "TCP" => Some(Self::Tcp),
            "TCPS" => Some(Self::TcpSecure),
            "BT" => Some(Self::Bluetooth),
            "BLE" => Some(Self::BluetoothLe),
            "USB" => Some(Self::Usb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::TcpSecure => "TCPS",
            Self::Bluetooth => "BT",
            Self::BluetoothLe => "BLE",
            Self::Usb => "USB",
            Self::Unspecified => "",
        }
    }
}

/// Value object identifying a printer device
///
/// Rules:
/// - Must be non-empty
/// - Max length 255 characters
/// - ASCII alphanumerics and `: . _ - [ ] % / ,` only
/// - A recognised interface prefix must be followed by an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrinterTarget(String);

impl PrinterTarget {
    /// Create a new PrinterTarget with validation
    pub fn new(target: impl Into<String>) -> Result<Self> {
        let target = target.into();

        if target.is_empty() {
            return Err(BridgeError::InvalidTarget(
                "Target cannot be empty".to_string(),
            ));
        }

        if target.len() > MAX_TARGET_LEN {
            return Err(BridgeError::InvalidTarget(format!(
                "Target too long: {} chars (max {MAX_TARGET_LEN})",
                target.len()
            )));
        }

        if let Some(bad) = target
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || ":._-[]%/,".contains(*c)))
        {
            return Err(BridgeError::InvalidTarget(format!(
                "Target {target:?} contains invalid character {bad:?}"
            )));
        }

        if let Some((prefix, address)) = target.split_once(':') {
            if TargetInterface::from_prefix(prefix).is_some() && address.is_empty() {
                return Err(BridgeError::InvalidTarget(format!(
                    "Target {target:?} has no address after the interface prefix"
                )));
            }
        }

        Ok(Self(target))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn interface(&self) -> TargetInterface {
        self.0
            .split_once(':')
            .and_then(|(prefix, _)| TargetInterface::from_prefix(prefix))
            .unwrap_or(TargetInterface::Unspecified)
    }

    /// Address part, without the interface prefix
    pub fn address(&self) -> &str {
        match self.interface() {
            TargetInterface::Unspecified => &self.0,
            _ => self.0.split_once(':').map(|(_, a)| a).unwrap_or(&self.0),
        }
    }
}

impl TryFrom<String> for PrinterTarget {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PrinterTarget> for String {
    fn from(target: PrinterTarget) -> Self {
        target.0
    }
}

impl std::fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
