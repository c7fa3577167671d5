use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::CallbackId;
use crate::printer::PrinterStatus;

/// Failure reported by the printer driver.
///
/// Driver codes are vendor-defined and carried verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum DriverFault {
    #[error("driver code {0}")]
    Code(i32),

    #[error("timed out")]
    Timeout,

    #[error("driver is still processing a previous request")]
    Processing,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("io: {0}")]
    Io(String),
}

impl DriverFault {
    /// Transient faults may succeed when the same call is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

/// Bridge-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Printer is not connected")]
    NotConnected,

    #[error("Printer already connected")]
    AlreadyConnected,

    #[error("Invalid printer target: {0}")]
    InvalidTarget(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Another command is in flight")]
    Busy,

    #[error("Discovery already in progress")]
    AlreadyInProgress,

    #[error("Discovery not in progress")]
    NotInProgress,

    #[error("Connection to printer lost")]
    ConnectionLost,

    #[error("Driver error: {0}")]
    DriverError(DriverFault),

    #[error("Printer is not ready. Check device and paper.")]
    NotReady(PrinterStatus),

    #[error("Unknown callback: {0}")]
    UnknownCallback(CallbackId),

    #[error("Callback already resolved: {0}")]
    AlreadyResolved(CallbackId),

    #[error("Callback already registered: {0}")]
    AlreadyRegistered(CallbackId),
}

impl BridgeError {
    /// Stable name of the error kind, used on the host wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "NotConnected",
            Self::AlreadyConnected => "AlreadyConnected",
            Self::InvalidTarget(_) => "InvalidTarget",
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::Busy => "Busy",
            Self::AlreadyInProgress => "AlreadyInProgress",
            Self::NotInProgress => "NotInProgress",
            Self::ConnectionLost => "ConnectionLost",
            Self::DriverError(_) => "DriverError",
            Self::NotReady(_) => "NotReady",
            Self::UnknownCallback(_) => "UnknownCallback",
            Self::AlreadyResolved(_) => "AlreadyResolved",
            Self::AlreadyRegistered(_) => "AlreadyRegistered",
        }
    }
}

impl From<DriverFault> for BridgeError {
    fn from(fault: DriverFault) -> Self {
        Self::DriverError(fault)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
