use serde::{Deserialize, Serialize};

use crate::command::{CompletionReport, JobId};
use crate::discovery::DeviceInfo;
use crate::error::DriverFault;

/// Push-style notification raised by a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DriverEvent {
    /// A scan found a device
    DeviceFound { device: DeviceInfo },

    /// The scan ended on its own
    DiscoveryFinished,

    /// A previously accepted job finished printing (or failed to)
    JobFinished {
        job_id: JobId,
        result: Result<CompletionReport, DriverFault>,
    },

    /// The driver lost the printer connection
    ConnectionLost { reason: String },
}

impl DriverEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DeviceFound { .. } => "DeviceFound",
            Self::DiscoveryFinished => "DiscoveryFinished",
            Self::JobFinished { .. } => "JobFinished",
            Self::ConnectionLost { .. } => "ConnectionLost",
        }
    }
}

/// Receiver of driver notifications.
///
/// Drivers may call `notify` from any thread, including from inside one of
/// their own trait methods, so implementations must not block.
pub trait DriverListener: Send + Sync {
    fn notify(&self, event: DriverEvent);
}
