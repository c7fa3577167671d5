use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::EventPublisher;

use crate::command::{CallbackId, CommandKind, CommandOutcome};
use crate::discovery::{DeviceInfo, DiscoveryHandle};
use crate::printer::{PrinterSeries, PrinterTarget};

/// Lifecycle events emitted by the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// Printer session established
    SessionOpened {
        target: PrinterTarget,
        series: PrinterSeries,
        timestamp: DateTime<Utc>,
    },

    /// Printer session closed, by request or because the link dropped
    SessionClosed {
        target: PrinterTarget,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A running scan reported a device
    DeviceDiscovered {
        handle: DiscoveryHandle,
        device: DeviceInfo,
        timestamp: DateTime<Utc>,
    },

    /// A scan stopped, on request, by timeout or by the driver
    DiscoveryEnded {
        handle: DiscoveryHandle,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A command reached its terminal state
    CommandResolved {
        callback_id: CallbackId,
        kind: CommandKind,
        outcome: String,
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl BridgeEvent {
    pub fn session_opened(target: PrinterTarget, series: PrinterSeries) -> Self {
        Self::SessionOpened {
            target,
            series,
            timestamp: Utc::now(),
        }
    }

    pub fn session_closed(target: PrinterTarget, reason: impl Into<String>) -> Self {
        Self::SessionClosed {
            target,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn device_discovered(handle: DiscoveryHandle, device: DeviceInfo) -> Self {
        Self::DeviceDiscovered {
            handle,
            device,
            timestamp: Utc::now(),
        }
    }

    pub fn discovery_ended(handle: DiscoveryHandle, reason: impl Into<String>) -> Self {
        Self::DiscoveryEnded {
            handle,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn command_resolved(callback_id: CallbackId, kind: CommandKind, outcome: &CommandOutcome) -> Self {
        Self::CommandResolved {
            callback_id,
            kind,
            outcome: outcome.label().to_string(),
            detail: outcome.error().map(|e| e.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionOpened { timestamp, .. } => *timestamp,
            Self::SessionClosed { timestamp, .. } => *timestamp,
            Self::DeviceDiscovered { timestamp, .. } => *timestamp,
            Self::DiscoveryEnded { timestamp, .. } => *timestamp,
            Self::CommandResolved { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::SessionOpened { .. } => "SessionOpened",
            Self::SessionClosed { .. } => "SessionClosed",
            Self::DeviceDiscovered { .. } => "DeviceDiscovered",
            Self::DiscoveryEnded { .. } => "DiscoveryEnded",
            Self::CommandResolved { .. } => "CommandResolved",
        }
    }
}
