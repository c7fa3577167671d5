use serde::{Deserialize, Serialize};

/// Lifecycle of a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandState {
    /// Registered, not yet accepted by the driver
    Issued,
    /// Accepted by the driver, waiting for its completion notification
    InFlight,
    Completed,
    Failed,
    /// Dropped because the session went away
    Aborted,
}

impl CommandState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn to_in_flight(&self) -> Result<Self, &'static str> {
        match self {
            Self::Issued => Ok(Self::InFlight),
            _ => Err("Can only go in flight from Issued state"),
        }
    }

    pub fn to_completed(&self) -> Result<Self, &'static str> {
        match self {
            Self::InFlight => Ok(Self::Completed),
            _ => Err("Can only complete from InFlight state"),
        }
    }

    /// A command can fail before the driver accepted it
    pub fn to_failed(&self) -> Result<Self, &'static str> {
        match self {
            Self::Issued | Self::InFlight => Ok(Self::Failed),
            _ => Err("Can only fail from Issued or InFlight state"),
        }
    }

    pub fn to_aborted(&self) -> Result<Self, &'static str> {
        match self {
            Self::Issued | Self::InFlight => Ok(Self::Aborted),
            _ => Err("Can only abort from Issued or InFlight state"),
        }
    }
}

impl Default for CommandState {
    fn default() -> Self {
        Self::Issued
    }
}
