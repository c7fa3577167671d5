use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaperState {
    Ok,
    NearEnd,
    Empty,
    #[default]
    Unknown,
}

/// Snapshot of the printer state as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatus {
    pub online: bool,
    pub connection: bool,
    pub cover_open: bool,
    pub paper: PaperState,
    pub paper_feed: bool,
    /// Raw driver error status, not interpreted
    pub error_status: i32,
}

impl PrinterStatus {
    /// Status of a reachable, idle printer
    pub fn ready() -> Self {
        Self {
            online: true,
            connection: true,
            cover_open: false,
            paper: PaperState::Ok,
            paper_feed: false,
            error_status: 0,
        }
    }

    /// A printer accepts jobs while it is connected and online
    pub fn is_printable(&self) -> bool {
        self.connection && self.online
    }
}
