use serde::{Deserialize, Serialize};

/// Concrete driver backing the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DriverType {
    #[default]
    Simulator,
    /// Raw TCP socket, usually port 9100
    Network,
    /// Appends jobs to a file
    File,
}

impl DriverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulator => "Simulator",
            Self::Network => "Network",
            Self::File => "File",
        }
    }
}
