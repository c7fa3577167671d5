use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Identifier the driver assigns to an accepted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver metadata for a completed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub job_id: JobId,
    pub bytes_sent: usize,
}

/// Terminal result of a command, delivered once per callback id
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Completed(CompletionReport),
    Failed(BridgeError),
    Aborted(BridgeError),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn error(&self) -> Option<&BridgeError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(e) | Self::Aborted(e) => Some(e),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Aborted(_) => "aborted",
        }
    }
}
