use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PrinterLanguage, PrinterSeries, PrinterTarget};

/// Live logical connection to one printer.
///
/// Created only after the driver accepted the connection, so `connected`
/// stays true for the lifetime of the value held by the session manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub target: PrinterTarget,
    pub series: PrinterSeries,
    pub language: PrinterLanguage,
    pub connected: bool,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn open(target: PrinterTarget, series: PrinterSeries, language: PrinterLanguage) -> Self {
        Self {
            target,
            series,
            language,
            connected: true,
            connected_at: Utc::now(),
        }
    }

    pub fn series_id(&self) -> i32 {
        self.series.id()
    }

    pub fn language_id(&self) -> i32 {
        self.language.id()
    }
}
