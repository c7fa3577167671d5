use serde::{Deserialize, Serialize};

/// Printer model family understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterSeries {
    TmM10,
    TmM30,
    TmP20,
    TmP60,
    TmP60II,
    TmP80,
    TmT20,
    TmT60,
    TmT70,
    TmT81,
    TmT82,
    TmT83,
    TmT88,
    TmT90,
    TmT90KP,
    TmU220,
    TmU330,
    TmL90,
    TmH6000,
}

/// Model names accepted from callers, in series id order.
/// `TM-T88VI` shares the TM-T88 series.
const MODEL_NAMES: &[(&str, PrinterSeries)] = &[
    ("TM-M10", PrinterSeries::TmM10),
    ("TM-M30", PrinterSeries::TmM30),
    ("TM-P20", PrinterSeries::TmP20),
    ("TM-P60", PrinterSeries::TmP60),
    ("TM-P60II", PrinterSeries::TmP60II),
    ("TM-P80", PrinterSeries::TmP80),
    ("TM-T20", PrinterSeries::TmT20),
    ("TM-T60", PrinterSeries::TmT60),
    ("TM-T70", PrinterSeries::TmT70),
    ("TM-T81", PrinterSeries::TmT81),
    ("TM-T82", PrinterSeries::TmT82),
    ("TM-T83", PrinterSeries::TmT83),
    ("TM-T88", PrinterSeries::TmT88),
    ("TM-T88VI", PrinterSeries::TmT88),
    ("TM-T90", PrinterSeries::TmT90),
    ("TM-T90KP", PrinterSeries::TmT90KP),
    ("TM-U220", PrinterSeries::TmU220),
    ("TM-U330", PrinterSeries::TmU330),
    ("TM-L90", PrinterSeries::TmL90),
    ("TM-H6000", PrinterSeries::TmH6000),
];

const ALL_SERIES: [PrinterSeries; 19] = [
    PrinterSeries::TmM10,
    PrinterSeries::TmM30,
    PrinterSeries::TmP20,
    PrinterSeries::TmP60,
    PrinterSeries::TmP60II,
    PrinterSeries::TmP80,
    PrinterSeries::TmT20,
    PrinterSeries::TmT60,
    PrinterSeries::TmT70,
    PrinterSeries::TmT81,
    PrinterSeries::TmT82,
    PrinterSeries::TmT83,
    PrinterSeries::TmT88,
    PrinterSeries::TmT90,
    PrinterSeries::TmT90KP,
    PrinterSeries::TmU220,
    PrinterSeries::TmU330,
    PrinterSeries::TmL90,
    PrinterSeries::TmH6000,
];

impl PrinterSeries {
    pub fn id(&self) -> i32 {
        ALL_SERIES
            .iter()
            .position(|s| s == self)
            .map(|p| p as i32)
            .unwrap_or_default()
    }

    pub fn from_id(id: i32) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| ALL_SERIES.get(i).copied())
    }

    /// Look up a model name such as `TM-T88VI` (case-insensitive)
    pub fn from_model_name(name: &str) -> Option<Self> {
        MODEL_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, s)| *s)
    }

    /// Canonical model name
    pub fn model_name(&self) -> &'static str {
        MODEL_NAMES
            .iter()
            .find(|(_, s)| s == self)
            .map(|(n, _)| *n)
            .unwrap_or("TM-T88")
    }

    /// Every model name callers may pass to connect
    pub fn supported_models() -> Vec<&'static str> {
        MODEL_NAMES.iter().map(|(n, _)| *n).collect()
    }
}

impl Default for PrinterSeries {
    fn default() -> Self {
        Self::TmT88
    }
}

impl std::fmt::Display for PrinterSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model_name())
    }
}

/// Character set model the printer is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PrinterLanguage {
    #[default]
    Ank,
    Japanese,
    Chinese,
    Taiwan,
    Korean,
    Thai,
    SouthAsia,
}

impl PrinterLanguage {
    pub fn id(&self) -> i32 {
        match self {
            Self::Ank => 0,
            Self::Japanese => 1,
            Self::Chinese => 2,
            Self::Taiwan => 3,
            Self::Korean => 4,
            Self::Thai => 5,
            Self::SouthAsia => 6,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Ank),
            1 => Some(Self::Japanese),
            2 => Some(Self::Chinese),
            3 => Some(Self::Taiwan),
            4 => Some(Self::Korean),
            5 => Some(Self::Thai),
            6 => Some(Self::SouthAsia),
            _ => None,
        }
    }
}
