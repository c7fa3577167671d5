use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Kind of pending command tracked by the callback router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Print,
    SendData,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "Print",
            Self::SendData => "SendData",
        }
    }
}

/// Size limits applied before a payload reaches the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLimits {
    pub max_text_chars: usize,
    pub max_image_bytes: usize,
    pub max_raw_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_text_chars: 16 * 1024,
            max_image_bytes: 4 * 1024 * 1024,
            max_raw_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Center),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Font A..E (0..=4), size multiplier 1..=8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: u8,
    pub size: u8,
    pub align: TextAlign,
}

impl TextStyle {
    pub const MAX_FONT: u8 = 4;
    pub const MAX_SIZE: u8 = 8;

    pub fn validate(&self) -> Result<()> {
        if self.font > Self::MAX_FONT {
            return Err(BridgeError::InvalidPayload(format!(
                "Font {} out of range (0..={})",
                self.font,
                Self::MAX_FONT
            )));
        }
        if self.size == 0 || self.size > Self::MAX_SIZE {
            return Err(BridgeError::InvalidPayload(format!(
                "Text size {} out of range (1..={})",
                self.size,
                Self::MAX_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: 0,
            size: 1,
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Encode `text`, or `None` when a character has no representation
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            Self::Utf8 => Some(text.as_bytes().to_vec()),
            Self::Ascii => text.is_ascii().then(|| text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect(),
        }
    }
}

/// Text to print with a single style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextJob {
    pub text: String,
    pub style: TextStyle,
    pub encoding: TextEncoding,
    /// Feed and cut after the text
    pub cut: bool,
}

impl TextJob {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            encoding: TextEncoding::default(),
            cut: false,
        }
    }

    pub fn validate(&self, limits: &PayloadLimits) -> Result<()> {
        if self.text.is_empty() {
            return Err(BridgeError::InvalidPayload("Text is empty".to_string()));
        }

        let chars = self.text.chars().count();
        if chars > limits.max_text_chars {
            return Err(BridgeError::InvalidPayload(format!(
                "Text too long: {chars} chars (max {})",
                limits.max_text_chars
            )));
        }

        if let Some(c) = self
            .text
            .chars()
            .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(BridgeError::InvalidPayload(format!(
                "Text contains control character {:#04x}",
                u32::from(c)
            )));
        }

        if self.encoding.encode(&self.text).is_none() {
            return Err(BridgeError::InvalidPayload(format!(
                "Text is not representable as {:?}",
                self.encoding
            )));
        }

        self.style.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageMode {
    #[default]
    Mono,
    Gray16,
    MonoHighDensity,
}

impl ImageMode {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Mono),
            1 => Some(Self::Gray16),
            2 => Some(Self::MonoHighDensity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Halftone {
    #[default]
    Dither,
    ErrorDiffusion,
    Threshold,
}

impl Halftone {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Dither),
            1 => Some(Self::ErrorDiffusion),
            2 => Some(Self::Threshold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Bmp,
    Gif,
}

/// Encoded image handed to the driver, which owns rasterization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJob {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub mode: ImageMode,
    pub halftone: Halftone,
    pub cut: bool,
}

/// Payload forwarded to the driver for one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandPayload {
    Text(TextJob),
    Image(ImageJob),
    Raw(Vec<u8>),
}

impl CommandPayload {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Text(_) | Self::Image(_) => CommandKind::Print,
            Self::Raw(_) => CommandKind::SendData,
        }
    }

    /// Approximate bytes the driver will transmit
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(job) => job.text.len(),
            Self::Image(job) => job.data.len(),
            Self::Raw(bytes) => bytes.len(),
        }
    }
}

/// Validate raw bytes destined for the printer's command channel
pub fn validate_raw(bytes: &[u8], limits: &PayloadLimits) -> Result<()> {
    if bytes.is_empty() {
        return Err(BridgeError::InvalidPayload("Data is empty".to_string()));
    }
    if bytes.len() > limits.max_raw_bytes {
        return Err(BridgeError::InvalidPayload(format!(
            "Data too large: {} bytes (max {})",
            bytes.len(),
            limits.max_raw_bytes
        )));
    }
    Ok(())
}
