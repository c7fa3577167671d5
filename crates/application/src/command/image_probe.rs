use domain::command::ImageFormat;
use domain::error::{BridgeError, Result};
use image::ImageReader;
use std::io::Cursor;

/// Format and pixel size read from an encoded image header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Identify `bytes` as a printable image without decoding the pixels
pub fn probe(bytes: &[u8]) -> Result<ImageInfo> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BridgeError::InvalidPayload(format!("Unreadable image: {e}")))?;

    let format = match reader.format() {
        Some(image::ImageFormat::Png) => ImageFormat::Png,
        Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Some(image::ImageFormat::Bmp) => ImageFormat::Bmp,
        Some(image::ImageFormat::Gif) => ImageFormat::Gif,
        Some(other) => {
            return Err(BridgeError::InvalidPayload(format!(
                "Unsupported image format {other:?}"
            )));
        }
        None => {
            return Err(BridgeError::InvalidPayload(
                "Data is not a recognised image".to_string(),
            ));
        }
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BridgeError::InvalidPayload(format!("Malformed image: {e}")))?;
    if width == 0 || height == 0 {
        return Err(BridgeError::InvalidPayload("Image has no pixels".to_string()));
    }

    Ok(ImageInfo {
        format,
        width,
        height,
    })
}
