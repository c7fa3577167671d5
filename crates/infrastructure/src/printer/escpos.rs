use domain::DriverFault;
use domain::command::{CommandPayload, TextAlign, TextJob};

/// Lines fed before the cutter so the last line clears the blade
const FEED_BEFORE_CUT: u8 = 3;

pub struct EscPosBuilder {
    buffer: Vec<u8>,
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn initialize(mut self) -> Self {
        // ESC @: Initialize printer
        self.buffer.extend_from_slice(&[0x1B, 0x40]);
        self
    }

    pub fn font(mut self, font: u8) -> Self {
        // ESC M n: Select character font (0: A, 1: B, ...)
        self.buffer.extend_from_slice(&[0x1B, 0x4D, font]);
        self
    }

    pub fn size(mut self, multiplier: u8) -> Self {
        // GS ! n: width in the high nibble, height in the low nibble
        let n = multiplier.saturating_sub(1) & 0x07;
        self.buffer.extend_from_slice(&[0x1D, 0x21, (n << 4) | n]);
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        // ESC a n: Align (0: Left, 1: Center, 2: Right)
        let n = match align {
            TextAlign::Left => 0x00,
            TextAlign::Center => 0x01,
            TextAlign::Right => 0x02,
        };
        self.buffer.extend_from_slice(&[0x1B, 0x61, n]);
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn line_feed(mut self) -> Self {
        self.buffer.push(0x0A);
        self
    }

    pub fn feed(mut self, n: u8) -> Self {
        // ESC d n: Print and feed n lines
        self.buffer.extend_from_slice(&[0x1B, 0x64, n]);
        self
    }

    pub fn cut(mut self) -> Self {
        // GS V 66 0: Feed to cut position and cut
        self.buffer.extend_from_slice(&[0x1D, 0x56, 66, 0]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

/// Encode a text job as an ESC/POS byte stream
pub fn encode_text(job: &TextJob) -> Result<Vec<u8>, DriverFault> {
    let text = job.encoding.encode(&job.text).ok_or_else(|| {
        DriverFault::Unsupported(format!("text not representable as {:?}", job.encoding))
    })?;

    let mut builder = EscPosBuilder::new()
        .initialize()
        .font(job.style.font)
        .size(job.style.size)
        .align(job.style.align)
        .bytes(&text);

    if !text.ends_with(b"\n") {
        builder = builder.line_feed();
    }
    if job.cut {
        builder = builder.feed(FEED_BEFORE_CUT).cut();
    }
    Ok(builder.build())
}

/// Bytes a byte-stream printer transmits for `payload`.
/// Images need a rasterizer, which byte-stream drivers do not have.
pub fn encode_payload(payload: &CommandPayload) -> Result<Vec<u8>, DriverFault> {
    match payload {
        CommandPayload::Text(job) => encode_text(job),
        CommandPayload::Raw(bytes) => Ok(bytes.clone()),
        CommandPayload::Image(_) => Err(DriverFault::Unsupported(
            "image printing requires a rasterizing driver".to_string(),
        )),
    }
}
