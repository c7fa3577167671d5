mod callback_id;
mod outcome;
mod payload;
mod state;

pub use callback_id::CallbackId;
pub use outcome::{CommandOutcome, CompletionReport, JobId};
pub use payload::{
    CommandKind, CommandPayload, Halftone, ImageFormat, ImageJob, ImageMode, PayloadLimits,
    TextAlign, TextEncoding, TextJob, TextStyle, validate_raw,
};
pub use state::CommandState;
