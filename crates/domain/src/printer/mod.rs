mod series;
mod session;
mod status;
mod target;

pub use series::{PrinterLanguage, PrinterSeries};
pub use session::Session;
pub use status::{PaperState, PrinterStatus};
pub use target::{PrinterTarget, TargetInterface};
