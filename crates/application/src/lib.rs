//! Application layer - Printer session façade and its components
//!
//! - `session`: the single printer connection
//! - `discovery`: cancellable device scans
//! - `command`: validation and the one-in-flight rule
//! - `callback`: pending callback ids and their outcomes
//! - `bridge`: the `PrinterBridge` handle tying them together

pub mod bridge;
pub mod callback;
pub mod command;
pub mod discovery;
pub mod session;

pub use bridge::{BridgeSettings, PrinterBridge};
pub use callback::{CallbackRouter, Completion};
pub use command::{CommandHandle, ImageOptions};
pub use discovery::DeviceSink;
