//! Domain layer - printer session types with no runtime dependencies
//!
//! This crate contains:
//! - Value objects (PrinterTarget, PrinterSeries, CallbackId, payloads)
//! - The bridge error taxonomy
//! - Driver capability traits (PrinterDriver, DeviceScanner, DriverListener)
//! - Bridge events and the publisher interface
//!
//! Drivers and the session façade live in other crates and only meet
//! through the traits defined here.

pub mod command;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod event;
pub mod printer;

// Re-export commonly used types
pub use command::{CallbackId, CommandKind, CommandOutcome, CommandPayload, CommandState};
pub use discovery::{DeviceInfo, DiscoveryFilter, DiscoveryHandle};
pub use error::{BridgeError, DriverFault};
pub use event::BridgeEvent;
pub use printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget, Session};
