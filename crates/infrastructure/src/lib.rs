//! Infrastructure layer - Concrete drivers, configuration and event sinks

pub mod config;
pub mod drivers;
pub mod messaging;
pub mod printer;

pub use config::BridgeConfig;
pub use drivers::{DriverFactory, DriverSet, SimulatedScanner};
pub use messaging::{ChannelEventPublisher, CompositeEventPublisher, TracingEventPublisher};
pub use printer::{FilePrinter, NetworkPrinter, SimulatedPrinter};
