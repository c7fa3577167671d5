pub mod controller;

pub use controller::{DeviceSink, DiscoveryController, StartedScan};
