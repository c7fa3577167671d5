mod simulated_scanner;

pub use simulated_scanner::SimulatedScanner;

use anyhow::{Result, bail};
use domain::driver::{DeviceScanner, DriverType, PrinterDriver};
use std::time::Duration;

use crate::config::BridgeConfig;
use crate::printer::{FilePrinter, NetworkPrinter, SimulatedPrinter};

/// Printer and scanner handed to the bridge
pub struct DriverSet {
    pub printer: Box<dyn PrinterDriver>,
    pub scanner: Box<dyn DeviceScanner>,
}

/// Factory for creating driver connections
pub struct DriverFactory;

impl DriverFactory {
    /// Build the printer driver and scanner named by the configuration.
    /// Only the simulator has a discovery protocol of its own; the other
    /// drivers report the configured device list.
    pub fn create(config: &BridgeConfig) -> Result<DriverSet> {
        let scanner = Box::new(SimulatedScanner::new(
            config.discovery.devices.clone(),
            Duration::from_millis(config.discovery.interval_ms),
        ));

        let printer: Box<dyn PrinterDriver> = match config.driver.r#type {
            DriverType::Simulator => {
                Box::new(SimulatedPrinter::new(config.driver.simulator.clone()))
            }
            DriverType::Network => Box::new(NetworkPrinter::new(
                config.driver.port,
                Duration::from_millis(config.driver.io_timeout_ms),
            )),
            DriverType::File => match &config.driver.path {
                Some(path) => Box::new(FilePrinter::new(path)),
                None => bail!("File driver requires driver.path"),
            },
        };

        Ok(DriverSet { printer, scanner })
    }
}
