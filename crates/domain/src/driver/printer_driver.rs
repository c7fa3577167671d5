use std::sync::Arc;

use async_trait::async_trait;

use super::listener::DriverListener;
use crate::command::{CommandPayload, JobId};
use crate::discovery::DiscoveryFilter;
use crate::error::DriverFault;
use crate::printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget};

/// Printer connection that driver implementations must provide
#[async_trait]
pub trait PrinterDriver: Send + Sync {
    /// Open a connection to `target`.
    /// Job completions and connection loss are reported to `listener`.
    async fn connect(
        &mut self,
        target: &PrinterTarget,
        series: PrinterSeries,
        language: PrinterLanguage,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault>;

    /// Close the connection and release driver resources
    async fn disconnect(&mut self) -> Result<(), DriverFault>;

    /// Hand a job to the printer.
    /// Returns once the driver accepted it; the outcome arrives later as
    /// `DriverEvent::JobFinished` carrying the returned id.
    async fn send_command(&mut self, payload: &CommandPayload) -> Result<JobId, DriverFault>;

    /// Read the current printer status
    async fn status(&mut self) -> Result<PrinterStatus, DriverFault>;

    /// Get driver type identifier
    fn driver_type(&self) -> &'static str;
}

/// Discovery side of the driver
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Begin scanning; devices are reported to `listener` as they are found
    async fn start_discovery(
        &mut self,
        filter: &DiscoveryFilter,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault>;

    /// Halt the scan. May fail with `DriverFault::Processing` while the
    /// driver is still busy starting it.
    async fn stop_discovery(&mut self) -> Result<(), DriverFault>;
}
