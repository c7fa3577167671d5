use async_trait::async_trait;
use domain::discovery::{DeviceInfo, DiscoveryFilter};
use domain::driver::{DeviceScanner, DriverEvent, DriverListener};
use domain::DriverFault;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Scanner that reports a fixed device list, one device per interval.
///
/// Stands in for vendor discovery on drivers that have none, and doubles as
/// a test scanner.
pub struct SimulatedScanner {
    devices: Vec<DeviceInfo>,
    interval: Duration,
    finish_when_exhausted: bool,
    fail_start_with: Option<i32>,
    /// Remaining stop calls answered with `Processing`
    busy_stops: Arc<AtomicU32>,
    scan: Option<CancellationToken>,
}

impl SimulatedScanner {
    pub fn new(devices: Vec<DeviceInfo>, interval: Duration) -> Self {
        Self {
            devices,
            interval,
            finish_when_exhausted: false,
            fail_start_with: None,
            busy_stops: Arc::new(AtomicU32::new(0)),
            scan: None,
        }
    }

    /// Report `DiscoveryFinished` once every device has been reported
    pub fn finish_when_exhausted(mut self, finish: bool) -> Self {
        self.finish_when_exhausted = finish;
        self
    }

    pub fn fail_start_with(mut self, code: i32) -> Self {
        self.fail_start_with = Some(code);
        self
    }

    /// Answer the next `count` stop calls with `Processing`
    pub fn busy_stops(self, count: u32) -> Self {
        self.busy_stops.store(count, Ordering::SeqCst);
        self
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

#[async_trait]
impl DeviceScanner for SimulatedScanner {
    async fn start_discovery(
        &mut self,
        filter: &DiscoveryFilter,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault> {
        if let Some(code) = self.fail_start_with {
            return Err(DriverFault::Code(code));
        }
        if self.is_scanning() {
            return Err(DriverFault::Processing);
        }

        let token = CancellationToken::new();
        self.scan = Some(token.clone());

        let devices: Vec<DeviceInfo> = self
            .devices
            .iter()
            .filter(|d| d.matches(filter))
            .cloned()
            .collect();
        let interval = self.interval;
        let finish = self.finish_when_exhausted;
        info!("Simulated discovery started ({} candidate devices)", devices.len());

        tokio::spawn(async move {
            for device in devices {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = sleep(interval) => {
                        debug!("Simulated discovery found {}", device.target);
                        listener.notify(DriverEvent::DeviceFound { device });
                    }
                }
            }
            if finish && !token.is_cancelled() {
                token.cancel();
                listener.notify(DriverEvent::DiscoveryFinished);
            }
        });
        Ok(())
    }

    async fn stop_discovery(&mut self) -> Result<(), DriverFault> {
        let busy = self
            .busy_stops
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if busy {
            return Err(DriverFault::Processing);
        }
        if let Some(token) = self.scan.take() {
            token.cancel();
        }
        Ok(())
    }
}
