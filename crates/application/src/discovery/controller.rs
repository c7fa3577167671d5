use chrono::{DateTime, Utc};
use domain::discovery::{DeviceInfo, DiscoveryFilter, DiscoveryHandle, DiscoveryRequest};
use domain::driver::{DeviceScanner, DriverListener};
use domain::error::{BridgeError, Result};
use domain::CallbackId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives devices found by a scan.
/// Dropped when the scan ends, so channel-backed sinks observe the end.
pub trait DeviceSink: Send + Sync {
    /// Returns false once the receiving side is gone
    fn deliver(&self, device: DeviceInfo) -> bool;
}

impl DeviceSink for mpsc::UnboundedSender<DeviceInfo> {
    fn deliver(&self, device: DeviceInfo) -> bool {
        self.send(device).is_ok()
    }
}

struct ActiveScan {
    /// Sequence number of the scan, tags its driver listener
    id: u64,
    request: DiscoveryRequest,
    handle: DiscoveryHandle,
    sink: Box<dyn DeviceSink>,
    /// Cancels the scan deadline timer, if any
    timer: CancellationToken,
    started_at: DateTime<Utc>,
    delivered: usize,
}

/// A scan that was just started
pub struct StartedScan {
    pub handle: DiscoveryHandle,
    pub timer: CancellationToken,
}

/// Owns the scanner and the at-most-one active discovery request
pub struct DiscoveryController {
    scanner: Box<dyn DeviceScanner>,
    active: Option<ActiveScan>,
    last_scan_id: u64,
    /// Scan that ended without a stop call; stopping it is a no-op
    last_finished: Option<DiscoveryHandle>,
    stop_retry_limit: u32,
    stop_retry_delay: Duration,
}

impl DiscoveryController {
    pub fn new(
        scanner: Box<dyn DeviceScanner>,
        stop_retry_limit: u32,
        stop_retry_delay: Duration,
    ) -> Self {
        Self {
            scanner,
            active: None,
            last_scan_id: 0,
            last_finished: None,
            stop_retry_limit,
            stop_retry_delay,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|scan| scan.request.active)
    }

    pub fn active_handle(&self) -> Option<&DiscoveryHandle> {
        self.active.as_ref().map(|scan| &scan.handle)
    }

    /// Start a scan. `listener_for` builds the driver listener for the
    /// scan's id; notifications from any other scan are ignored.
    pub async fn start<F>(
        &mut self,
        filter: &DiscoveryFilter,
        sink: Box<dyn DeviceSink>,
        listener_for: F,
    ) -> Result<StartedScan>
    where
        F: FnOnce(u64) -> Arc<dyn DriverListener>,
    {
        if self.is_active() {
            return Err(BridgeError::AlreadyInProgress);
        }

        let id = self.last_scan_id + 1;
        self.scanner.start_discovery(filter, listener_for(id)).await?;
        self.last_scan_id = id;

        let callback_id = CallbackId::generate();
        let handle = DiscoveryHandle::new(callback_id.clone());
        let timer = CancellationToken::new();
        info!(handle = %handle, "🔍 Discovery started");
        self.last_finished = None;
        self.active = Some(ActiveScan {
            id,
            request: DiscoveryRequest {
                callback_id,
                active: true,
            },
            handle: handle.clone(),
            sink,
            timer: timer.clone(),
            started_at: Utc::now(),
            delivered: 0,
        });
        Ok(StartedScan { handle, timer })
    }

    /// Stop the scan identified by `handle`.
    /// Returns true when this call ended the scan, false when it had
    /// already ended on its own.
    pub async fn stop(&mut self, handle: &DiscoveryHandle) -> Result<bool> {
        match &self.active {
            Some(scan) if &scan.handle == handle => {}
            _ => {
                if self.last_finished.as_ref() == Some(handle) {
                    self.last_finished = None;
                    return Ok(false);
                }
                return Err(BridgeError::NotInProgress);
            }
        }

        self.halt_scanner().await;
        self.clear("stopped");
        Ok(true)
    }

    /// Push a device found by scan `scan_id` to the active sink
    pub fn deliver(&mut self, scan_id: u64, device: DeviceInfo) -> Option<DiscoveryHandle> {
        let Some(scan) = self.active.as_mut().filter(|scan| scan.id == scan_id) else {
            debug!(printer = %device.target, scan = scan_id, "Device reported outside its scan, dropped");
            return None;
        };
        if !scan.sink.deliver(device) {
            debug!(handle = %scan.handle, "Discovery sink closed");
        }
        scan.delivered += 1;
        Some(scan.handle.clone())
    }

    /// Scan `scan_id` finished on its own
    pub fn finish(&mut self, scan_id: u64) -> Option<DiscoveryHandle> {
        if self.active.as_ref().is_none_or(|scan| scan.id != scan_id) {
            debug!(scan = scan_id, "Finish reported for a scan that is not running, ignored");
            return None;
        }
        let handle = self.clear("finished by driver")?;
        self.last_finished = Some(handle.clone());
        Some(handle)
    }

    /// The scan deadline for `handle` elapsed
    pub async fn expire(&mut self, handle: &DiscoveryHandle) -> Option<DiscoveryHandle> {
        if self.active_handle() != Some(handle) {
            return None;
        }
        self.halt_scanner().await;
        let handle = self.clear("timed out")?;
        self.last_finished = Some(handle.clone());
        Some(handle)
    }

    /// Stop the driver scan, retrying while it reports it is still busy
    async fn halt_scanner(&mut self) {
        let mut attempts = 0;
        loop {
            match self.scanner.stop_discovery().await {
                Ok(()) => return,
                Err(fault) if fault.is_transient() && attempts < self.stop_retry_limit => {
                    attempts += 1;
                    debug!("Scanner busy ({}), retry {} of {}", fault, attempts, self.stop_retry_limit);
                    tokio::time::sleep(self.stop_retry_delay).await;
                }
                Err(fault) => {
                    warn!(error = %fault, attempts = attempts, "Scanner did not stop cleanly");
                    return;
                }
            }
        }
    }

    fn clear(&mut self, reason: &str) -> Option<DiscoveryHandle> {
        let mut scan = self.active.take()?;
        scan.request.active = false;
        scan.timer.cancel();
        let elapsed = Utc::now() - scan.started_at;
        info!(
            handle = %scan.handle,
            devices = scan.delivered,
            elapsed_ms = elapsed.num_milliseconds(),
            "Discovery {}",
            reason
        );
        Some(scan.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DriverFault;
    use domain::driver::DriverEvent;
    use infrastructure::SimulatedScanner;

    struct Ignore;

    impl DriverListener for Ignore {
        fn notify(&self, _event: DriverEvent) {}
    }

    fn ignore(_scan: u64) -> Arc<dyn DriverListener> {
        Arc::new(Ignore)
    }

    fn controller(scanner: SimulatedScanner) -> DiscoveryController {
        DiscoveryController::new(Box::new(scanner), 3, Duration::from_millis(1))
    }

    fn device(target: &str) -> DeviceInfo {
        DeviceInfo {
            device_name: "TM-T88VI".to_string(),
            target: target.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let mut discovery = controller(SimulatedScanner::new(Vec::new(), Duration::from_secs(1)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let started = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx.clone()), ignore)
            .await
            .unwrap();

        let again = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx), ignore)
            .await;
        assert!(matches!(again, Err(BridgeError::AlreadyInProgress)));

        assert!(discovery.stop(&started.handle).await.unwrap());
        assert!(!discovery.is_active());
        assert!(started.timer.is_cancelled());
    }

    #[tokio::test]
    async fn test_stop_with_foreign_handle() {
        let mut discovery = controller(SimulatedScanner::new(Vec::new(), Duration::from_secs(1)));
        let stranger = DiscoveryHandle::new(CallbackId::from_raw("nope"));
        assert!(matches!(
            discovery.stop(&stranger).await,
            Err(BridgeError::NotInProgress)
        ));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_nothing_active() {
        let mut discovery = controller(
            SimulatedScanner::new(Vec::new(), Duration::from_secs(1)).fail_start_with(3),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx), ignore)
            .await;
        assert!(matches!(
            result,
            Err(BridgeError::DriverError(DriverFault::Code(3)))
        ));
        assert!(!discovery.is_active());
    }

    #[tokio::test]
    async fn test_busy_scanner_is_retried() {
        let mut discovery = controller(
            SimulatedScanner::new(Vec::new(), Duration::from_secs(1)).busy_stops(2),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let started = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx), ignore)
            .await
            .unwrap();
        assert!(discovery.stop(&started.handle).await.unwrap());
        assert!(!discovery.is_active());
    }

    #[tokio::test]
    async fn test_stop_after_finish_is_noop() {
        let mut discovery = controller(SimulatedScanner::new(Vec::new(), Duration::from_secs(1)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx), ignore)
            .await
            .unwrap();

        assert_eq!(discovery.deliver(1, device("TCP:10.0.0.1")), Some(started.handle.clone()));
        assert_eq!(discovery.finish(1), Some(started.handle.clone()));

        // Sink dropped with the scan
        assert_eq!(rx.recv().await.map(|d| d.target), Some("TCP:10.0.0.1".to_string()));
        assert_eq!(rx.recv().await, None);

        assert!(!discovery.stop(&started.handle).await.unwrap());
        assert!(discovery.deliver(1, device("TCP:10.0.0.2")).is_none());
    }

    #[tokio::test]
    async fn test_late_notifications_from_earlier_scan_ignored() {
        let mut discovery = controller(SimulatedScanner::new(Vec::new(), Duration::from_secs(1)));
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let first = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx_a), ignore)
            .await
            .unwrap();
        assert!(discovery.stop(&first.handle).await.unwrap());

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let mut ids = Vec::new();
        let second = discovery
            .start(&DiscoveryFilter::default(), Box::new(tx_b), |id| {
                ids.push(id);
                ignore(id)
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![2]);

        assert!(discovery.deliver(1, device("TCP:10.0.0.7")).is_none());
        assert!(discovery.finish(1).is_none());
        assert_eq!(discovery.active_handle(), Some(&second.handle));
        assert!(rx_b.try_recv().is_err());

        assert_eq!(discovery.deliver(2, device("TCP:10.0.0.8")), Some(second.handle.clone()));
        assert_eq!(rx_b.recv().await.map(|d| d.target), Some("TCP:10.0.0.8".to_string()));
    }
}
