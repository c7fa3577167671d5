use domain::driver::DriverEvent;
use domain::error::BridgeError;
use domain::BridgeEvent;
use std::sync::Weak;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::listener::{Notification, Origin};
use super::{BridgeInner, PrinterBridge};

/// Apply driver notifications to the bridge until it shuts down or is dropped
pub(super) async fn run(
    bridge: Weak<BridgeInner>,
    mut rx: mpsc::UnboundedReceiver<Notification>,
    shutdown: CancellationToken,
) {
    debug!("Notification pump started");
    loop {
        let notification = tokio::select! {
            _ = shutdown.cancelled() => break,
            notification = rx.recv() => match notification {
                Some(notification) => notification,
                None => break,
            },
        };
        let Some(inner) = bridge.upgrade() else {
            break;
        };
        PrinterBridge { inner }.apply(notification).await;
    }
    info!("Notification pump stopped");
}

impl PrinterBridge {
    async fn apply(&self, Notification { origin, event }: Notification) {
        debug!(event_type = event.event_type(), origin = ?origin, "Driver notification");
        let events: Vec<BridgeEvent> = {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            match (origin, event) {
                (Origin::Scan(scan), DriverEvent::DeviceFound { device }) => state
                    .discovery
                    .deliver(scan, device.clone())
                    .map(|handle| BridgeEvent::device_discovered(handle, device))
                    .into_iter()
                    .collect(),
                (Origin::Scan(scan), DriverEvent::DiscoveryFinished) => state
                    .discovery
                    .finish(scan)
                    .map(|handle| BridgeEvent::discovery_ended(handle, "finished"))
                    .into_iter()
                    .collect(),
                // Job ids are unique per dispatch, so stale completions find nothing
                (_, DriverEvent::JobFinished { job_id, result }) => state
                    .dispatcher
                    .complete(&mut state.router, &job_id, result)
                    .into_iter()
                    .collect(),
                (Origin::Session(attempt), DriverEvent::ConnectionLost { reason }) => {
                    if !state.session.is_current(attempt) {
                        debug!(reason = %reason, attempt, "Connection loss outside the live session, ignored");
                        Vec::new()
                    } else {
                        let mut events = state
                            .dispatcher
                            .abort_all(&mut state.router, BridgeError::ConnectionLost);
                        if let Some(session) = state.session.teardown(&reason).await {
                            events.insert(0, BridgeEvent::session_closed(session.target, reason));
                        }
                        events
                    }
                }
                (origin, event) => {
                    debug!(event_type = event.event_type(), origin = ?origin, "Notification on an unrelated listener, ignored");
                    Vec::new()
                }
            }
        };
        self.publish_all(events).await;
    }
}
