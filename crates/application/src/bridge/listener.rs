use domain::driver::{DriverEvent, DriverListener};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Scan or connection attempt a driver notification was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Scan(u64),
    Session(u64),
}

/// Driver notification tagged with the listener it arrived on
#[derive(Debug)]
pub(crate) struct Notification {
    pub origin: Origin,
    pub event: DriverEvent,
}

/// Queue feeding the bridge pump. Hands out one listener per scan and per
/// connection attempt so late notifications can be told apart.
pub(crate) struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn listener(&self, origin: Origin) -> Arc<dyn DriverListener> {
        Arc::new(ChannelListener {
            origin,
            tx: self.tx.clone(),
        })
    }
}

/// Driver listener that queues notifications for the bridge pump.
/// Never blocks, so drivers may notify from any thread or from inside their
/// own trait methods while the bridge lock is held.
pub struct ChannelListener {
    origin: Origin,
    tx: mpsc::UnboundedSender<Notification>,
}

impl DriverListener for ChannelListener {
    fn notify(&self, event: DriverEvent) {
        let event_type = event.event_type();
        let notification = Notification {
            origin: self.origin,
            event,
        };
        if self.tx.send(notification).is_err() {
            debug!(event_type, "Bridge gone, driver notification dropped");
        }
    }
}
