use async_trait::async_trait;
use domain::BridgeEvent;
use domain::event::EventPublisher;
use tokio::sync::mpsc;

/// Forwards events to an in-process receiver
pub struct ChannelEventPublisher {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl ChannelEventPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(
        &self,
        event: BridgeEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx
            .send(event)
            .map_err(|_| "event receiver dropped".into())
    }
}
