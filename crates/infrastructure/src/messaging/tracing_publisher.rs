use async_trait::async_trait;
use domain::BridgeEvent;
use domain::event::EventPublisher;
use tracing::info;

/// Writes every event to the log
#[derive(Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(
        &self,
        event: BridgeEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload = serde_json::to_string(&event)?;
        info!(event_type = event.event_type(), "📡 {}", payload);
        Ok(())
    }
}
