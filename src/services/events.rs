use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::MatchResult;

/// Event emitted after every successful matching computation
///
/// Downstream consumers (notification fan-out, analytics) subscribe to this
/// channel; the engine itself stays a pure input → MatchResult function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesComputedEvent {
    #[serde(rename = "eventId")]
    pub event_id: uuid::Uuid,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "requesterId")]
    pub requester_id: String,
    #[serde(rename = "totalReturned")]
    pub total_returned: usize,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl MatchesComputedEvent {
    pub fn from_result(result: &MatchResult) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4(),
            request_id: result.request.id.clone(),
            requester_id: result.request.requester_id.clone(),
            total_returned: result.total_returned,
            generated_at: result.generated_at,
        }
    }
}

/// Fire-and-forget event emitter backed by an unbounded channel
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<MatchesComputedEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MatchesComputedEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Emit an event; a closed channel is logged, never surfaced
    pub fn emit(&self, event: MatchesComputedEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("Event consumer is gone, dropping matches-computed event");
        }
    }
}

/// Drain the event channel, logging each event
///
/// Stands in for the notification consumer, which runs as a separate
/// component in production deployments.
pub async fn run_event_logger(mut receiver: mpsc::UnboundedReceiver<MatchesComputedEvent>) {
    while let Some(event) = receiver.recv().await {
        tracing::info!(
            "Matches computed for request {}: {} candidates (requester {})",
            event.request_id,
            event.total_returned,
            event.requester_id
        );
    }
}
