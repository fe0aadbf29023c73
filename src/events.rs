//! Store events, published to NATS when a client is configured.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        user_id: Uuid,
        total_amount: i64,
    },
    OrderStatusChanged {
        order_id: Uuid,
        status: String,
    },
    DesignGenerated {
        design_id: Uuid,
        user_id: Uuid,
    },
}

impl StoreEvent {
    fn subject(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "tesora.orders.created",
            Self::OrderStatusChanged { .. } => "tesora.orders.status",
            Self::DesignGenerated { .. } => "tesora.designs.generated",
        }
    }
}

/// Best-effort publish; a missing client or a failed publish never fails the
/// request that raised the event.
pub async fn publish(nats: &Option<async_nats::Client>, event: StoreEvent) {
    let Some(client) = nats else { return };
    match serde_json::to_vec(&event) {
        Ok(payload) => {
            if let Err(e) = client.publish(event.subject(), payload.into()).await {
                tracing::warn!(error = %e, subject = event.subject(), "event publish failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "event serialization failed"),
    }
}
