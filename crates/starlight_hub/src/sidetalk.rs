//! Side-Talk Router (C7): point-to-point and broadcast messaging between
//! Sentinels, mediated by the Hub so peers never hold direct references to
//! each other.

use crate::registry::Registry;
use starlight_ids::SentinelId;
use starlight_protocol::{
    SidetalkAckPayload, SidetalkAckStatus, SidetalkParams, RpcNotification, SIDETALK_BROADCAST,
};

/// Route a `starlight.sidetalk` message. Returns an ack notification to send
/// back to the sender when delivery failed or the sender requested a reply.
pub async fn route(registry: &Registry, sender_id: SentinelId, params: &SidetalkParams) -> Option<RpcNotification> {
    if params.to == SIDETALK_BROADCAST {
        let ready = registry.ready_sentinels().await;
        for record in ready.into_iter().filter(|r| r.id != sender_id) {
            let notification = RpcNotification::new(
                "starlight.sidetalk",
                serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
            );
            let _ = record.outbound.send(serde_json::to_string(&notification).unwrap_or_default());
        }
        return params.reply_to.as_ref().map(|_| {
            ack_notification(SidetalkAckStatus::Delivered, params.reply_to.clone(), Vec::new())
        });
    }

    match registry.find_by_layer(&params.to).await {
        Some(target) if target.is_ready() => {
            let notification = RpcNotification::new(
                "starlight.sidetalk",
                serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
            );
            let _ = target.outbound.send(serde_json::to_string(&notification).unwrap_or_default());
            params
                .reply_to
                .as_ref()
                .map(|_| ack_notification(SidetalkAckStatus::Delivered, params.reply_to.clone(), Vec::new()))
        }
        _ => {
            let available = registry.available_layers().await;
            Some(ack_notification(SidetalkAckStatus::Undeliverable, params.reply_to.clone(), available))
        }
    }
}

fn ack_notification(
    status: SidetalkAckStatus,
    reply_to: Option<String>,
    available_layers: Vec<String>,
) -> RpcNotification {
    let payload = SidetalkAckPayload {
        status,
        reply_to,
        available_layers,
    };
    RpcNotification::new("starlight.sidetalk_ack", serde_json::to_value(payload).unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SentinelRecord;
    use starlight_protocol::SentinelState;
    use std::collections::HashSet;
    use std::time::Instant;
    use tokio::sync::mpsc;

    fn fake_record(layer: &str) -> (SentinelRecord, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SentinelRecord {
                id: SentinelId::new(),
                layer: layer.to_string(),
                priority: 1,
                capabilities: HashSet::new(),
                selectors: Vec::new(),
                state: SentinelState::Ready,
                last_heartbeat: Instant::now(),
                last_entropy: None,
                last_health: None,
                registered_at: Instant::now(),
                outbound: tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn undeliverable_reports_available_layers() {
        let registry = Registry::new();
        let (sender, _rx) = fake_record("Sender");
        let sender_id = sender.id;
        registry.register(sender).await;
        let (other, _rx2) = fake_record("OtherLayer");
        registry.register(other).await;

        let params = SidetalkParams {
            from: "Sender".to_string(),
            to: "NoSuchLayer".to_string(),
            topic: "t".to_string(),
            payload: serde_json::Value::Null,
            reply_to: None,
        };
        let ack = route(&registry, sender_id, &params).await.unwrap();
        assert_eq!(ack.method, "starlight.sidetalk_ack");
    }

    #[tokio::test]
    async fn direct_delivery_reaches_target_outbound_channel() {
        let registry = Registry::new();
        let (sender, _rx) = fake_record("Sender");
        let sender_id = sender.id;
        registry.register(sender).await;
        let (target, mut target_rx) = fake_record("Target");
        registry.register(target).await;

        let params = SidetalkParams {
            from: "Sender".to_string(),
            to: "Target".to_string(),
            topic: "t".to_string(),
            payload: serde_json::json!({"x": 1}),
            reply_to: None,
        };
        let ack = route(&registry, sender_id, &params).await;
        assert!(ack.is_none());
        assert!(target_rx.try_recv().is_ok());
    }
}
