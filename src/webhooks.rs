//! Best-effort webhook relay.
//!
//! The Source Portal pushes campaign, inventory and payment events here.
//! They are dispatched to an explicit [`Revalidator`] seam instead of being
//! woven into the checkout request path; the checkout pipeline itself never
//! depends on these events, since it re-reads collaborators per attempt.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEvent {
    /// `campaign.updated`, `inventory.updated` or `payment.completed`.
    pub event: String,
    pub product_id: Option<String>,
    #[serde(default)]
    pub tenant: Option<String>,
}

/// Reacts to upstream change notifications, e.g. by revalidating cached
/// storefront pages. Implementations must be best-effort; failures never
/// propagate back to the sender.
#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn on_campaign_changed(&self, product_id: &str);
    async fn on_inventory_changed(&self, product_id: &str);
}

/// Default revalidator: records the event and does nothing else. The
/// rendering layer that owns page caches plugs in its own implementation.
pub struct LogRevalidator;

#[async_trait]
impl Revalidator for LogRevalidator {
    async fn on_campaign_changed(&self, product_id: &str) {
        info!(product_id, "campaign changed, revalidation requested");
    }

    async fn on_inventory_changed(&self, product_id: &str) {
        info!(product_id, "inventory changed, revalidation requested");
    }
}

/// Routes one event to the revalidator. Unknown event types are logged and
/// acknowledged; the sender retries on non-2xx, and there is nothing useful
/// a retry of an unknown event would do.
pub async fn dispatch(event: &SourceEvent, revalidator: &dyn Revalidator) {
    let product_id = event.product_id.as_deref().unwrap_or_default();
    match event.event.as_str() {
        "campaign.updated" => revalidator.on_campaign_changed(product_id).await,
        "inventory.updated" | "payment.completed" => {
            revalidator.on_inventory_changed(product_id).await
        }
        other => warn!(event = other, "ignoring unknown webhook event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRevalidator {
        campaigns: Mutex<Vec<String>>,
        inventory: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Revalidator for RecordingRevalidator {
        async fn on_campaign_changed(&self, product_id: &str) {
            self.campaigns.lock().unwrap().push(product_id.to_string());
        }
        async fn on_inventory_changed(&self, product_id: &str) {
            self.inventory.lock().unwrap().push(product_id.to_string());
        }
    }

    #[tokio::test]
    async fn events_route_to_the_right_hook() {
        let revalidator = RecordingRevalidator::default();

        let campaign = SourceEvent {
            event: "campaign.updated".into(),
            product_id: Some("prod_1".into()),
            tenant: None,
        };
        dispatch(&campaign, &revalidator).await;

        let payment = SourceEvent {
            event: "payment.completed".into(),
            product_id: Some("prod_2".into()),
            tenant: None,
        };
        dispatch(&payment, &revalidator).await;

        let unknown = SourceEvent {
            event: "catalog.rebuilt".into(),
            product_id: None,
            tenant: None,
        };
        dispatch(&unknown, &revalidator).await;

        assert_eq!(*revalidator.campaigns.lock().unwrap(), vec!["prod_1"]);
        assert_eq!(*revalidator.inventory.lock().unwrap(), vec!["prod_2"]);
    }
}
