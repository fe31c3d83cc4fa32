//! HTTP clients for the external collaborators.
//!
//! The Source Portal and the payment-session service are opaque: this
//! module defines the wire shapes this service honors and the trait seams
//! the pipeline consumes, so every policy decision (fail-open pricing,
//! fail-closed inventory) stays testable with in-process fakes.

pub mod payment;
pub mod source_portal;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::inventory::StockStatus;

pub use payment::PaymentSessionClient;
pub use source_portal::SourcePortalClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collaborator returned status {0}")]
    Status(u16),
}

// =============================================================================
// Wire shapes
// =============================================================================

/// `GET {source}/v1/campaign-prices` response. All amounts are explicit
/// integer cents; there is no magnitude heuristic on this boundary.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignPriceResponse {
    pub has_campaign_price: bool,
    pub price_id: Option<String>,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub metadata: Option<CampaignMetadata>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignMetadata {
    pub amount_cents: Option<i64>,
    pub original_amount_cents: Option<i64>,
    pub discount_percent: Option<u8>,
    pub currency: Option<String>,
}

/// Price listing lookup (Stripe prices as mirrored by the Source Portal).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceAmountResponse {
    pub found: bool,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

/// `GET {source}/v1/inventory` response. `has_data` defaulting to `false`
/// is deliberate: absence of the field must read as "no authoritative data",
/// which the gate treats as out of stock.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryResponse {
    pub stock: Option<i64>,
    pub status: Option<StockStatus>,
    pub out_of_stock: bool,
    pub low_stock: bool,
    pub has_data: bool,
}

/// Read-only gift-card verification. This service never redeems.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GiftCardVerification {
    pub valid: bool,
    /// Remaining balance in cents.
    pub balance: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// One line of the outgoing checkout-session request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestItem {
    pub variant_id: String,
    pub quantity: u32,
    pub stripe_price_id: String,
}

/// The single request forwarded to the payment-session collaborator.
/// Assembled once per checkout attempt; its lifecycle ends when the
/// collaborator answers with a redirect URL or an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutRequestItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_card_code: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionResponse {
    pub success: bool,
    pub checkout_url: Option<String>,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Collaborator seams
// =============================================================================

#[async_trait]
pub trait CampaignLookup: Send + Sync {
    /// Active campaign price for `(product_id, original_price_id)`. Passing
    /// `None` for the price id queries the product-level campaign.
    async fn campaign_price(
        &self,
        product_id: &str,
        original_price_id: Option<&str>,
    ) -> Result<CampaignPriceResponse, ClientError>;
}

#[async_trait]
pub trait PriceCatalog: Send + Sync {
    async fn price_amount(
        &self,
        product_id: &str,
        price_id: &str,
    ) -> Result<PriceAmountResponse, ClientError>;

    /// Maps an internal catalog id to its external (`prod_…`) id, when the
    /// mapping exists.
    async fn resolve_external_id(&self, product_id: &str) -> Result<Option<String>, ClientError>;
}

#[async_trait]
pub trait InventoryLookup: Send + Sync {
    async fn by_price_id(&self, price_id: &str) -> Result<InventoryResponse, ClientError>;
    async fn by_product_id(&self, product_id: &str) -> Result<InventoryResponse, ClientError>;
}

#[async_trait]
pub trait GiftCardVerifier: Send + Sync {
    async fn verify(&self, code: &str) -> Result<GiftCardVerification, ClientError>;
}

#[async_trait]
pub trait PaymentSessions: Send + Sync {
    async fn create_session(&self, request: &CheckoutRequest)
        -> Result<SessionResponse, ClientError>;
}

/// Masks a gift-card code for logs: first and last four characters survive.
/// Counts characters, not bytes — codes are buyer-supplied text.
pub fn mask_gift_card_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    if chars.len() <= 8 {
        format!("****{tail}")
    } else {
        let head: String = chars[..4].iter().collect();
        format!("{head}****{tail}")
    }
}
