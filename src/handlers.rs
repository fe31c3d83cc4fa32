//! HTTP surface: request shapes, handlers and the router.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::domain::cart::{Cart, ItemType, LineItem};
use crate::domain::pricing::discount_percent;
use crate::error::CheckoutError;
use crate::services::CheckoutInput;
use crate::state::AppState;
use crate::webhooks::{self, SourceEvent};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/checkout", post(checkout))
        .route("/api/campaigns/price", get(campaign_price))
        .route("/api/inventory/status", get(inventory_status))
        .route("/api/gift-cards/verify", post(gift_card_verify))
        .route("/api/webhooks/source", post(source_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "storefront-checkout" }))
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    // Nested: validates each item. An empty list is refused by the
    // checkout service itself.
    #[validate]
    pub items: Vec<CheckoutItemPayload>,
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(url(message = "successUrl must be a valid URL"))]
    pub success_url: String,
    #[validate(url(message = "cancelUrl must be a valid URL"))]
    pub cancel_url: String,
    pub gift_card_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemPayload {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    pub variant_key: Option<String>,
    #[validate(length(min = 1, message = "chosenPriceId is required"))]
    pub chosen_price_id: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    #[serde(default)]
    pub item_type: ItemType,
    pub gift_card_amount_cents: Option<i64>,
    pub unit_amount_cents: i64,
    pub currency: Option<String>,
}

impl From<CheckoutItemPayload> for LineItem {
    fn from(payload: CheckoutItemPayload) -> Self {
        LineItem {
            product_id: payload.product_id,
            variant_key: payload.variant_key,
            chosen_price_id: payload.chosen_price_id,
            quantity: payload.quantity,
            item_type: payload.item_type,
            gift_card_amount_cents: payload.gift_card_amount_cents,
            unit_amount_cents: payload.unit_amount_cents,
            currency: payload.currency.unwrap_or_else(|| "SEK".to_string()),
        }
    }
}

async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<Value>, CheckoutError> {
    payload
        .validate()
        .map_err(|err| CheckoutError::InvalidRequest(err.to_string()))?;

    let input = CheckoutInput {
        cart: Cart::from_items(payload.items.into_iter().map(Into::into).collect()),
        gift_card_code: payload.gift_card_code,
        customer_email: payload.customer_email,
        success_url: payload.success_url,
        cancel_url: payload.cancel_url,
    };

    let outcome = state.checkout.build_checkout(input).await?;
    Ok(Json(json!({
        "success": true,
        "checkoutUrl": outcome.redirect_url,
        "sessionId": outcome.session_id,
    })))
}

// =============================================================================
// Campaign price view
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPriceParams {
    pub product_id: String,
    pub original_price_id: Option<String>,
    /// Regular price in cents, when the caller wants a computed discount.
    pub regular_amount_cents: Option<i64>,
}

/// Buyer-facing campaign price lookup. Collaborator failures read as "no
/// campaign" — this endpoint inherits the resolver's fail-open policy.
async fn campaign_price(
    State(state): State<AppState>,
    Query(params): Query<CampaignPriceParams>,
) -> Result<Json<Value>, CheckoutError> {
    if params.product_id.is_empty() {
        return Err(CheckoutError::InvalidRequest("productId is required".into()));
    }

    let response = match state
        .campaigns
        .campaign_price(&params.product_id, params.original_price_id.as_deref())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(product_id = %params.product_id, %err, "campaign lookup failed");
            return Ok(Json(json!({
                "hasCampaignPrice": false,
                "productId": params.product_id,
            })));
        }
    };

    if !response.has_campaign_price || response.price_id.is_none() {
        return Ok(Json(json!({
            "hasCampaignPrice": false,
            "productId": params.product_id,
        })));
    }

    let metadata = response.metadata.unwrap_or_default();
    let original_cents = metadata
        .original_amount_cents
        .or(params.regular_amount_cents);
    let discount = metadata.discount_percent.or_else(|| {
        match (original_cents, metadata.amount_cents) {
            (Some(original), Some(campaign)) => discount_percent(original, campaign),
            _ => None,
        }
    });

    Ok(Json(json!({
        "hasCampaignPrice": true,
        "productId": params.product_id,
        "priceId": response.price_id,
        "campaignId": response.campaign_id,
        "campaignName": response.campaign_name,
        "amountCents": metadata.amount_cents,
        "originalAmountCents": original_cents,
        "discountPercent": discount,
    })))
}

// =============================================================================
// Inventory status view
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatusParams {
    pub product_id: Option<String>,
    pub stripe_price_id: Option<String>,
}

async fn inventory_status(
    State(state): State<AppState>,
    Query(params): Query<InventoryStatusParams>,
) -> Result<Json<Value>, CheckoutError> {
    if params.product_id.is_none() && params.stripe_price_id.is_none() {
        return Err(CheckoutError::InvalidRequest(
            "productId or stripePriceId is required".into(),
        ));
    }

    let snapshot = state
        .gate
        .snapshot(
            params.product_id.as_deref(),
            params.stripe_price_id.as_deref(),
        )
        .await;

    Ok(Json(serde_json::to_value(&snapshot).unwrap_or_default()))
}

// =============================================================================
// Gift-card verification (read-only)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GiftCardVerifyPayload {
    pub code: String,
}

async fn gift_card_verify(
    State(state): State<AppState>,
    Json(payload): Json<GiftCardVerifyPayload>,
) -> Result<Json<Value>, CheckoutError> {
    if payload.code.trim().is_empty() {
        return Err(CheckoutError::InvalidRequest(
            "Gift card code is required".into(),
        ));
    }

    let verification = state
        .gift_cards
        .verify(&payload.code)
        .await
        .map_err(|err| CheckoutError::Internal(err.to_string()))?;

    Ok(Json(json!({
        "valid": verification.valid,
        "balance": verification.balance,
        "expiresAt": verification.expires_at,
        "error": verification.error,
    })))
}

// =============================================================================
// Webhook relay
// =============================================================================

async fn source_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<SourceEvent>,
) -> Result<(StatusCode, Json<Value>), CheckoutError> {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();
    if token != state.config.webhook_token {
        return Err(CheckoutError::Unauthorized);
    }

    webhooks::dispatch(&event, state.revalidator.as_ref()).await;
    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
