//! Checkout assembly.
//!
//! Runs the inventory gate over the whole cart (all-or-nothing), resolves
//! the charge price per item, and forwards a single session request to the
//! payment collaborator.
//!
//! Known limitation: stock is re-read, not reserved. Two concurrent
//! checkouts for the same one-of-a-kind item can both pass the gate;
//! oversell prevention, if any, happens in the payment-session
//! collaborator. Fixing this would require a stateful inventory service
//! this system does not own.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{
    mask_gift_card_code, CheckoutRequest, CheckoutRequestItem, GiftCardVerifier, PaymentSessions,
};
use crate::domain::cart::Cart;
use crate::domain::pricing::RegularPrice;
use crate::error::CheckoutError;

use super::{InventoryGate, PriceResolver};

pub struct CheckoutInput {
    pub cart: Cart,
    pub gift_card_code: Option<String>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub redirect_url: String,
    pub session_id: Option<String>,
}

pub struct CheckoutService {
    resolver: Arc<PriceResolver>,
    gate: Arc<InventoryGate>,
    gift_cards: Arc<dyn GiftCardVerifier>,
    payments: Arc<dyn PaymentSessions>,
    tenant_id: String,
    gift_cards_enabled: bool,
}

impl CheckoutService {
    pub fn new(
        resolver: Arc<PriceResolver>,
        gate: Arc<InventoryGate>,
        gift_cards: Arc<dyn GiftCardVerifier>,
        payments: Arc<dyn PaymentSessions>,
        tenant_id: impl Into<String>,
        gift_cards_enabled: bool,
    ) -> Self {
        Self {
            resolver,
            gate,
            gift_cards,
            payments,
            tenant_id: tenant_id.into(),
            gift_cards_enabled,
        }
    }

    /// The full pipeline for one checkout attempt.
    pub async fn build_checkout(
        &self,
        input: CheckoutInput,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let cart = &input.cart;
        if cart.is_empty() {
            return Err(CheckoutError::InvalidRequest("Cart is empty".into()));
        }

        // Tenant policy first: refuse before touching any collaborator.
        if cart.has_gift_card_items() && !self.gift_cards_enabled {
            return Err(CheckoutError::GiftCardsDisabled);
        }

        // Gate every non-gift-card item. All-or-nothing: the first
        // unavailable item refuses the whole checkout.
        for item in cart.items() {
            let verdict = self.gate.check_availability(item).await;
            if !verdict.available {
                return Err(CheckoutError::OutOfStock(
                    verdict
                        .reason
                        .unwrap_or_else(|| format!("{} is unavailable", item.display_id())),
                ));
            }
        }

        // Attempt id ties the session back to our logs when the payment
        // collaborator echoes metadata in its own events.
        let attempt_id = uuid::Uuid::now_v7();
        let mut metadata: BTreeMap<String, String> = BTreeMap::new();
        metadata.insert("tenant".into(), self.tenant_id.clone());
        metadata.insert("source".into(), "checkout_service".into());
        metadata.insert("checkout_attempt_id".into(), attempt_id.to_string());

        let mut request_items = Vec::with_capacity(cart.item_count());
        for (index, item) in cart.items().iter().enumerate() {
            // Gift cards have no campaigns and no catalog mapping; their
            // chosen price id goes upstream as-is.
            if item.is_gift_card() {
                if item.chosen_price_id.is_empty() {
                    return Err(CheckoutError::MissingPrice(format!(
                        "No usable price for item {} ({})",
                        index, item.product_id
                    )));
                }
                metadata.insert(format!("item_{index}_variant_id"), item.display_id().into());
                request_items.push(CheckoutRequestItem {
                    variant_id: item.display_id().to_string(),
                    quantity: item.quantity,
                    stripe_price_id: item.chosen_price_id.clone(),
                });
                continue;
            }

            let regular = RegularPrice {
                price_id: item.chosen_price_id.clone(),
                amount_cents: item.unit_amount_cents,
                currency: item.currency.clone(),
            };
            let resolved = self
                .resolver
                .resolve(&item.product_id, &regular, item.variant_price_id())
                .await;

            // A missing price must never silently default to zero or drop
            // the line item.
            let variant_id = item.display_id();
            if resolved.price_id.is_empty() || variant_id.is_empty() {
                return Err(CheckoutError::MissingPrice(format!(
                    "No usable price for item {} ({})",
                    index, item.product_id
                )));
            }

            if resolved.is_campaign {
                if let Some(campaign_id) = &resolved.campaign_id {
                    metadata.insert(format!("item_{index}_campaign_id"), campaign_id.clone());
                }
                if let Some(campaign_name) = &resolved.campaign_name {
                    metadata.insert(format!("item_{index}_campaign_name"), campaign_name.clone());
                }
            }
            metadata.insert(format!("item_{index}_variant_id"), variant_id.to_string());

            request_items.push(CheckoutRequestItem {
                variant_id: variant_id.to_string(),
                quantity: item.quantity,
                stripe_price_id: resolved.price_id,
            });
        }

        // Verification is read-only and for display/logging only; the
        // upstream service independently re-verifies and redeems. An
        // invalid code is forwarded anyway and rejected there.
        if let Some(code) = &input.gift_card_code {
            match self.gift_cards.verify(code).await {
                Ok(verification) if verification.valid => {
                    info!(
                        code = %mask_gift_card_code(code),
                        balance = ?verification.balance,
                        "gift card verified"
                    );
                }
                Ok(verification) => {
                    warn!(
                        code = %mask_gift_card_code(code),
                        error = ?verification.error,
                        "gift card did not verify, forwarding for upstream decision"
                    );
                }
                Err(err) => {
                    warn!(code = %mask_gift_card_code(code), %err, "gift card verification unavailable");
                }
            }
            metadata.insert("gift_card_code".into(), code.clone());
        }

        let request = CheckoutRequest {
            items: request_items,
            customer_email: input.customer_email,
            success_url: input.success_url,
            cancel_url: input.cancel_url,
            gift_card_code: input.gift_card_code,
            metadata,
        };

        let session = self
            .payments
            .create_session(&request)
            .await
            .map_err(|err| CheckoutError::Upstream(err.to_string()))?;

        if !session.success {
            return Err(CheckoutError::Upstream(
                session
                    .error
                    .unwrap_or_else(|| "Checkout session creation failed".into()),
            ));
        }
        let redirect_url = session.checkout_url.ok_or_else(|| {
            CheckoutError::Upstream("Collaborator returned no checkout URL".into())
        })?;

        info!(
            session_id = ?session.session_id,
            attempt_id = %attempt_id,
            item_count = request.items.len(),
            "checkout session created"
        );

        Ok(CheckoutOutcome {
            redirect_url,
            session_id: session.session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::clients::{
        CampaignLookup, CampaignMetadata, CampaignPriceResponse, ClientError, GiftCardVerification,
        InventoryLookup, InventoryResponse, PriceAmountResponse, PriceCatalog, SessionResponse,
    };
    use crate::domain::cart::{ItemType, LineItem};
    use crate::domain::inventory::StockStatus;

    // ---- fakes --------------------------------------------------------------

    #[derive(Default)]
    struct NoCampaigns;

    #[async_trait]
    impl CampaignLookup for NoCampaigns {
        async fn campaign_price(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<CampaignPriceResponse, ClientError> {
            Ok(CampaignPriceResponse::default())
        }
    }

    #[derive(Default)]
    struct CountingCampaigns {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CampaignLookup for CountingCampaigns {
        async fn campaign_price(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<CampaignPriceResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CampaignPriceResponse::default())
        }
    }

    struct VariantCampaign {
        price_id: String,
        amount_cents: i64,
    }

    #[async_trait]
    impl CampaignLookup for VariantCampaign {
        async fn campaign_price(
            &self,
            _: &str,
            original_price_id: Option<&str>,
        ) -> Result<CampaignPriceResponse, ClientError> {
            if original_price_id.is_none() {
                return Ok(CampaignPriceResponse::default());
            }
            Ok(CampaignPriceResponse {
                has_campaign_price: true,
                price_id: Some(self.price_id.clone()),
                campaign_id: Some("camp_summer".into()),
                campaign_name: Some("Summer Sale".into()),
                metadata: Some(CampaignMetadata {
                    amount_cents: Some(self.amount_cents),
                    original_amount_cents: Some(1000),
                    discount_percent: Some(20),
                    currency: Some("SEK".into()),
                }),
            })
        }
    }

    #[derive(Default)]
    struct PassthroughCatalog;

    #[async_trait]
    impl PriceCatalog for PassthroughCatalog {
        async fn price_amount(&self, _: &str, _: &str) -> Result<PriceAmountResponse, ClientError> {
            Ok(PriceAmountResponse::default())
        }
        async fn resolve_external_id(&self, _: &str) -> Result<Option<String>, ClientError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct StockedInventory {
        stock: HashMap<String, InventoryResponse>,
    }

    impl StockedInventory {
        fn with_stock(mut self, key: &str, stock: i64) -> Self {
            self.stock.insert(
                key.to_string(),
                InventoryResponse {
                    stock: Some(stock),
                    status: Some(StockStatus::InStock),
                    out_of_stock: false,
                    low_stock: false,
                    has_data: true,
                },
            );
            self
        }

        fn with_no_data(mut self, key: &str) -> Self {
            self.stock.insert(key.to_string(), InventoryResponse::default());
            self
        }
    }

    #[async_trait]
    impl InventoryLookup for StockedInventory {
        async fn by_price_id(&self, price_id: &str) -> Result<InventoryResponse, ClientError> {
            Ok(self.stock.get(price_id).cloned().unwrap_or_default())
        }
        async fn by_product_id(&self, product_id: &str) -> Result<InventoryResponse, ClientError> {
            Ok(self.stock.get(product_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeGiftCards {
        balance: Option<i64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GiftCardVerifier for FakeGiftCards {
        async fn verify(&self, _: &str) -> Result<GiftCardVerification, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GiftCardVerification {
                valid: self.balance.is_some(),
                balance: self.balance,
                expires_at: None,
                error: None,
            })
        }
    }

    /// Records the forwarded request so assertions can inspect it.
    #[derive(Default)]
    struct RecordingPayments {
        last_request: Mutex<Option<CheckoutRequest>>,
        calls: AtomicUsize,
        reject_with: Option<String>,
    }

    #[async_trait]
    impl PaymentSessions for RecordingPayments {
        async fn create_session(
            &self,
            request: &CheckoutRequest,
        ) -> Result<SessionResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(message) = &self.reject_with {
                return Ok(SessionResponse {
                    success: false,
                    error: Some(message.clone()),
                    ..Default::default()
                });
            }
            Ok(SessionResponse {
                success: true,
                checkout_url: Some("https://pay.example/session/cs_123".into()),
                session_id: Some("cs_123".into()),
                error: None,
            })
        }
    }

    // ---- helpers ------------------------------------------------------------

    fn product_item(variant: Option<&str>, quantity: u32) -> LineItem {
        LineItem {
            product_id: "prod_1".into(),
            variant_key: variant.map(Into::into),
            chosen_price_id: "price_regular".into(),
            quantity,
            item_type: ItemType::Product,
            gift_card_amount_cents: None,
            unit_amount_cents: 1000,
            currency: "SEK".into(),
        }
    }

    fn gift_card_item() -> LineItem {
        LineItem {
            product_id: "gift-card".into(),
            variant_key: None,
            chosen_price_id: "price_gift".into(),
            quantity: 1,
            item_type: ItemType::GiftCard,
            gift_card_amount_cents: Some(500_00),
            unit_amount_cents: 500_00,
            currency: "SEK".into(),
        }
    }

    fn input(items: Vec<LineItem>, gift_card_code: Option<&str>) -> CheckoutInput {
        CheckoutInput {
            cart: Cart::from_items(items),
            gift_card_code: gift_card_code.map(Into::into),
            customer_email: Some("buyer@example.com".into()),
            success_url: "https://shop.example/success".into(),
            cancel_url: "https://shop.example/cart".into(),
        }
    }

    struct Harness {
        service: CheckoutService,
        payments: Arc<RecordingPayments>,
        gift_cards: Arc<FakeGiftCards>,
    }

    fn harness(
        campaigns: Arc<dyn CampaignLookup>,
        inventory: StockedInventory,
        gift_cards: FakeGiftCards,
        payments: RecordingPayments,
        gift_cards_enabled: bool,
    ) -> Harness {
        let payments = Arc::new(payments);
        let gift_cards = Arc::new(gift_cards);
        let resolver = Arc::new(PriceResolver::new(
            campaigns,
            Arc::new(PassthroughCatalog),
        ));
        let gate = Arc::new(InventoryGate::new(Arc::new(inventory)));
        let service = CheckoutService::new(
            resolver,
            gate,
            gift_cards.clone(),
            payments.clone(),
            "atelier",
            gift_cards_enabled,
        );
        Harness {
            service,
            payments,
            gift_cards,
        }
    }

    // ---- scenarios ----------------------------------------------------------

    #[tokio::test]
    async fn regular_price_forwarded_unchanged() {
        // Scenario: no variant, no campaign, sufficient stock.
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_stock("prod_1", 20),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );

        let outcome = h
            .service
            .build_checkout(input(vec![product_item(None, 2)], None))
            .await
            .unwrap();
        assert_eq!(outcome.redirect_url, "https://pay.example/session/cs_123");

        let request = h.payments.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].stripe_price_id, "price_regular");
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.metadata.get("tenant").unwrap(), "atelier");
        assert!(!request.metadata.contains_key("item_0_campaign_id"));
    }

    #[tokio::test]
    async fn variant_campaign_price_is_charged() {
        // Scenario: variant-scoped campaign at 20% off a 1000-cent price.
        let h = harness(
            Arc::new(VariantCampaign {
                price_id: "price_campaign".into(),
                amount_cents: 800,
            }),
            StockedInventory::default().with_stock("price_regular", 5),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );

        h.service
            .build_checkout(input(vec![product_item(Some("size-m"), 1)], None))
            .await
            .unwrap();

        let request = h.payments.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.items[0].stripe_price_id, "price_campaign");
        assert_eq!(
            request.metadata.get("item_0_campaign_id").unwrap(),
            "camp_summer"
        );
        assert_eq!(
            request.metadata.get("item_0_campaign_name").unwrap(),
            "Summer Sale"
        );
    }

    #[tokio::test]
    async fn missing_inventory_data_refuses_checkout() {
        // Scenario: the variant lookup answers but carries hasData = false.
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_no_data("price_regular"),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );

        let err = h
            .service
            .build_checkout(input(vec![product_item(Some("size-m"), 1)], None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OutOfStock(_)));
        assert_eq!(h.payments.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gift_card_item_with_feature_disabled_is_refused_before_any_call() {
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default(),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            false,
        );

        let err = h
            .service
            .build_checkout(input(vec![gift_card_item()], None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::GiftCardsDisabled));
        assert_eq!(h.payments.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gift_card_code_is_forwarded_unredeemed() {
        // Scenario: valid code with 500-cent balance on a 1000-cent cart.
        // This service only verifies; the upstream applies the discount.
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_stock("prod_1", 10),
            FakeGiftCards {
                balance: Some(500),
                ..Default::default()
            },
            RecordingPayments::default(),
            true,
        );

        h.service
            .build_checkout(input(
                vec![product_item(None, 1)],
                Some("GC-ABCD-1234"),
            ))
            .await
            .unwrap();

        assert_eq!(h.gift_cards.calls.load(Ordering::SeqCst), 1);
        let request = h.payments.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.gift_card_code.as_deref(), Some("GC-ABCD-1234"));
        assert_eq!(
            request.metadata.get("gift_card_code").unwrap(),
            "GC-ABCD-1234"
        );
    }

    #[tokio::test]
    async fn multibyte_gift_card_code_is_forwarded_without_panic() {
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_stock("prod_1", 10),
            FakeGiftCards {
                balance: Some(500),
                ..Default::default()
            },
            RecordingPayments::default(),
            true,
        );

        h.service
            .build_checkout(input(vec![product_item(None, 1)], Some("GÅVO-KORT-€€€")))
            .await
            .unwrap();

        let request = h.payments.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.gift_card_code.as_deref(), Some("GÅVO-KORT-€€€"));
    }

    #[tokio::test]
    async fn empty_price_id_is_a_data_integrity_error() {
        let mut item = product_item(None, 1);
        item.chosen_price_id = String::new();
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_stock("prod_1", 10),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );

        let err = h
            .service
            .build_checkout(input(vec![item], None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingPrice(_)));
        assert_eq!(h.payments.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_rejection_message_passes_through() {
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default().with_stock("prod_1", 10),
            FakeGiftCards::default(),
            RecordingPayments {
                reject_with: Some("Card network unavailable".into()),
                ..Default::default()
            },
            true,
        );

        let err = h
            .service
            .build_checkout(input(vec![product_item(None, 1)], None))
            .await
            .unwrap_err();
        match err {
            CheckoutError::Upstream(message) => {
                assert_eq!(message, "Card network unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gift_card_items_skip_price_resolution() {
        // The "gift-card" pseudo-product has no campaigns and no catalog
        // mapping; its chosen price id is forwarded untouched.
        let campaigns = Arc::new(CountingCampaigns::default());
        let h = harness(
            campaigns.clone(),
            StockedInventory::default(),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );

        h.service
            .build_checkout(input(vec![gift_card_item()], None))
            .await
            .unwrap();

        assert_eq!(campaigns.calls.load(Ordering::SeqCst), 0);
        let request = h.payments.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.items[0].stripe_price_id, "price_gift");
        assert_eq!(request.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn empty_cart_is_invalid() {
        let h = harness(
            Arc::new(NoCampaigns),
            StockedInventory::default(),
            FakeGiftCards::default(),
            RecordingPayments::default(),
            true,
        );
        let err = h
            .service
            .build_checkout(input(vec![], None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidRequest(_)));
    }
}
