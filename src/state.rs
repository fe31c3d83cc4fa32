//! Shared application state.
//!
//! Cheaply cloneable; everything behind `Arc`. No mutable state is held
//! between requests — the pipeline re-reads its collaborators per attempt.

use std::sync::Arc;

use crate::clients::{
    CampaignLookup, ClientError, GiftCardVerifier, PaymentSessionClient, PaymentSessions,
    SourcePortalClient,
};
use crate::config::Config;
use crate::services::{CheckoutService, InventoryGate, PriceResolver};
use crate::webhooks::{LogRevalidator, Revalidator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<PriceResolver>,
    pub gate: Arc<InventoryGate>,
    pub checkout: Arc<CheckoutService>,
    pub campaigns: Arc<dyn CampaignLookup>,
    pub gift_cards: Arc<dyn GiftCardVerifier>,
    pub revalidator: Arc<dyn Revalidator>,
}

impl AppState {
    /// Wires the real collaborator clients. Tests assemble the same shape
    /// with fakes or wiremock-backed configs instead.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let source = Arc::new(SourcePortalClient::new(&config)?);
        let payments: Arc<dyn PaymentSessions> = Arc::new(PaymentSessionClient::new(&config)?);

        let resolver = Arc::new(PriceResolver::new(source.clone(), source.clone()));
        let gate = Arc::new(InventoryGate::new(source.clone()));
        let checkout = Arc::new(CheckoutService::new(
            resolver.clone(),
            gate.clone(),
            source.clone(),
            payments,
            config.tenant_id.clone(),
            config.gift_cards_enabled,
        ));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            gate,
            checkout,
            campaigns: source.clone(),
            gift_cards: source,
            revalidator: Arc::new(LogRevalidator),
        })
    }
}
