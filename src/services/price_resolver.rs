//! Price resolution.
//!
//! Precedence, first match wins: variant-scoped campaign, then
//! product-scoped campaign, then the client-supplied regular price. Any
//! collaborator failure reads as "no campaign" — overcharging is worse
//! than missing a discount, so pricing fails open. The inventory gate
//! deliberately takes the opposite bias.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::{CampaignLookup, CampaignPriceResponse, PriceCatalog};
use crate::domain::pricing::{PriceRule, RegularPrice, ResolvedPrice, RESOLUTION_ORDER};

/// External product ids carry this prefix; anything else is an internal
/// catalog id that goes through the mapping lookup first.
pub const EXTERNAL_PRODUCT_PREFIX: &str = "prod_";

pub struct PriceResolver {
    campaigns: Arc<dyn CampaignLookup>,
    catalog: Arc<dyn PriceCatalog>,
}

impl PriceResolver {
    pub fn new(campaigns: Arc<dyn CampaignLookup>, catalog: Arc<dyn PriceCatalog>) -> Self {
        Self { campaigns, catalog }
    }

    /// Resolves the authoritative charge price for one line item.
    ///
    /// Idempotent for unchanged campaign state, and infallible: the worst
    /// outcome is the regular price returned verbatim.
    pub async fn resolve(
        &self,
        product_id: &str,
        regular: &RegularPrice,
        variant_price_id: Option<&str>,
    ) -> ResolvedPrice {
        let product_id = self.normalize_product_id(product_id).await;

        for rule in RESOLUTION_ORDER {
            let candidate = match rule {
                PriceRule::VariantCampaign => match variant_price_id {
                    Some(price_id) => self.campaign(&product_id, Some(price_id), regular).await,
                    None => None,
                },
                PriceRule::ProductCampaign => self.campaign(&product_id, None, regular).await,
                PriceRule::RegularPrice => Some(ResolvedPrice::regular(regular)),
            };
            if let Some(resolved) = candidate {
                debug!(
                    product_id = %product_id,
                    price_id = %resolved.price_id,
                    is_campaign = resolved.is_campaign,
                    rule = ?rule,
                    "price resolved"
                );
                return resolved;
            }
        }

        // RESOLUTION_ORDER ends with RegularPrice, which always yields.
        ResolvedPrice::regular(regular)
    }

    /// Ids already carrying the external prefix are used as-is; otherwise
    /// the catalog mapping is consulted. A failed or empty mapping falls
    /// back to the id as given rather than failing the resolution.
    async fn normalize_product_id(&self, product_id: &str) -> String {
        if product_id.starts_with(EXTERNAL_PRODUCT_PREFIX) {
            return product_id.to_string();
        }
        match self.catalog.resolve_external_id(product_id).await {
            Ok(Some(external_id)) => external_id,
            Ok(None) => product_id.to_string(),
            Err(err) => {
                warn!(product_id, %err, "catalog mapping lookup failed, using id as given");
                product_id.to_string()
            }
        }
    }

    async fn campaign(
        &self,
        product_id: &str,
        original_price_id: Option<&str>,
        regular: &RegularPrice,
    ) -> Option<ResolvedPrice> {
        let response = match self
            .campaigns
            .campaign_price(product_id, original_price_id)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(product_id, %err, "campaign lookup failed, falling back to regular price");
                return None;
            }
        };
        self.campaign_to_price(product_id, response, regular).await
    }

    async fn campaign_to_price(
        &self,
        product_id: &str,
        response: CampaignPriceResponse,
        regular: &RegularPrice,
    ) -> Option<ResolvedPrice> {
        if !response.has_campaign_price {
            return None;
        }
        let price_id = response.price_id.filter(|id| !id.is_empty())?;

        // The campaign amount comes from campaign metadata when present,
        // otherwise from the price listing. A campaign whose amount cannot
        // be verified is skipped: an unverifiable price is never charged.
        let metadata = response.metadata.unwrap_or_default();
        let (amount_cents, currency) = match metadata.amount_cents {
            Some(amount) => (amount, metadata.currency),
            None => match self.catalog.price_amount(product_id, &price_id).await {
                Ok(listing) => match listing.amount_cents.filter(|_| listing.found) {
                    Some(amount) => (amount, listing.currency),
                    None => {
                        warn!(product_id, price_id, "campaign price has no listed amount, skipping");
                        return None;
                    }
                },
                Err(err) => {
                    warn!(product_id, price_id, %err, "price listing lookup failed, skipping campaign");
                    return None;
                }
            },
        };

        Some(ResolvedPrice {
            price_id,
            amount_cents,
            currency: currency.unwrap_or_else(|| regular.currency.clone()),
            is_campaign: true,
            campaign_id: response.campaign_id,
            campaign_name: response.campaign_name,
        })
    }
}
