//! Price resolution value objects.

use serde::{Deserialize, Serialize};

/// The ordered resolution strategies, most specific first. The resolver walks
/// this list and stops at the first rule that yields a usable price, so the
/// precedence is a visible contract rather than implicit control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceRule {
    VariantCampaign,
    ProductCampaign,
    RegularPrice,
}

pub const RESOLUTION_ORDER: [PriceRule; 3] = [
    PriceRule::VariantCampaign,
    PriceRule::ProductCampaign,
    PriceRule::RegularPrice,
];

/// The regular (non-campaign) price as supplied by the client cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegularPrice {
    pub price_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// The authoritative charge price for one line item. Request-scoped,
/// never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub price_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub is_campaign: bool,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
}

impl ResolvedPrice {
    /// The regular price forwarded unchanged.
    pub fn regular(price: &RegularPrice) -> Self {
        Self {
            price_id: price.price_id.clone(),
            amount_cents: price.amount_cents,
            currency: price.currency.clone(),
            is_campaign: false,
            campaign_id: None,
            campaign_name: None,
        }
    }

    /// Buyer-facing discount against the given original price, whole percent.
    pub fn discount_percent(&self, original_cents: i64) -> Option<u8> {
        if !self.is_campaign {
            return None;
        }
        discount_percent(original_cents, self.amount_cents)
    }
}

/// `round((original - campaign) / original * 100)` as a whole percent.
/// Returns `None` when the inputs cannot describe a discount.
pub fn discount_percent(original_cents: i64, campaign_cents: i64) -> Option<u8> {
    if original_cents <= 0 || campaign_cents < 0 || campaign_cents >= original_cents {
        return None;
    }
    let pct = ((original_cents - campaign_cents) as f64 / original_cents as f64 * 100.0).round();
    Some(pct as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_off() {
        assert_eq!(discount_percent(1000, 800), Some(20));
    }

    #[test]
    fn rounds_to_whole_percent() {
        // 333 / 1000 = 33.3% -> 33, 335 / 1000 = 33.5% -> 34
        assert_eq!(discount_percent(1000, 667), Some(33));
        assert_eq!(discount_percent(1000, 665), Some(34));
    }

    #[test]
    fn no_discount_when_not_cheaper() {
        assert_eq!(discount_percent(1000, 1000), None);
        assert_eq!(discount_percent(1000, 1200), None);
        assert_eq!(discount_percent(0, 0), None);
    }

    #[test]
    fn regular_price_carries_through_verbatim() {
        let regular = RegularPrice {
            price_id: "price_abc".into(),
            amount_cents: 149_00,
            currency: "SEK".into(),
        };
        let resolved = ResolvedPrice::regular(&regular);
        assert_eq!(resolved.price_id, "price_abc");
        assert_eq!(resolved.amount_cents, 149_00);
        assert!(!resolved.is_campaign);
        assert_eq!(resolved.discount_percent(149_00), None);
    }
}
