//! Cart and line items.
//!
//! The cart is list bookkeeping only: it merges, updates and removes line
//! items and keeps a running total. Price and availability decisions are
//! made by the resolution pipeline, never here.

use serde::{Deserialize, Serialize};

/// What a line item represents. Gift cards skip the inventory gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Product,
    GiftCard,
}

/// One cart entry: the product/variant the buyer picked, the price id the
/// storefront showed them, and the quantity. All amounts are integer minor
/// units (cents) — there is no magnitude guessing anywhere in this service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    /// Variant selector (e.g. a size SKU). `None` for variantless products.
    pub variant_key: Option<String>,
    /// The regular price id the client chose; for variants this is the
    /// variant's own price id.
    pub chosen_price_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub item_type: ItemType,
    /// Face value for gift-card items, in cents.
    pub gift_card_amount_cents: Option<i64>,
    /// Regular unit price as displayed to the buyer, in cents.
    pub unit_amount_cents: i64,
    pub currency: String,
}

impl LineItem {
    pub fn is_gift_card(&self) -> bool {
        self.item_type == ItemType::GiftCard
    }

    /// The variant-scoped price id, when the buyer picked a specific variant.
    ///
    /// The storefront sends `variantKey: "none"` for variantless products, so
    /// that sentinel (and the empty string) normalizes to `None`.
    pub fn variant_price_id(&self) -> Option<&str> {
        match self.variant_key.as_deref() {
            Some("") | Some("none") | None => None,
            Some(_) => Some(self.chosen_price_id.as_str()),
        }
    }

    /// Identifier used for buyer-facing messages and upstream line items:
    /// the variant selector when present, otherwise the product id.
    pub fn display_id(&self) -> &str {
        match self.variant_key.as_deref() {
            Some("") | Some("none") | None => &self.product_id,
            Some(key) => key,
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        self.unit_amount_cents * i64::from(self.quantity)
    }
}

/// Client-side cart. Holds no business logic beyond list bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add_item(item);
        }
        cart
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds an item, merging quantities when product and variant match.
    pub fn add_item(&mut self, item: LineItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id && i.variant_key == item.variant_key)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
    }

    /// Updates quantity for one `(product, variant)` entry — the same key
    /// `add_item` merges on. Zero removes the entry.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        variant_key: Option<&str>,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(product_id, variant_key);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.variant_key.as_deref() == variant_key)
            .ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(
        &mut self,
        product_id: &str,
        variant_key: Option<&str>,
    ) -> Result<(), CartError> {
        let before = self.items.len();
        self.items
            .retain(|i| !(i.product_id == product_id && i.variant_key.as_deref() == variant_key));
        if self.items.len() == before {
            return Err(CartError::ItemNotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(LineItem::line_total_cents).sum()
    }

    pub fn has_gift_card_items(&self) -> bool {
        self.items.iter().any(LineItem::is_gift_card)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    ItemNotFound,
}

impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Item not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, variant: Option<&str>, qty: u32) -> LineItem {
        LineItem {
            product_id: product_id.into(),
            variant_key: variant.map(Into::into),
            chosen_price_id: "price_regular".into(),
            quantity: qty,
            item_type: ItemType::Product,
            gift_card_amount_cents: None,
            unit_amount_cents: 1000,
            currency: "SEK".into(),
        }
    }

    #[test]
    fn add_merges_same_product_and_variant() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", Some("size-m"), 2));
        cart.add_item(item("P1", Some("size-m"), 1));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total_cents(), 3000);
    }

    #[test]
    fn different_variants_stay_separate() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", Some("size-m"), 1));
        cart.add_item(item("P1", Some("size-l"), 1));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn update_to_zero_removes() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", None, 2));
        cart.update_quantity("P1", None, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item("P1", None), Err(CartError::ItemNotFound));
    }

    #[test]
    fn update_and_remove_address_one_variant_only() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", Some("size-m"), 1));
        cart.add_item(item("P1", Some("size-l"), 2));

        cart.update_quantity("P1", Some("size-l"), 5).unwrap();
        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.items()[1].quantity, 5);

        cart.remove_item("P1", Some("size-m")).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].variant_key.as_deref(), Some("size-l"));
        assert_eq!(
            cart.remove_item("P1", Some("size-m")),
            Err(CartError::ItemNotFound)
        );
    }

    #[test]
    fn none_sentinel_is_not_a_variant() {
        let plain = item("P1", Some("none"), 1);
        assert_eq!(plain.variant_price_id(), None);
        assert_eq!(plain.display_id(), "P1");

        let sized = item("P1", Some("size-m"), 1);
        assert_eq!(sized.variant_price_id(), Some("price_regular"));
        assert_eq!(sized.display_id(), "size-m");
    }
}
