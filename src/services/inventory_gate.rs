//! Inventory gating.
//!
//! Fail-closed: a lookup that errors, times out or returns no data blocks
//! the purchase of that item. The goods here are one-of-a-kind handcrafted
//! pieces; a missed sale beats an oversold order. Nothing is retried
//! inline and nothing is cached — stock is read fresh per checkout attempt.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::{ClientError, InventoryLookup, InventoryResponse};
use crate::domain::cart::LineItem;
use crate::domain::inventory::{Availability, InventorySnapshot};

pub struct InventoryGate {
    inventory: Arc<dyn InventoryLookup>,
}

impl InventoryGate {
    pub fn new(inventory: Arc<dyn InventoryLookup>) -> Self {
        Self { inventory }
    }

    /// Checks whether one line item may be purchased right now.
    pub async fn check_availability(&self, item: &LineItem) -> Availability {
        // Inventory does not apply to gift cards.
        if item.is_gift_card() {
            return Availability::pass(false);
        }

        let (scope_key, result) = match item.variant_price_id() {
            Some(price_id) => (price_id, self.inventory.by_price_id(price_id).await),
            None => (
                item.product_id.as_str(),
                self.inventory.by_product_id(&item.product_id).await,
            ),
        };

        let snapshot = match result {
            Ok(response) => snapshot_from_response(scope_key, &response),
            Err(err) => {
                warn!(scope_key, %err, "inventory lookup failed, treating as out of stock");
                InventorySnapshot::unavailable(scope_key)
            }
        };

        debug!(
            scope_key,
            stock = ?snapshot.stock_count,
            out_of_stock = snapshot.out_of_stock,
            has_data = snapshot.has_data,
            "inventory checked"
        );

        if snapshot.out_of_stock {
            return Availability::blocked(format!("{} is out of stock", item.display_id()));
        }
        if let Some(stock) = snapshot.stock_count {
            if i64::from(item.quantity) > stock {
                return Availability::blocked(format!(
                    "Insufficient stock for {}. Available: {}, requested: {}",
                    item.display_id(),
                    stock,
                    item.quantity
                ));
            }
        }
        Availability::pass(snapshot.low_stock)
    }

    /// Snapshot view for the buyer-facing status endpoint. Shares the
    /// gate's fail-closed reading of lookup failures.
    pub async fn snapshot(
        &self,
        product_id: Option<&str>,
        price_id: Option<&str>,
    ) -> InventorySnapshot {
        let (scope_key, result) = match (price_id, product_id) {
            (Some(price_id), _) => (price_id, self.inventory.by_price_id(price_id).await),
            (None, Some(product_id)) => {
                (product_id, self.inventory.by_product_id(product_id).await)
            }
            (None, None) => return InventorySnapshot::unavailable(""),
        };
        match result {
            Ok(response) => snapshot_from_response(scope_key, &response),
            Err(err) => {
                warn!(scope_key, %err, "inventory lookup failed, reporting out of stock");
                InventorySnapshot::unavailable(scope_key)
            }
        }
    }
}

fn snapshot_from_response(scope_key: &str, response: &InventoryResponse) -> InventorySnapshot {
    use crate::domain::inventory::StockStatus;

    if !response.has_data {
        // Absence of data is never "in stock".
        return InventorySnapshot::unavailable(scope_key);
    }
    let out_of_stock_flag =
        response.out_of_stock || response.status == Some(StockStatus::OutOfStock);
    let low_stock_flag = response.low_stock || response.status == Some(StockStatus::LowStock);
    InventorySnapshot::from_stock(scope_key, response.stock, out_of_stock_flag, low_stock_flag)
}
