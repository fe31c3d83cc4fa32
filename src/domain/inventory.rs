//! Inventory snapshots and availability decisions.
//!
//! Snapshots are fetched fresh per checkout attempt; staleness here is a
//! correctness risk, so nothing in this module caches. The governing
//! invariant is fail-closed: missing data is never "in stock".

use serde::{Deserialize, Serialize};

/// Stock below this count (but above zero) is surfaced as "almost sold out".
/// Advisory only — it changes copy, never blocks a purchase.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

/// Point-in-time stock for one scope (a product id or a variant price id).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub scope_key: String,
    pub stock_count: Option<i64>,
    pub out_of_stock: bool,
    pub low_stock: bool,
    pub status: StockStatus,
    pub has_data: bool,
}

impl InventorySnapshot {
    /// Snapshot for a scope the authoritative source knows nothing about,
    /// or that could not be reached. Reports out of stock.
    pub fn unavailable(scope_key: impl Into<String>) -> Self {
        Self {
            scope_key: scope_key.into(),
            stock_count: None,
            out_of_stock: true,
            low_stock: false,
            status: StockStatus::OutOfStock,
            has_data: false,
        }
    }

    pub fn from_stock(
        scope_key: impl Into<String>,
        stock_count: Option<i64>,
        out_of_stock_flag: bool,
        low_stock_flag: bool,
    ) -> Self {
        let out_of_stock = out_of_stock_flag || matches!(stock_count, Some(n) if n <= 0);
        let low_stock = !out_of_stock
            && (low_stock_flag
                || matches!(stock_count, Some(n) if n > 0 && n < LOW_STOCK_THRESHOLD));
        let status = if out_of_stock {
            StockStatus::OutOfStock
        } else if low_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        };
        Self {
            scope_key: scope_key.into(),
            stock_count,
            out_of_stock,
            low_stock,
            status,
            has_data: true,
        }
    }
}

/// The inventory gate's verdict for one line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub reason: Option<String>,
    pub low_stock: bool,
}

impl Availability {
    pub fn pass(low_stock: bool) -> Self {
        Self {
            available: true,
            reason: None,
            low_stock,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            low_stock: false,
        }
    }
}
