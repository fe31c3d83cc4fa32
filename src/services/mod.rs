//! The checkout pipeline: price resolution, inventory gating and
//! checkout assembly.

pub mod checkout;
pub mod inventory_gate;
pub mod price_resolver;

pub use checkout::{CheckoutInput, CheckoutOutcome, CheckoutService};
pub use inventory_gate::InventoryGate;
pub use price_resolver::PriceResolver;
