//! Storefront checkout service
//!
//! Owns the checkout-time price & inventory resolution pipeline for a
//! storefront, in front of two opaque collaborators: the Source Portal
//! (campaigns, inventory, catalog mapping, gift cards) and a
//! payment-session service.
//!
//! ## Pipeline
//! - Price Resolver: variant campaign > product campaign > regular price,
//!   fail-open on collaborator failure
//! - Inventory Gate: fresh per-attempt stock reads, fail-closed on missing
//!   data
//! - Checkout Assembler: all-or-nothing gating, campaign metadata, one
//!   session request upstream

pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;
pub mod webhooks;

pub use config::Config;
pub use error::CheckoutError;
pub use handlers::create_router;
pub use state::AppState;
