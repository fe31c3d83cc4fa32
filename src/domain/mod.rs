//! Domain types for the checkout pipeline.
//!
//! Everything here is a request-scoped value object; nothing is persisted
//! by this service. Durable campaign and inventory state lives in the
//! external Source Portal.

pub mod cart;
pub mod inventory;
pub mod pricing;
