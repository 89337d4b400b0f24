//! Installment plan and deal lifecycle engine.
//!
//! The engine owns every write to a product's installment plan rows: the
//! generator derives plan shapes from price and category, the store swaps
//! plan sets atomically, the lifecycle module drives deal transitions, the
//! guard enforces one-active-deal-per-product, and the sweeper retires
//! deals whose window has closed.

pub mod error;
pub mod generator;
pub mod guard;
pub mod lifecycle;
pub mod store;
pub mod sweeper;

pub use error::{EngineError, Result};
pub use lifecycle::{BindingDraft, BindingRecord, DealDraft, DealRecord};
pub use store::PlanSource;

#[cfg(test)]
mod tests;
