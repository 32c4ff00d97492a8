//! Domain types and pure logic for glucose monitoring.
//!
//! - [`glucose`]: readings, trends, measurement timestamps.
//! - [`thresholds`]: per-patient alert bounds and defaults.
//! - [`evaluation`]: threshold evaluator, freshness gate, repeat cooldown.
//! - [`alert`]: alert decisions and their message text.
//! - [`fallback`]: synthetic readings for when the provider has none.
//! - [`store`]: collaborator traits implemented by storage and provider crates.

pub mod alert;
pub mod error;
pub mod evaluation;
pub mod fallback;
pub mod glucose;
pub mod patient;
pub mod store;
pub mod thresholds;
pub mod types;
