//! Dexcom Share adapter: the monitor's external reading source.
//!
//! - [`Region`]: Share server and application id per market.
//! - [`api::DexcomApi`]: thin HTTP wrapper over the Share endpoints.
//! - [`messages`]: wire types and their conversion to domain readings.
//! - [`DexcomClient`]: session caching plus the `ReadingSource` and
//!   `CredentialVerifier` implementations.

pub mod api;
pub mod client;
pub mod messages;
pub mod region;

pub use client::DexcomClient;
pub use region::Region;
