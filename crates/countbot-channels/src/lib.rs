//! # CountBot Channels
//! Transport implementations plus the two retry-wrapped operations the
//! core relies on: message delivery and group metadata lookup.

pub mod bridge;
pub mod delivery;
pub mod metadata;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::BridgeTransport;
pub use delivery::DeliveryEngine;
pub use metadata::MetadataFetcher;
pub use retry::{Decision, RetryPolicy, RetryState};
