//! Collaborator traits implemented by the store and channel crates.

pub mod store;
pub mod transport;

pub use store::{CounterStore, GroupRegistry};
pub use transport::GroupTransport;
