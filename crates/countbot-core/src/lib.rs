//! # CountBot Core
//! Error type, configuration, domain types and collaborator traits shared
//! by every CountBot crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CountBotConfig;
pub use error::{CountBotError, Result};
