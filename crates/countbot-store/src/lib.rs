//! # CountBot Store
//! SQLite persistence for the group registry and the daily counters.

pub mod counters;
pub mod registry;
pub mod sqlite;

use countbot_core::config::CountBotConfig;
use countbot_core::error::Result;

pub use sqlite::SqliteStore;

/// Open the store configured in `config`.
pub fn open_store(config: &CountBotConfig) -> Result<SqliteStore> {
    SqliteStore::open(&config.database_path(), &config.group_prefix)
}
