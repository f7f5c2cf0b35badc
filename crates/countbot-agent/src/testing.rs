//! In-memory transport and store wiring for agent tests.

use async_trait::async_trait;
use countbot_core::config::CountBotConfig;
use countbot_core::error::{CountBotError, Result};
use countbot_core::traits::GroupTransport;
use countbot_core::types::GroupSnapshot;
use countbot_store::SqliteStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::CountBot;

#[derive(Default)]
struct State {
    groups: Vec<GroupSnapshot>,
    broken_metadata: HashSet<String>,
    failing_sends: u32,
    failing_metadata: u32,
    sent: Vec<(String, String)>,
    metadata_calls: u32,
}

/// Fake bridge: groups can be edited between calls.
pub(crate) struct FakeTransport {
    state: Mutex<State>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    pub(crate) fn with_group(self, id: &str, subject: &str, members: usize) -> Self {
        let participants = (0..members).map(|i| format!("{i}@s.whatsapp.net")).collect();
        self.with_members(id, subject, participants)
    }

    pub(crate) fn with_members(self, id: &str, subject: &str, participants: Vec<String>) -> Self {
        self.set_members(id, subject, participants);
        self
    }

    /// Metadata lookups for `id` fail with a non-throttling error.
    pub(crate) fn with_broken_metadata(self, id: &str) -> Self {
        self.state.lock().unwrap().broken_metadata.insert(id.to_string());
        self
    }

    /// The next `n` metadata lookups fail with a non-throttling error.
    pub(crate) fn with_failing_metadata(self, n: u32) -> Self {
        self.state.lock().unwrap().failing_metadata = n;
        self
    }

    pub(crate) fn with_failing_sends(self, n: u32) -> Self {
        self.state.lock().unwrap().failing_sends = n;
        self
    }

    pub(crate) fn set_members(&self, id: &str, subject: &str, participants: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        state.groups.retain(|g| g.id != id);
        state.groups.push(GroupSnapshot {
            id: id.to_string(),
            subject: subject.to_string(),
            participants,
        });
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn metadata_calls(&self) -> u32 {
        self.state.lock().unwrap().metadata_calls
    }
}

#[async_trait]
impl GroupTransport for FakeTransport {
    fn name(&self) -> &str { "fake" }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(CountBotError::transport("connection closed"));
        }
        state.sent.push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn group_metadata(&self, group_id: &str) -> Result<GroupSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.metadata_calls += 1;
        if state.failing_metadata > 0 {
            state.failing_metadata -= 1;
            return Err(CountBotError::transport("connection closed"));
        }
        if state.broken_metadata.contains(group_id) {
            return Err(CountBotError::transport(format!("item-not-found: {group_id}")));
        }
        state
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or_else(|| CountBotError::transport(format!("item-not-found: {group_id}")))
    }

    async fn participating_groups(&self) -> Result<Vec<GroupSnapshot>> {
        Ok(self.state.lock().unwrap().groups.clone())
    }
}

/// Bot over an in-memory store with default config.
pub(crate) fn bot(transport: Arc<FakeTransport>) -> (CountBot, Arc<SqliteStore>) {
    bot_with_config(transport, CountBotConfig::default())
}

pub(crate) fn bot_with_config(
    transport: Arc<FakeTransport>,
    config: CountBotConfig,
) -> (CountBot, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory(&config.group_prefix).unwrap());
    let bot = CountBot::new(config, store.clone(), store.clone(), transport);
    (bot, store)
}
