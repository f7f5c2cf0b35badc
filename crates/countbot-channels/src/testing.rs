//! Scripted in-memory transport for unit tests.

use async_trait::async_trait;
use countbot_core::error::{CountBotError, Result};
use countbot_core::traits::GroupTransport;
use countbot_core::types::GroupSnapshot;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

type ErrorFactory = Box<dyn Fn() -> CountBotError + Send + Sync>;

#[derive(Default)]
struct Script {
    send_failures_left: u32,
    metadata_failures_left: u32,
    send_times: Vec<Instant>,
    metadata_attempts: u32,
    sent: Vec<(String, String)>,
}

/// Fails the first N sends / lookups with a chosen error, then succeeds.
pub(crate) struct ScriptedTransport {
    groups: HashMap<String, GroupSnapshot>,
    send_error: Option<ErrorFactory>,
    metadata_error: Option<ErrorFactory>,
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            groups: HashMap::new(),
            send_error: None,
            metadata_error: None,
            script: Mutex::new(Script::default()),
        }
    }

    pub(crate) fn with_group(mut self, id: &str, subject: &str, members: usize) -> Self {
        self.groups.insert(id.into(), GroupSnapshot {
            id: id.into(),
            subject: subject.into(),
            participants: (0..members).map(|i| format!("{i}@s.whatsapp.net")).collect(),
        });
        self
    }

    pub(crate) fn failing_sends(mut self, n: u32, error: impl Fn() -> CountBotError + Send + Sync + 'static) -> Self {
        self.script.get_mut().unwrap().send_failures_left = n;
        self.send_error = Some(Box::new(error));
        self
    }

    pub(crate) fn failing_metadata(mut self, n: u32, error: impl Fn() -> CountBotError + Send + Sync + 'static) -> Self {
        self.script.get_mut().unwrap().metadata_failures_left = n;
        self.metadata_error = Some(Box::new(error));
        self
    }

    pub(crate) fn send_attempts(&self) -> usize {
        self.script.lock().unwrap().send_times.len()
    }

    pub(crate) fn send_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().send_times.clone()
    }

    pub(crate) fn metadata_attempts(&self) -> u32 {
        self.script.lock().unwrap().metadata_attempts
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl GroupTransport for ScriptedTransport {
    fn name(&self) -> &str { "scripted" }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.send_times.push(Instant::now());
        if script.send_failures_left > 0 {
            script.send_failures_left -= 1;
            if let Some(make) = &self.send_error {
                return Err(make());
            }
        }
        script.sent.push((chat_id.into(), text.into()));
        Ok(())
    }

    async fn group_metadata(&self, group_id: &str) -> Result<GroupSnapshot> {
        let mut script = self.script.lock().unwrap();
        script.metadata_attempts += 1;
        if script.metadata_failures_left > 0 {
            script.metadata_failures_left -= 1;
            if let Some(make) = &self.metadata_error {
                return Err(make());
            }
        }
        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| CountBotError::transport(format!("item-not-found: {group_id}")))
    }

    async fn participating_groups(&self) -> Result<Vec<GroupSnapshot>> {
        Ok(self.groups.values().cloned().collect())
    }
}
