//! Chat transport trait, the only way CountBot talks to the network.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::GroupSnapshot;

/// Group-chat transport (send text, look up group metadata).
///
/// Implementations own the network session; CountBot only ever calls
/// these three operations and wraps them in its own retry policies.
#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Send a plain text message to a chat.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()>;

    /// Fetch live metadata (subject and roster) of one group.
    async fn group_metadata(&self, group_id: &str) -> Result<GroupSnapshot>;

    /// Fetch every group the account participates in.
    async fn participating_groups(&self) -> Result<Vec<GroupSnapshot>>;
}
