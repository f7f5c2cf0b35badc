//! Group metadata lookups wrapped in a retry policy.

use countbot_core::error::Result;
use countbot_core::traits::GroupTransport;
use countbot_core::types::GroupSnapshot;
use std::sync::Arc;

use crate::retry::{run_with_retry, RetryPolicy};

#[derive(Clone)]
pub struct MetadataFetcher {
    transport: Arc<dyn GroupTransport>,
}

impl MetadataFetcher {
    pub fn new(transport: Arc<dyn GroupTransport>) -> Self {
        Self { transport }
    }

    /// Fetch one group's live metadata.
    ///
    /// Use [`RetryPolicy::Unbounded`] for background scans and a bounded
    /// policy (usually rate-limit-only) for interactive commands.
    pub async fn fetch(&self, group_id: &str, policy: RetryPolicy) -> Result<GroupSnapshot> {
        let what = format!("Metadata fetch for {group_id}");
        run_with_retry(policy, &what, || self.transport.group_metadata(group_id)).await
    }
}
