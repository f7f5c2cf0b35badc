//! Registry sync from the bridge's list of participating groups.

use countbot_core::error::Result;
use countbot_core::types::Group;
use std::time::Duration;

use crate::CountBot;

impl CountBot {
    /// Fetch every participating group and store the ones matching the
    /// prefix, `sync.batch_size` at a time with `sync.batch_delay_secs`
    /// between batches. Returns the registry afterwards.
    pub async fn update_group_list(&self) -> Result<Vec<Group>> {
        tracing::info!("🔄 Updating group list");
        let live = self
            .transport()
            .participating_groups()
            .await
            .inspect_err(|e| tracing::error!("Failed to list groups: {e}"))?;
        tracing::info!("Groups found: {}", live.len());

        let batch_size = self.config.sync.batch_size.max(1);
        let delay = Duration::from_secs(self.config.sync.batch_delay_secs);
        let batches = live.len().div_ceil(batch_size);
        let mut stored = 0;

        for (i, batch) in live.chunks(batch_size).enumerate() {
            tracing::debug!("Processing batch {} of {batches}", i + 1);
            stored += self.registry.sync_groups(batch)?;
            if i + 1 < batches {
                tokio::time::sleep(delay).await;
            }
        }

        let groups = self.registry.list_groups()?;
        tracing::info!("✅ Group list updated: {stored} matched, {} monitored", groups.len());
        Ok(groups)
    }
}
