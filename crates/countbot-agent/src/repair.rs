//! Snapshot repair pass.
//!
//! Compares each registry group's live roster with the member snapshot
//! stored earlier the same day, and raises that day's counters to at least
//! the observed number of joins and leaves. Live-event counts are never
//! lowered, so running it twice, or after every event was already counted,
//! changes nothing.
//!
//! A snapshot from an earlier day is only replaced: its diff spans more
//! than one day and part of it may already be counted elsewhere.

use countbot_core::error::Result;
use countbot_core::types::Day;
use std::collections::HashSet;
use std::fmt;

use crate::CountBot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Groups compared against their snapshot.
    pub checked: usize,
    /// Groups whose lookup failed, or whose snapshot is newer than the day.
    pub skipped: usize,
    /// Groups without a snapshot of the day; only their snapshot was stored.
    pub baselined: usize,
    /// Groups whose counters were raised.
    pub repaired: usize,
}

impl fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} repaired, {} baselined, {} skipped",
            self.checked, self.repaired, self.baselined, self.skipped
        )
    }
}

impl CountBot {
    pub async fn repair_day(&self, day: Day) -> Result<RepairSummary> {
        let mut summary = RepairSummary::default();

        for group in self.registry.list_groups()? {
            let taken_on = self.registry.snapshot_day(&group.id)?;
            if taken_on.is_some_and(|t| t > day) {
                tracing::warn!("Repair skipped {}: snapshot is newer than {day}", group.name);
                summary.skipped += 1;
                continue;
            }

            let live = match self.metadata.fetch(&group.id, self.lookup_policy()).await {
                Ok(meta) => meta.participants,
                Err(e) => {
                    tracing::warn!("Repair skipped {}: {e}", group.name);
                    summary.skipped += 1;
                    continue;
                }
            };

            if taken_on != Some(day) {
                self.registry.replace_member_snapshot(&group.id, &live, day)?;
                summary.baselined += 1;
                continue;
            }
            let stored = self.registry.member_snapshot(&group.id)?;

            let live_set: HashSet<&String> = live.iter().collect();
            let stored_set: HashSet<&String> = stored.iter().collect();
            let joined = saturating_u32(live_set.difference(&stored_set).count());
            let left = saturating_u32(stored_set.difference(&live_set).count());

            summary.checked += 1;
            if joined > 0 || left > 0 {
                let before = self.counters.get_counter(&group.id, day)?;
                let after = self.counters.fill_gaps(&group.id, day, joined, left)?;
                let changed = before.is_none_or(|b| b.entries != after.entries || b.exits != after.exits);
                if changed {
                    tracing::info!(
                        "🩹 {}: raised to entries={} exits={} (roster diff +{joined} -{left})",
                        group.name, after.entries, after.exits
                    );
                    summary.repaired += 1;
                }
            }
            self.registry.replace_member_snapshot(&group.id, &live, day)?;
        }

        Ok(summary)
    }

    /// Store a snapshot dated `day` for every registry group so the day's
    /// repair pass has a same-day roster to diff against. Returns how many
    /// groups were captured.
    pub async fn baseline_day(&self, day: Day) -> Result<usize> {
        let mut captured = 0;
        for group in self.registry.list_groups()? {
            match self.metadata.fetch(&group.id, self.lookup_policy()).await {
                Ok(meta) => {
                    self.registry.replace_member_snapshot(&group.id, &meta.participants, day)?;
                    captured += 1;
                }
                Err(e) => tracing::warn!("Baseline skipped {}: {e}", group.name),
            }
        }
        Ok(captured)
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
