//! Persistence traits for the group registry and the daily counter store.

use crate::error::Result;
use crate::types::{CounterKind, DailyCounter, Day, Group, GroupSnapshot, SelectedGroup};

/// Known groups, selected groups and their last member snapshot.
pub trait GroupRegistry: Send + Sync {
    /// Upsert every group whose name matches the registry prefix.
    /// Returns how many groups were stored.
    fn sync_groups(&self, live: &[GroupSnapshot]) -> Result<usize>;

    /// Mark a group as a report destination. Idempotent.
    fn mark_selected(&self, group_id: &str, name: &str) -> Result<()>;

    fn list_groups(&self) -> Result<Vec<Group>>;

    fn list_selected(&self) -> Result<Vec<SelectedGroup>>;

    fn get_group(&self, group_id: &str) -> Result<Option<Group>>;

    fn is_selected(&self, group_id: &str) -> Result<bool>;

    /// Participant ids of the most recent snapshot (see `snapshot_day`).
    fn member_snapshot(&self, group_id: &str) -> Result<Vec<String>>;

    /// Day the stored snapshot was taken; `None` when there is none.
    fn snapshot_day(&self, group_id: &str) -> Result<Option<Day>>;

    fn replace_member_snapshot(&self, group_id: &str, members: &[String], taken_on: Day) -> Result<()>;
}

/// Per-(group, day) entry/exit counters.
pub trait CounterStore: Send + Sync {
    /// Atomically bump one field of the `(group_id, day)` row, creating it
    /// if needed. Returns the row after the increment.
    fn increment_counter(&self, group_id: &str, day: Day, kind: CounterKind) -> Result<DailyCounter>;

    /// All rows of a day, most recently updated first.
    fn get_counters(&self, day: Day) -> Result<Vec<DailyCounter>>;

    fn get_counter(&self, group_id: &str, day: Day) -> Result<Option<DailyCounter>>;

    /// Seed a zeroed row for every registry group missing one for `day`.
    /// Returns the number of rows inserted.
    fn initialize_day(&self, day: Day) -> Result<usize>;

    /// Raise entries/exits to at least the given values; never lowers them.
    fn fill_gaps(&self, group_id: &str, day: Day, min_entries: u32, min_exits: u32) -> Result<DailyCounter>;
}
