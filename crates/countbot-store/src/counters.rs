//! Daily counter store.
//!
//! Every write is one SQLite upsert, so concurrent increments on the same
//! `(group, day)` key serialize inside the database and never lose updates.

use countbot_core::error::Result;
use countbot_core::traits::CounterStore;
use countbot_core::types::{CounterKind, DailyCounter, Day};
use rusqlite::{params, OptionalExtension, Row};

use crate::sqlite::{db_err, now_stamp, SqliteStore};

const COLUMNS: &str = "group_id, date, entries, exits, created_at, updated_at";

fn read_counter(row: &Row<'_>) -> rusqlite::Result<DailyCounter> {
    Ok(DailyCounter {
        group_id: row.get(0)?,
        date: row.get(1)?,
        entries: row.get(2)?,
        exits: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl CounterStore for SqliteStore {
    fn increment_counter(&self, group_id: &str, day: Day, kind: CounterKind) -> Result<DailyCounter> {
        let (entries, exits) = match kind {
            CounterKind::Entries => (1u32, 0u32),
            CounterKind::Exits => (0, 1),
        };
        let conn = self.lock()?;
        let counter = conn.query_row(
            &format!(
                "INSERT INTO daily_counters ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(group_id, date) DO UPDATE SET
                    entries = entries + excluded.entries,
                    exits = exits + excluded.exits,
                    updated_at = excluded.updated_at
                 RETURNING {COLUMNS}"
            ),
            params![group_id, day.key(), entries, exits, now_stamp()],
            read_counter,
        ).map_err(db_err)?;
        tracing::debug!(
            "Counter {group_id} {day}: +1 {kind} → entries={} exits={}",
            counter.entries, counter.exits
        );
        Ok(counter)
    }

    fn get_counters(&self, day: Day) -> Result<Vec<DailyCounter>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM daily_counters WHERE date = ?1
                 ORDER BY updated_at DESC, group_id ASC"
            ))
            .map_err(db_err)?;
        let rows = stmt.query_map(params![day.key()], read_counter).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn get_counter(&self, group_id: &str, day: Day) -> Result<Option<DailyCounter>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM daily_counters WHERE group_id = ?1 AND date = ?2"),
            params![group_id, day.key()],
            read_counter,
        )
        .optional()
        .map_err(db_err)
    }

    fn initialize_day(&self, day: Day) -> Result<usize> {
        let conn = self.lock()?;
        let seeded = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO daily_counters ({COLUMNS})
                 SELECT id, ?1, 0, 0, ?2, ?2 FROM groups"
            ),
            params![day.key(), now_stamp()],
        ).map_err(db_err)?;
        tracing::info!("🌅 Day {day} initialized: {seeded} counters seeded");
        Ok(seeded)
    }

    fn fill_gaps(&self, group_id: &str, day: Day, min_entries: u32, min_exits: u32) -> Result<DailyCounter> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "INSERT INTO daily_counters ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(group_id, date) DO UPDATE SET
                    entries = MAX(entries, excluded.entries),
                    exits = MAX(exits, excluded.exits),
                    updated_at = CASE
                        WHEN excluded.entries > entries OR excluded.exits > exits
                        THEN excluded.updated_at ELSE updated_at END
                 RETURNING {COLUMNS}"
            ),
            params![group_id, day.key(), min_entries, min_exits, now_stamp()],
            read_counter,
        )
        .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countbot_core::traits::GroupRegistry;
    use countbot_core::types::GroupSnapshot;
    use std::sync::Arc;

    fn day(s: &str) -> Day {
        Day::parse(s).unwrap()
    }

    fn store_with_groups(ids: &[&str]) -> SqliteStore {
        let store = SqliteStore::open_in_memory("offertando -").unwrap();
        let live: Vec<_> = ids
            .iter()
            .map(|id| GroupSnapshot {
                id: id.to_string(),
                subject: format!("Offertando - {id}"),
                participants: vec![],
            })
            .collect();
        store.sync_groups(&live).unwrap();
        store
    }

    #[test]
    fn test_single_join_counts_one_entry() {
        let store = store_with_groups(&["a@g.us"]);
        let d = day("10/05/2024");
        let counter = store.increment_counter("a@g.us", d, CounterKind::Entries).unwrap();
        assert_eq!((counter.entries, counter.exits), (1, 0));

        let rows = store.get_counters(d).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group_id, "a@g.us");
        assert_eq!((rows[0].entries, rows[0].exits), (1, 0));
    }

    #[test]
    fn test_increment_touches_only_named_field() {
        let store = store_with_groups(&[]);
        let d = day("10/05/2024");
        store.increment_counter("g", d, CounterKind::Exits).unwrap();
        let mut last = store.increment_counter("g", d, CounterKind::Entries).unwrap();
        assert_eq!((last.entries, last.exits), (1, 1));

        for _ in 0..5 {
            let next = store.increment_counter("g", d, CounterKind::Entries).unwrap();
            assert!(next.entries > last.entries);
            assert_eq!(next.exits, 1);
            last = next;
        }
        assert_eq!(last.entries, 6);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(store_with_groups(&["a@g.us"]));
        let d = day("10/05/2024");
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.increment_counter("a@g.us", d, CounterKind::Entries).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let counter = store.get_counter("a@g.us", d).unwrap().unwrap();
        assert_eq!(counter.entries, 400);
        assert_eq!(counter.exits, 0);
    }

    #[test]
    fn test_concurrent_increments_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countbot.db");
        let d = day("10/05/2024");
        drop(SqliteStore::open(&path, "offertando -").unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = SqliteStore::open(&path, "offertando -").unwrap();
                    for _ in 0..20 {
                        store.increment_counter("a@g.us", d, CounterKind::Exits).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let store = SqliteStore::open(&path, "offertando -").unwrap();
        assert_eq!(store.get_counter("a@g.us", d).unwrap().unwrap().exits, 80);
    }

    #[test]
    fn test_initialize_day_is_idempotent() {
        let store = store_with_groups(&["a@g.us", "b@g.us"]);
        let d = day("11/05/2024");
        assert_eq!(store.initialize_day(d).unwrap(), 2);
        let first = store.get_counters(d).unwrap();
        assert_eq!(store.initialize_day(d).unwrap(), 0);
        let second = store.get_counters(d).unwrap();
        assert_eq!(first, second);
        assert!(second.iter().all(|c| c.entries == 0 && c.exits == 0));
    }

    #[test]
    fn test_initialize_day_keeps_existing_rows_and_other_days() {
        let store = store_with_groups(&["a@g.us", "b@g.us"]);
        let yesterday = day("10/05/2024");
        let today = day("11/05/2024");
        store.increment_counter("a@g.us", yesterday, CounterKind::Entries).unwrap();
        store.increment_counter("a@g.us", today, CounterKind::Exits).unwrap();
        let before = store.get_counters(yesterday).unwrap();

        assert_eq!(store.initialize_day(today).unwrap(), 1);

        assert_eq!(store.get_counters(yesterday).unwrap(), before);
        let a = store.get_counter("a@g.us", today).unwrap().unwrap();
        assert_eq!((a.entries, a.exits), (0, 1));
        let b = store.get_counter("b@g.us", today).unwrap().unwrap();
        assert_eq!((b.entries, b.exits), (0, 0));
    }

    #[test]
    fn test_get_counters_order_is_deterministic() {
        let store = store_with_groups(&["a@g.us", "b@g.us", "c@g.us"]);
        let d = day("12/05/2024");
        store.initialize_day(d).unwrap();
        let seeded: Vec<_> = store.get_counters(d).unwrap().into_iter().map(|c| c.group_id).collect();
        assert_eq!(seeded, vec!["a@g.us", "b@g.us", "c@g.us"]);

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.increment_counter("c@g.us", d, CounterKind::Entries).unwrap();
        let ordered: Vec<_> = store.get_counters(d).unwrap().into_iter().map(|c| c.group_id).collect();
        assert_eq!(ordered[0], "c@g.us");
    }

    #[test]
    fn test_counters_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countbot.db");
        let d = day("10/05/2024");
        {
            let store = SqliteStore::open(&path, "offertando -").unwrap();
            store.increment_counter("a@g.us", d, CounterKind::Entries).unwrap();
        }
        let store = SqliteStore::open(&path, "offertando -").unwrap();
        assert_eq!(store.get_counter("a@g.us", d).unwrap().unwrap().entries, 1);
    }

    #[test]
    fn test_fill_gaps_never_lowers_counts() {
        let store = store_with_groups(&["a@g.us"]);
        let d = day("10/05/2024");
        for _ in 0..3 {
            store.increment_counter("a@g.us", d, CounterKind::Entries).unwrap();
        }
        let repaired = store.fill_gaps("a@g.us", d, 1, 2).unwrap();
        assert_eq!((repaired.entries, repaired.exits), (3, 2));

        let again = store.fill_gaps("a@g.us", d, 1, 2).unwrap();
        assert_eq!(again, repaired);

        let fresh = store.fill_gaps("new@g.us", d, 4, 0).unwrap();
        assert_eq!((fresh.entries, fresh.exits), (4, 0));
    }
}
