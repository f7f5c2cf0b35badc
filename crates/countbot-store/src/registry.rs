//! Group registry: tracked groups, selected groups and member snapshots.

use countbot_core::error::Result;
use countbot_core::traits::GroupRegistry;
use countbot_core::types::{Day, Group, GroupSnapshot, SelectedGroup};
use rusqlite::{params, OptionalExtension, Transaction};

use crate::sqlite::{db_err, SqliteStore};

impl SqliteStore {
    fn matches_prefix(&self, group: &GroupSnapshot) -> bool {
        let subject = group.normalized_subject();
        !subject.is_empty() && subject.starts_with(self.group_prefix())
    }
}

fn write_members(tx: &Transaction<'_>, group_id: &str, members: &[String], taken_on: Day) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM group_members WHERE group_id = ?1", params![group_id])?;
    tx.execute(
        "INSERT INTO member_snapshots (group_id, taken_on) VALUES (?1, ?2)
         ON CONFLICT(group_id) DO UPDATE SET taken_on = excluded.taken_on",
        params![group_id, taken_on.key()],
    )?;
    let mut insert = tx.prepare(
        "INSERT OR IGNORE INTO group_members (group_id, participant_id) VALUES (?1, ?2)",
    )?;
    for member in members {
        insert.execute(params![group_id, member])?;
    }
    Ok(())
}

impl GroupRegistry for SqliteStore {
    fn sync_groups(&self, live: &[GroupSnapshot]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let mut stored = 0;
        let today = Day::today();

        for group in live {
            if !self.matches_prefix(group) {
                tracing::info!("Ignoring group: {}", group.subject);
                continue;
            }

            tracing::info!("Saving group: {}", group.subject);
            tx.execute(
                "INSERT INTO groups (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![group.id, group.subject.trim()],
            ).map_err(db_err)?;
            write_members(&tx, &group.id, &group.participants, today).map_err(db_err)?;
            stored += 1;
        }

        tx.commit().map_err(db_err)?;
        Ok(stored)
    }

    fn mark_selected(&self, group_id: &str, name: &str) -> Result<()> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO selected_groups (id, name) VALUES (?1, ?2)",
            params![group_id, name],
        ).map_err(db_err)?;
        if inserted > 0 {
            tracing::info!("📌 Group selected for reports: {name} ({group_id})");
        }
        Ok(())
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM groups ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok(Group { id: row.get(0)?, name: row.get(1)? }))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn list_selected(&self) -> Result<Vec<SelectedGroup>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM selected_groups ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok(SelectedGroup { id: row.get(0)?, name: row.get(1)? }))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name FROM groups WHERE id = ?1",
            params![group_id],
            |row| Ok(Group { id: row.get(0)?, name: row.get(1)? }),
        )
        .optional()
        .map_err(db_err)
    }

    fn is_selected(&self, group_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM selected_groups WHERE id = ?1",
                params![group_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn member_snapshot(&self, group_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT participant_id FROM group_members WHERE group_id = ?1 ORDER BY participant_id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![group_id], |row| row.get(0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)
    }

    fn snapshot_day(&self, group_id: &str) -> Result<Option<Day>> {
        let conn = self.lock()?;
        let taken_on: Option<String> = conn
            .query_row(
                "SELECT taken_on FROM member_snapshots WHERE group_id = ?1",
                params![group_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        taken_on.map(|key| Day::parse(&key)).transpose()
    }

    fn replace_member_snapshot(&self, group_id: &str, members: &[String], taken_on: Day) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        write_members(&tx, group_id, members, taken_on).map_err(db_err)?;
        tx.commit().map_err(db_err)
    }
}
