//! Calendar days and per-day counter rows.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CountBotError, Result};

/// Storage and display format of a day (pt-BR short date).
pub const DAY_FORMAT: &str = "%d/%m/%Y";

/// A calendar day in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today according to the host clock.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Accepts `dd/mm/yyyy` (the stored form) or ISO `yyyy-mm-dd`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        NaiveDate::parse_from_str(input, DAY_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
            .map(Self)
            .map_err(|e| CountBotError::Other(format!("Invalid date '{input}': {e}")))
    }

    /// Key used in the `daily_counters.date` column.
    pub fn key(&self) -> String {
        self.0.format(DAY_FORMAT).to_string()
    }

    pub fn previous(&self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Which side of a daily counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Entries,
    Exits,
}

impl CounterKind {
    /// Column name in `daily_counters`.
    pub fn column(&self) -> &'static str {
        match self {
            CounterKind::Entries => "entries",
            CounterKind::Exits => "exits",
        }
    }
}

impl std::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// One `(group, day)` row of the counter store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub group_id: String,
    pub date: String,
    pub entries: u32,
    pub exits: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl DailyCounter {
    /// Zeroed counter for groups without a row yet.
    pub fn empty(group_id: &str, day: Day) -> Self {
        Self {
            group_id: group_id.to_string(),
            date: day.key(),
            entries: 0,
            exits: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}
