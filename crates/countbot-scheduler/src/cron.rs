//! Five-field cron expressions: `minute hour day-of-month month day-of-week`.
//!
//! Supports `*`, single values, ranges `a-b`, steps `*/n` and `a-b/n`, and
//! comma lists. Day-of-week accepts 0-7 (both 0 and 7 are Sunday). As in
//! classic cron, when both day fields are restricted a day matches if
//! either one does.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use countbot_core::error::{CountBotError, Result};

/// Search horizon for the next fire time.
const MAX_LOOKAHEAD_DAYS: i64 = 366 * 4;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    /// Bit `n` set when value `n` is allowed.
    allowed: u64,
    /// Field was a bare `*`.
    any: bool,
}

impl Field {
    fn parse(raw: &str, min: u32, max: u32, name: &str) -> Result<Self> {
        let mut allowed = 0u64;
        for part in raw.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| CountBotError::Schedule(format!("bad step '{step}' in {name}")))?;
                    if step == 0 {
                        return Err(CountBotError::Schedule(format!("zero step in {name}")));
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (lo, hi) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_value(a, name)?, parse_value(b, name)?)
            } else {
                let v = parse_value(range, name)?;
                // `5/15` means "from 5 to the end, every 15"
                if part.contains('/') { (v, max) } else { (v, v) }
            };

            if lo < min || hi > max || lo > hi {
                return Err(CountBotError::Schedule(format!(
                    "{name} value '{range}' outside {min}-{max}"
                )));
            }
            let mut v = lo;
            while v <= hi {
                allowed |= 1 << v;
                v += step;
            }
        }
        Ok(Self { allowed, any: raw == "*" })
    }

    fn contains(&self, value: u32) -> bool {
        self.allowed & (1 << value) != 0
    }
}

fn parse_value(s: &str, name: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| CountBotError::Schedule(format!("bad {name} value '{s}'")))
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CountBotError::Schedule(format!(
                "'{expr}': expected 5 fields, found {}",
                fields.len()
            )));
        }
        let wrap = |e: CountBotError| CountBotError::Schedule(format!("'{expr}': {e}"));
        let mut day_of_week = Field::parse(fields[4], 0, 7, "day-of-week").map_err(wrap)?;
        if day_of_week.contains(7) {
            day_of_week.allowed |= 1;
        }
        Ok(Self {
            source: expr.trim().to_string(),
            minute: Field::parse(fields[0], 0, 59, "minute").map_err(wrap)?,
            hour: Field::parse(fields[1], 0, 23, "hour").map_err(wrap)?,
            day_of_month: Field::parse(fields[2], 1, 31, "day-of-month").map_err(wrap)?,
            month: Field::parse(fields[3], 1, 12, "month").map_err(wrap)?,
            day_of_week,
        })
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        if !self.month.contains(date.month()) {
            return false;
        }
        let dom = self.day_of_month.contains(date.day());
        let dow = self.day_of_week.contains(date.weekday().num_days_from_sunday());
        match (self.day_of_month.any, self.day_of_week.any) {
            (false, false) => dom || dow,
            _ => dom && dow,
        }
    }

    /// Whether the expression fires at this minute.
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        self.matches_day(at.date()) && self.hour.contains(at.hour()) && self.minute.contains(at.minute())
    }

    /// First matching local minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        let start = after.naive_local().with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let mut day = start.date();
        let horizon = day + Duration::days(MAX_LOOKAHEAD_DAYS);

        while day <= horizon {
            if self.matches_day(day) {
                for hour in 0..24 {
                    if !self.hour.contains(hour) {
                        continue;
                    }
                    for minute in 0..60 {
                        if !self.minute.contains(minute) {
                            continue;
                        }
                        let candidate = day.and_hms_opt(hour, minute, 0)?;
                        if candidate < start {
                            continue;
                        }
                        // Skips minutes that do not exist (DST gap).
                        if let Some(local) = Local.from_local_datetime(&candidate).earliest() {
                            return Some(local);
                        }
                    }
                }
            }
            day = day.succ_opt()?;
        }
        None
    }
}

impl std::fmt::Display for CronExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for CronExpr {
    type Err = CountBotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn local(s: &str) -> DateTime<Local> {
        Local.from_local_datetime(&naive(s)).earliest().unwrap()
    }

    #[test]
    fn test_daily_expression() {
        let cron = CronExpr::parse("0 13 * * *").unwrap();
        assert!(cron.matches(&naive("2024-05-10 13:00")));
        assert!(!cron.matches(&naive("2024-05-10 13:01")));
        assert!(!cron.matches(&naive("2024-05-10 12:00")));
    }

    #[test]
    fn test_default_report_times_parse() {
        for expr in ["59 23 * * *", "0 8 * * *", "0 13 * * *", "0 18 * * *", "0 0 * * *"] {
            assert!(CronExpr::parse(expr).is_ok(), "{expr}");
        }
    }

    #[test]
    fn test_lists_ranges_steps() {
        let cron = CronExpr::parse("*/15 8-10,18 * * 1-5").unwrap();
        // 2024-05-10 is a Friday, 2024-05-11 a Saturday
        assert!(cron.matches(&naive("2024-05-10 08:45")));
        assert!(cron.matches(&naive("2024-05-10 18:30")));
        assert!(!cron.matches(&naive("2024-05-10 11:00")));
        assert!(!cron.matches(&naive("2024-05-10 08:10")));
        assert!(!cron.matches(&naive("2024-05-11 08:45")));
    }

    #[test]
    fn test_sunday_as_seven() {
        let cron = CronExpr::parse("0 9 * * 7").unwrap();
        assert!(cron.matches(&naive("2024-05-12 09:00")));
    }

    #[test]
    fn test_day_fields_are_ored_when_both_restricted() {
        let cron = CronExpr::parse("0 0 1 * 1").unwrap();
        assert!(cron.matches(&naive("2024-05-01 00:00"))); // 1st, a Wednesday
        assert!(cron.matches(&naive("2024-05-06 00:00"))); // a Monday
        assert!(!cron.matches(&naive("2024-05-07 00:00")));
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in ["", "0 0 * *", "60 0 * * *", "0 24 * * *", "*/0 * * * *", "a b c d e", "5-1 * * * *", "0 0 0 * *"] {
            let err = CronExpr::parse(expr).unwrap_err();
            assert!(matches!(err, CountBotError::Schedule(_)), "{expr}");
        }
    }

    #[test]
    fn test_next_after_same_day_and_rollover() {
        let cron = CronExpr::parse("0 18 * * *").unwrap();
        assert_eq!(cron.next_after(local("2024-05-10 13:30")), Some(local("2024-05-10 18:00")));
        assert_eq!(cron.next_after(local("2024-05-10 18:00")), Some(local("2024-05-11 18:00")));

        let midnight = CronExpr::parse("0 0 * * *").unwrap();
        assert_eq!(midnight.next_after(local("2024-12-31 23:59")), Some(local("2025-01-01 00:00")));
    }

    #[test]
    fn test_next_after_rare_date() {
        let cron = CronExpr::parse("0 12 29 2 *").unwrap();
        assert_eq!(cron.next_after(local("2024-03-01 00:00")), Some(local("2028-02-29 12:00")));
    }
}
