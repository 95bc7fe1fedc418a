//! Generation schedules.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::card::CardOptions;
use crate::utils::ParseEnumError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// How often a schedule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }

    /// Interval between runs, `None` for one-shot schedules.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(Duration::days(1)),
            Frequency::Weekly => Some(Duration::weeks(1)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once" | "one_time" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(ParseEnumError::new("frequency", s)),
        }
    }
}

/// Schedule lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Running => "running",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a schedule generates when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptions {
    #[serde(default)]
    pub card: CardOptions,
    /// Products to process per run
    #[serde(default = "default_product_limit")]
    pub product_limit: usize,
    #[serde(default)]
    pub generate_video: bool,
}

fn default_product_limit() -> usize {
    5
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            card: CardOptions::default(),
            product_limit: default_product_limit(),
            generate_video: false,
        }
    }
}

/// A stored request to generate cards at a future time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    /// `YYYY-MM-DD` (UTC)
    pub date: String,
    /// `HH:MM` (UTC)
    pub time: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub options: ScheduleOptions,
}

impl Schedule {
    /// Create a pending schedule after validating `date` and `time`.
    pub fn new(
        date: &str,
        time: &str,
        frequency: Frequency,
        options: ScheduleOptions,
    ) -> Result<Self, String> {
        parse_due_at(date, time)?;
        Ok(Self {
            id: format!("sched_{}", Uuid::new_v4().simple()),
            date: date.trim().to_string(),
            time: time.trim().to_string(),
            frequency,
            status: ScheduleStatus::Pending,
            created_at: Utc::now(),
            last_run_at: None,
            last_error: None,
            options,
        })
    }

    /// When the schedule should next fire.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        parse_due_at(&self.date, &self.time).ok()
    }

    /// Pending and at or past its due time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Pending && self.due_at().map(|d| d <= now).unwrap_or(false)
    }

    /// Left `running` by a run that started more than `timeout` before `now`
    /// and never recorded its outcome.
    pub fn is_stalled(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.status == ScheduleStatus::Running
            && self.last_run_at.map(|t| t + timeout <= now).unwrap_or(true)
    }

    /// Next occurrence strictly after `now`, for recurring schedules.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = self.frequency.interval()?;
        let mut next = self.due_at()? + interval;
        while next <= now {
            next += interval;
        }
        Some(next)
    }

    /// Move `date`/`time` to `at` and return to pending.
    pub fn rearm(&mut self, at: DateTime<Utc>) {
        self.date = at.format(DATE_FORMAT).to_string();
        self.time = at.format(TIME_FORMAT).to_string();
        self.status = ScheduleStatus::Pending;
    }
}

fn parse_due_at(date: &str, time: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| format!("Invalid time '{}', expected HH:MM", time))?;
    Ok(NaiveDateTime::new(date, time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_new_validates_date_and_time() {
        assert!(Schedule::new("2024-02-30", "10:00", Frequency::Once, Default::default()).is_err());
        assert!(Schedule::new("2024-02-10", "25:00", Frequency::Once, Default::default()).is_err());
        let s = Schedule::new("2024-02-10", "09:30", Frequency::Daily, Default::default()).unwrap();
        assert_eq!(s.status, ScheduleStatus::Pending);
        assert!(s.id.starts_with("sched_"));
        assert_eq!(s.due_at(), Some(at(2024, 2, 10, 9, 30)));
    }

    #[test]
    fn test_is_due() {
        let mut s = Schedule::new("2024-02-10", "09:30", Frequency::Once, Default::default()).unwrap();
        assert!(!s.is_due(at(2024, 2, 10, 9, 29)));
        assert!(s.is_due(at(2024, 2, 10, 9, 30)));
        s.status = ScheduleStatus::Completed;
        assert!(!s.is_due(at(2024, 3, 1, 0, 0)));
    }

    #[test]
    fn test_is_stalled() {
        let mut s = Schedule::new("2024-02-10", "09:30", Frequency::Once, Default::default()).unwrap();
        assert!(!s.is_stalled(at(2024, 2, 10, 12, 0), Duration::minutes(5)));

        s.status = ScheduleStatus::Running;
        s.last_run_at = Some(at(2024, 2, 10, 9, 30));
        assert!(!s.is_stalled(at(2024, 2, 10, 9, 33), Duration::minutes(5)));
        assert!(s.is_stalled(at(2024, 2, 10, 9, 35), Duration::minutes(5)));

        s.last_run_at = None;
        assert!(s.is_stalled(at(2024, 2, 10, 9, 31), Duration::minutes(5)));
    }

    #[test]
    fn test_next_occurrence_skips_missed_runs() {
        let s = Schedule::new("2024-02-10", "09:30", Frequency::Daily, Default::default()).unwrap();
        let next = s.next_occurrence(at(2024, 2, 13, 12, 0)).unwrap();
        assert_eq!(next, at(2024, 2, 14, 9, 30));

        let once = Schedule::new("2024-02-10", "09:30", Frequency::Once, Default::default()).unwrap();
        assert!(once.next_occurrence(at(2024, 2, 13, 12, 0)).is_none());
    }

    #[test]
    fn test_rearm() {
        let mut s = Schedule::new("2024-02-10", "09:30", Frequency::Weekly, Default::default()).unwrap();
        s.status = ScheduleStatus::Running;
        s.rearm(at(2024, 2, 17, 9, 30));
        assert_eq!(s.date, "2024-02-17");
        assert_eq!(s.time, "09:30");
        assert_eq!(s.status, ScheduleStatus::Pending);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert!("hourly".parse::<Frequency>().is_err());
    }
}
