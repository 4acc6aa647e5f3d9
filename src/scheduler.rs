//! Timeline builder: lays approved tasks out sequentially on business days.
//!
//! Tasks are ordered by `approved_at` (stable on ties) and placed back to back
//! from the horizon. Each task takes `max(1, ceil(work / daily_capacity))`
//! business days; the next task starts on the business day after the previous
//! one ends. No slack is packed. The result depends only on the input and
//! the horizon, so repeated builds are identical.

use crate::ledger;
use crate::types::{ScheduledTask, Task, Tokens};
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Unit in which the daily capacity is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityUnit {
    /// Whole hours of work (`floor(tokens * 30 / 60)`) per day.
    #[default]
    Hours,
    /// Tokens per day, matching the ledger's daily budget.
    Tokens,
}

/// How much work fits into one business day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityRule {
    #[serde(default)]
    pub unit: CapacityUnit,
    #[serde(default = "default_daily_capacity")]
    pub daily_capacity: f64,
}

fn default_daily_capacity() -> f64 {
    2.0
}

impl Default for CapacityRule {
    fn default() -> Self {
        Self {
            unit: CapacityUnit::default(),
            daily_capacity: default_daily_capacity(),
        }
    }
}

impl CapacityRule {
    pub fn new(unit: CapacityUnit, daily_capacity: f64) -> Self {
        Self {
            unit,
            daily_capacity,
        }
    }

    /// Business days needed for a task, at least one.
    pub fn duration_days(&self, tokens: Tokens) -> u32 {
        // Non-positive capacity degenerates to one task per day.
        if self.daily_capacity.is_nan() || self.daily_capacity <= 0.0 {
            return 1;
        }
        let work = match self.unit {
            CapacityUnit::Hours => f64::from(ledger::time_from_tokens(tokens).hours),
            CapacityUnit::Tokens => tokens,
        };
        ((work / self.daily_capacity).ceil() as u32).max(1)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Move `days` calendar days, saturating at the ends of the representable range.
fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Add `amount` business days, skipping Saturdays and Sundays.
///
/// Whole weeks are added as seven calendar days. A start date on a weekend
/// with a zero amount is returned unchanged; with a non-zero amount a result
/// that lands on a weekend is pulled back to the adjacent weekday. Results
/// past the calendar range saturate at `NaiveDate::MAX` / `NaiveDate::MIN`.
pub fn add_business_days(date: NaiveDate, amount: i64) -> NaiveDate {
    let started_on_weekend = is_weekend(date);
    let sign = if amount < 0 { -1 } else { 1 };

    let mut result = shift_days(date, (amount / 5).saturating_mul(7));
    let mut rest = (amount % 5).abs();
    while rest > 0 {
        let next = shift_days(result, sign);
        if next == result {
            return result;
        }
        result = next;
        if !is_weekend(result) {
            rest -= 1;
        }
    }

    if started_on_weekend && is_weekend(result) && amount != 0 {
        let shift = match (result.weekday(), sign < 0) {
            (Weekday::Sat, true) => 2,
            (Weekday::Sat, false) => -1,
            (Weekday::Sun, true) => 1,
            (Weekday::Sun, false) => -2,
            _ => 0,
        };
        result = shift_days(result, shift);
    }

    result
}

/// Calendar days from `from` to `to` (negative if `to` is earlier).
pub fn calendar_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// One cell of the calendar strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDay {
    pub offset: i64,
    pub date: NaiveDate,
    pub weekend: bool,
}

/// Scheduled tasks measured from a horizon date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub horizon: NaiveDate,
    pub tasks: Vec<ScheduledTask>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The first `count` calendar days from the horizon.
    pub fn days(&self, count: usize) -> Vec<TimelineDay> {
        (0..count as i64)
            .map_while(|offset| {
                let date = self.horizon.checked_add_days(Days::new(offset.unsigned_abs()))?;
                Some(TimelineDay {
                    offset,
                    date,
                    weekend: is_weekend(date),
                })
            })
            .collect()
    }

    /// Scheduled tasks worked on `date`: the bar includes the date and the
    /// date is a business day, or the day a weekend-horizon task starts.
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<&ScheduledTask> {
        self.tasks
            .iter()
            .filter(|s| s.start_date <= date && date <= s.end_date)
            .filter(|s| !is_weekend(date) || s.start_date == date)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduler {
    horizon: NaiveDate,
    capacity: CapacityRule,
}

impl Scheduler {
    pub fn new(horizon: NaiveDate, capacity: CapacityRule) -> Self {
        Self { horizon, capacity }
    }

    /// Scheduler anchored at today's local date.
    pub fn from_today(capacity: CapacityRule) -> Self {
        Self::new(Local::now().date_naive(), capacity)
    }

    pub fn horizon(&self) -> NaiveDate {
        self.horizon
    }

    pub fn capacity(&self) -> CapacityRule {
        self.capacity
    }

    /// Place every task carrying an approval stamp; others are ignored.
    pub fn build(&self, tasks: &[Task]) -> Timeline {
        let mut approved: Vec<&Task> = tasks.iter().filter(|t| t.approved_at.is_some()).collect();
        // Stable sort keeps insertion order for equal stamps.
        approved.sort_by_key(|t| t.approved_at);

        let mut current = self.horizon;
        let scheduled = approved
            .into_iter()
            .map(|task| {
                let duration = self.capacity.duration_days(task.tokens);
                let start_date = current;
                let end_date = add_business_days(start_date, i64::from(duration) - 1);
                current = add_business_days(end_date, 1);

                ScheduledTask {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    tokens: task.tokens,
                    start_day: calendar_days_between(self.horizon, start_date),
                    duration,
                    total_days: calendar_days_between(self.horizon, end_date) + 1,
                    start_date,
                    end_date,
                }
            })
            .collect();

        Timeline {
            horizon: self.horizon,
            tasks: scheduled,
        }
    }
}
