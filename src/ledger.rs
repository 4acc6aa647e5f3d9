//! Token ledger: time/token conversion and the daily budget admission rule.
//!
//! All functions are pure and total over well-formed input. Token values are
//! validated where tasks are created or edited, not here.

use crate::types::{Task, Tokens};
use serde::{Deserialize, Serialize};

/// Minutes of design work covered by one token.
pub const MINUTES_PER_TOKEN: f64 = 30.0;

/// Default daily budget for the admission rule.
pub const DEFAULT_MAX_TOKENS_PER_DAY: Tokens = 2.0;

/// Largest estimate a single task may carry (5000 hours).
pub const MAX_TASK_TOKENS: Tokens = 10_000.0;

/// Hours and minutes of work represented by a token amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub hours: u32,
    pub minutes: u32,
}

impl TimeSpan {
    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

/// Convert an estimate in minutes to tokens.
///
/// Anything under one token collapses to 0, the free sentinel. Callers must
/// not pass negative minutes.
pub fn tokens_from_minutes(minutes: f64) -> Tokens {
    let tokens = minutes / MINUTES_PER_TOKEN;
    if tokens < 1.0 { 0.0 } else { tokens }
}

/// Convert tokens back to hours and minutes (0.5 token is 0h15m).
pub fn time_from_tokens(tokens: Tokens) -> TimeSpan {
    let total_minutes = tokens * MINUTES_PER_TOKEN;
    TimeSpan {
        hours: (total_minutes / 60.0).floor() as u32,
        minutes: (total_minutes % 60.0).floor() as u32,
    }
}

/// Render a token amount as a human duration: `45 min`, `2 hr`, `1 hr 30 min`.
/// Zero renders as `0 min`.
pub fn format_duration(tokens: Tokens) -> String {
    let TimeSpan { hours, minutes } = time_from_tokens(tokens);

    if hours == 0 {
        format!("{} min", minutes)
    } else if minutes == 0 {
        format!("{} hr", hours)
    } else {
        format!("{} hr {} min", hours, minutes)
    }
}

/// True for token values below one.
pub fn is_free(tokens: Tokens) -> bool {
    tokens < 1.0
}

pub fn is_free_task(task: &Task) -> bool {
    is_free(task.tokens)
}

pub fn total_tokens<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Tokens {
    tasks.into_iter().map(|task| task.tokens).sum()
}

/// Whether `candidate` may join the tasks already placed on a day.
///
/// Decision order:
/// 1. A task larger than the budget only fits an empty day.
/// 2. The day's sum including the candidate may not exceed the budget.
/// 3. At most one free task per day.
pub fn can_admit_task_to_day(existing: &[Task], candidate: &Task, max_tokens_per_day: Tokens) -> bool {
    if candidate.tokens > max_tokens_per_day {
        return existing.is_empty();
    }

    if total_tokens(existing) + candidate.tokens > max_tokens_per_day {
        return false;
    }

    if is_free_task(candidate) {
        return !existing.iter().any(is_free_task);
    }

    true
}
