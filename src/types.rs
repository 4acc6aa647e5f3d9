//! Core types for the design board.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effort in tokens (1 token = 30 minutes of design work).
/// Task values are non-negative with a granularity of 0.5.
pub type Tokens = f64;

/// Kanban column a task occupies. Declaration order is the workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KanbanColumn {
    Request,
    Approved,
    UpNext,
    InAction,
    Finished,
}

impl KanbanColumn {
    /// All columns in workflow order.
    pub const ALL: [KanbanColumn; 5] = [
        KanbanColumn::Request,
        KanbanColumn::Approved,
        KanbanColumn::UpNext,
        KanbanColumn::InAction,
        KanbanColumn::Finished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KanbanColumn::Request => "request",
            KanbanColumn::Approved => "approved",
            KanbanColumn::UpNext => "up-next",
            KanbanColumn::InAction => "in-action",
            KanbanColumn::Finished => "finished",
        }
    }

    /// Display label used by the board header.
    pub fn label(&self) -> &'static str {
        match self {
            KanbanColumn::Request => "Request",
            KanbanColumn::Approved => "Approved",
            KanbanColumn::UpNext => "Up Next",
            KanbanColumn::InAction => "In Action",
            KanbanColumn::Finished => "Finished",
        }
    }

    /// Zero-based position in the workflow.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for KanbanColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KanbanColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "request" => Ok(KanbanColumn::Request),
            "approved" => Ok(KanbanColumn::Approved),
            "up-next" => Ok(KanbanColumn::UpNext),
            "in-action" => Ok(KanbanColumn::InAction),
            "finished" => Ok(KanbanColumn::Finished),
            other => Err(format!("unknown column: {}", other)),
        }
    }
}

/// A unit of design work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub tokens: Tokens,
    /// Owning task group.
    pub parent_id: String,
    pub column: KanbanColumn,
    /// Principal that created the request.
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    /// Set once, the first time the task enters `approved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
}

/// A named collection of related tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: String,
    pub title: String,
    /// Cached sum of member task tokens.
    pub total_tokens: Tokens,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskGroup {
    /// Sum member tokens from scratch, ignoring the cached total.
    pub fn recomputed_total(&self) -> Tokens {
        self.tasks.iter().map(|t| t.tokens).sum()
    }
}

/// Token and count totals for one kanban column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: KanbanColumn,
    pub task_count: usize,
    pub total_tokens: Tokens,
}

/// Read-only timeline projection of an approved task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub title: String,
    pub tokens: Tokens,
    /// Calendar-day offset from the horizon, 0-based.
    pub start_day: i64,
    /// Business days of work.
    pub duration: u32,
    /// Calendar days from the horizon through the end date, inclusive.
    pub total_days: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScheduledTask {
    /// Calendar days from start through end, inclusive.
    pub fn span_days(&self) -> i64 {
        self.total_days - self.start_day
    }

    /// Whether the bar covers the given day cell of the strip.
    /// `total_days` is measured from the horizon, so it doubles as the exclusive end.
    pub fn covers(&self, day_index: i64) -> bool {
        day_index >= self.start_day && day_index < self.total_days
    }
}

/// Role carried by an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Agent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Agent => "agent",
        }
    }
}

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 4] = [
        SubscriptionTier::Free,
        SubscriptionTier::Starter,
        SubscriptionTier::Professional,
        SubscriptionTier::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown subscription tier: {}", s))
    }
}

/// User profile supplied by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub role: UserRole,
    pub subscription: SubscriptionTier,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    User,
    Ai,
    Agent,
}

/// Connection state with a human agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    #[default]
    Idle,
    Waiting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: ChatSender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
