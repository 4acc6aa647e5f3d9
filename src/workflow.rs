//! Kanban workflow state machine.
//!
//! Columns form a total order `request → approved → up-next → in-action → finished`.
//! Stepping clamps at both ends. Entering `approved` stamps `approved_at` the
//! first time only; the stamp is never cleared, so approval order stays a
//! stable scheduling key.
//!
//! Capability checks are not made here; see [`crate::repository`].

use crate::types::{KanbanColumn, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A requested column change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "column")]
pub enum WorkflowAction {
    /// One step forward.
    Advance,
    /// One step back.
    Retreat,
    /// Jump to any column (drag and drop).
    MoveTo(KanbanColumn),
    /// Send the task back to `request` from wherever it is.
    SubmitRequest,
}

/// Outcome of applying a workflow action to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub task_id: String,
    pub from: KanbanColumn,
    pub to: KanbanColumn,
    /// True when this transition set `approved_at`.
    pub approval_stamped: bool,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub fn next_column(column: KanbanColumn) -> Option<KanbanColumn> {
    KanbanColumn::ALL.get(column.index() + 1).copied()
}

pub fn previous_column(column: KanbanColumn) -> Option<KanbanColumn> {
    column
        .index()
        .checked_sub(1)
        .and_then(|i| KanbanColumn::ALL.get(i).copied())
}

/// Resolve the column an action leads to. Boundary steps stay put.
pub fn target_column(current: KanbanColumn, action: WorkflowAction) -> KanbanColumn {
    match action {
        WorkflowAction::Advance => next_column(current).unwrap_or(current),
        WorkflowAction::Retreat => previous_column(current).unwrap_or(current),
        WorkflowAction::MoveTo(column) => column,
        WorkflowAction::SubmitRequest => KanbanColumn::Request,
    }
}

/// Apply an action to a task in place.
pub fn apply(task: &mut Task, action: WorkflowAction, now: DateTime<Utc>) -> Transition {
    let from = task.column;
    let to = target_column(from, action);
    task.column = to;

    let approval_stamped = to == KanbanColumn::Approved && task.approved_at.is_none();
    if approval_stamped {
        task.approved_at = Some(now);
    }

    Transition {
        task_id: task.id.clone(),
        from,
        to,
        approval_stamped,
    }
}
