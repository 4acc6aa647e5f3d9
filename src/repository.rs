//! In-memory task repository.
//!
//! `TaskRepository` owns the board state (task groups and their tasks) behind
//! a mutex, so every mutation, including the read-modify-write of a group's
//! token total, is serialised. Handles are cheap to clone and share state.

use crate::capability::{Capability, Principal};
use crate::clock::{Clock, SystemClock};
use crate::error::{BoardError, BoardResult};
use crate::ledger;
use crate::scheduler::Timeline;
use crate::types::{ColumnSummary, KanbanColumn, Task, TaskGroup, Tokens};
use crate::workflow::{self, Transition, WorkflowAction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Snapshot-able board contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    #[serde(default)]
    pub groups: Vec<TaskGroup>,
}

impl BoardState {
    fn find_task(&self, task_id: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, group)| {
            group
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|ti| (gi, ti))
        })
    }

    fn task_mut(&mut self, task_id: &str) -> BoardResult<&mut Task> {
        let (gi, ti) = self
            .find_task(task_id)
            .ok_or_else(|| BoardError::task_not_found(task_id))?;
        Ok(&mut self.groups[gi].tasks[ti])
    }

    /// All tasks in group order, then insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }
}

/// Fields a client may change on a pending request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub tokens: Option<Tokens>,
}

/// Repository handle wrapping the shared board state.
#[derive(Clone)]
pub struct TaskRepository {
    state: Arc<Mutex<BoardState>>,
    clock: Arc<dyn Clock>,
}

impl Default for TaskRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TaskRepository {
    /// Empty board on the system clock.
    pub fn in_memory() -> Self {
        Self::new(BoardState::default(), Arc::new(SystemClock))
    }

    pub fn new(state: BoardState, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    /// Execute a function with shared access to the state.
    pub fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&BoardState) -> T,
    {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Execute a function with exclusive access to the state.
    fn with_state_mut<F, T>(&self, f: F) -> BoardResult<T>
    where
        F: FnOnce(&mut BoardState) -> BoardResult<T>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Copy of the current state, e.g. for writing a snapshot.
    pub fn snapshot_state(&self) -> BoardState {
        self.with_state(Clone::clone)
    }

    // Groups

    pub fn add_group(&self, actor: &Principal, title: &str) -> BoardResult<TaskGroup> {
        actor.require(Capability::RequestWork, "create task groups")?;
        let title = validate_title(title)?;

        let group = TaskGroup {
            id: Uuid::now_v7().to_string(),
            title,
            total_tokens: 0.0,
            tasks: Vec::new(),
        };

        self.with_state_mut(|state| {
            state.groups.push(group.clone());
            Ok(())
        })?;
        info!(group_id = %group.id, title = %group.title, "task group created");
        Ok(group)
    }

    /// Discard a group together with its tasks.
    pub fn delete_group(&self, actor: &Principal, group_id: &str) -> BoardResult<TaskGroup> {
        actor.require(Capability::RequestWork, "delete task groups")?;

        let group = self.with_state_mut(|state| {
            let index = state
                .groups
                .iter()
                .position(|g| g.id == group_id)
                .ok_or_else(|| BoardError::group_not_found(group_id))?;
            if let Some(foreign) = state.groups[index]
                .tasks
                .iter()
                .find(|t| t.requested_by != actor.id)
            {
                return Err(BoardError::unauthorized(&actor.id, "delete this task group")
                    .with_details(format!("task {} belongs to {}", foreign.id, foreign.requested_by)));
            }
            Ok(state.groups.remove(index))
        })?;
        info!(group_id = %group.id, tasks = group.tasks.len(), "task group deleted");
        Ok(group)
    }

    pub fn groups(&self) -> Vec<TaskGroup> {
        self.with_state(|state| state.groups.clone())
    }

    pub fn get_group(&self, group_id: &str) -> Option<TaskGroup> {
        self.with_state(|state| state.groups.iter().find(|g| g.id == group_id).cloned())
    }

    // Tasks

    /// Create a task in `request`. Also the entry point for chat suggestions.
    pub fn add_task(
        &self,
        actor: &Principal,
        group_id: &str,
        title: &str,
        tokens: Tokens,
    ) -> BoardResult<Task> {
        actor.require(Capability::RequestWork, "create tasks")?;
        let title = validate_title(title)?;
        let tokens = validate_tokens(tokens)?;

        let task = Task {
            id: Uuid::now_v7().to_string(),
            title,
            tokens,
            parent_id: group_id.to_string(),
            column: KanbanColumn::Request,
            requested_by: actor.id.clone(),
            created_at: self.clock.now(),
            approved_at: None,
            assigned_agent_id: None,
        };

        self.with_state_mut(|state| {
            let group = state
                .groups
                .iter_mut()
                .find(|g| g.id == group_id)
                .ok_or_else(|| BoardError::group_not_found(group_id))?;
            group.tasks.push(task.clone());
            group.total_tokens += task.tokens;
            Ok(())
        })?;
        info!(task_id = %task.id, group_id, tokens, "task created");
        Ok(task)
    }

    /// Edit title and/or tokens. Only the requester, only while in `request`.
    pub fn update_task(
        &self,
        actor: &Principal,
        task_id: &str,
        update: TaskUpdate,
    ) -> BoardResult<Task> {
        actor.require(Capability::RequestWork, "edit tasks")?;
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let tokens = update.tokens.map(validate_tokens).transpose()?;

        self.with_state_mut(|state| {
            let (gi, ti) = state
                .find_task(task_id)
                .ok_or_else(|| BoardError::task_not_found(task_id))?;
            let group = &mut state.groups[gi];
            let task = &mut group.tasks[ti];

            ensure_requester(actor, task, "edit this task")?;
            if task.column != KanbanColumn::Request {
                return Err(BoardError::not_editable(task_id, task.column.as_str()));
            }

            if let Some(title) = title {
                task.title = title;
            }
            if let Some(tokens) = tokens {
                let delta = tokens - task.tokens;
                task.tokens = tokens;
                group.total_tokens += delta;
            }

            debug!(task_id, "task updated");
            Ok(task.clone())
        })
    }

    /// Remove a task from any column. Only the requester.
    pub fn delete_task(&self, actor: &Principal, task_id: &str) -> BoardResult<Task> {
        actor.require(Capability::RequestWork, "delete tasks")?;

        let task = self.with_state_mut(|state| {
            let (gi, ti) = state
                .find_task(task_id)
                .ok_or_else(|| BoardError::task_not_found(task_id))?;
            ensure_requester(actor, &state.groups[gi].tasks[ti], "delete this task")?;

            let group = &mut state.groups[gi];
            let task = group.tasks.remove(ti);
            group.total_tokens -= task.tokens;
            Ok(task)
        })?;
        info!(task_id, column = %task.column, "task deleted");
        Ok(task)
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.with_state(|state| state.tasks().find(|t| t.id == task_id).cloned())
    }

    // Workflow

    pub fn advance(&self, actor: &Principal, task_id: &str) -> BoardResult<Transition> {
        actor.require(Capability::ManageWorkflow, "advance tasks")?;
        self.transition(task_id, WorkflowAction::Advance)
    }

    pub fn retreat(&self, actor: &Principal, task_id: &str) -> BoardResult<Transition> {
        actor.require(Capability::ManageWorkflow, "move tasks back")?;
        self.transition(task_id, WorkflowAction::Retreat)
    }

    pub fn move_to(
        &self,
        actor: &Principal,
        task_id: &str,
        column: KanbanColumn,
    ) -> BoardResult<Transition> {
        actor.require(Capability::ManageWorkflow, "move tasks")?;
        self.transition(task_id, WorkflowAction::MoveTo(column))
    }

    /// Send a task back to `request`. Available to its requester from any column.
    pub fn submit_request(&self, actor: &Principal, task_id: &str) -> BoardResult<Transition> {
        actor.require(Capability::RequestWork, "submit requests")?;
        self.transition_checked(task_id, WorkflowAction::SubmitRequest, |task| {
            ensure_requester(actor, task, "resubmit this task")
        })
    }

    /// Record the agent working a task.
    pub fn assign_agent(&self, actor: &Principal, task_id: &str, agent_id: Option<&str>) -> BoardResult<Task> {
        actor.require(Capability::ManageWorkflow, "assign agents")?;
        self.with_state_mut(|state| {
            let task = state.task_mut(task_id)?;
            task.assigned_agent_id = agent_id.map(str::to_string);
            Ok(task.clone())
        })
    }

    fn transition(&self, task_id: &str, action: WorkflowAction) -> BoardResult<Transition> {
        self.transition_checked(task_id, action, |_| Ok(()))
    }

    fn transition_checked<F>(
        &self,
        task_id: &str,
        action: WorkflowAction,
        authorize: F,
    ) -> BoardResult<Transition>
    where
        F: FnOnce(&Task) -> BoardResult<()>,
    {
        let now = self.clock.now();
        let transition = self.with_state_mut(|state| {
            let task = state.task_mut(task_id)?;
            authorize(task)?;
            Ok(workflow::apply(task, action, now))
        })?;

        if transition.changed() {
            info!(
                task_id,
                from = %transition.from,
                to = %transition.to,
                approval_stamped = transition.approval_stamped,
                "task moved"
            );
        } else {
            debug!(task_id, column = %transition.to, "task already at workflow boundary");
        }
        Ok(transition)
    }

    // Queries

    pub fn tasks_by_column(&self, column: KanbanColumn) -> Vec<Task> {
        self.with_state(|state| state.tasks().filter(|t| t.column == column).cloned().collect())
    }

    /// Count and token total per column, in workflow order.
    pub fn column_summaries(&self) -> Vec<ColumnSummary> {
        self.with_state(|state| {
            KanbanColumn::ALL
                .iter()
                .map(|&column| {
                    let tasks: Vec<&Task> = state.tasks().filter(|t| t.column == column).collect();
                    ColumnSummary {
                        column,
                        task_count: tasks.len(),
                        total_tokens: ledger::total_tokens(tasks),
                    }
                })
                .collect()
        })
    }

    /// Tasks that have ever been approved, in insertion order.
    pub fn approved_tasks(&self) -> Vec<Task> {
        self.with_state(|state| {
            state
                .tasks()
                .filter(|t| t.approved_at.is_some())
                .cloned()
                .collect()
        })
    }

    /// Board tasks worked on `date` according to `timeline`, in timeline order.
    pub fn tasks_on(&self, timeline: &Timeline, date: NaiveDate) -> Vec<Task> {
        let scheduled = timeline.tasks_on(date);
        self.with_state(|state| {
            scheduled
                .iter()
                .filter_map(|s| state.tasks().find(|t| t.id == s.task_id).cloned())
                .collect()
        })
    }
}

fn ensure_requester(actor: &Principal, task: &Task, action: &str) -> BoardResult<()> {
    if task.requested_by == actor.id {
        Ok(())
    } else {
        Err(BoardError::unauthorized(&actor.id, action)
            .with_details(format!("task {} was requested by {}", task.id, task.requested_by)))
    }
}

fn validate_title(title: &str) -> BoardResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BoardError::missing_field("title"));
    }
    Ok(title.to_string())
}

/// Token values must be finite, within `0..=MAX_TASK_TOKENS`, and whole or half tokens.
pub fn validate_tokens(tokens: Tokens) -> BoardResult<Tokens> {
    if !tokens.is_finite() {
        return Err(BoardError::invalid_value("tokens", "tokens must be a finite number"));
    }
    if tokens < 0.0 {
        return Err(BoardError::invalid_value("tokens", "tokens must be non-negative"));
    }
    if tokens > ledger::MAX_TASK_TOKENS {
        return Err(BoardError::invalid_value(
            "tokens",
            &format!("tokens must not exceed {}", ledger::MAX_TASK_TOKENS),
        ));
    }
    if (tokens * 2.0).fract() != 0.0 {
        return Err(BoardError::invalid_value(
            "tokens",
            "tokens must be a multiple of 0.5",
        ));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_validate_tokens() {
        assert_eq!(validate_tokens(0.0).unwrap(), 0.0);
        assert_eq!(validate_tokens(2.5).unwrap(), 2.5);
        assert_eq!(validate_tokens(-1.0).unwrap_err().code, ErrorCode::InvalidFieldValue);
        assert!(validate_tokens(f64::NAN).is_err());
        assert!(validate_tokens(f64::INFINITY).is_err());
        assert!(validate_tokens(1.25).is_err());
    }

    #[test]
    fn test_validate_tokens_upper_bound() {
        assert_eq!(validate_tokens(ledger::MAX_TASK_TOKENS).unwrap(), ledger::MAX_TASK_TOKENS);
        let err = validate_tokens(300_000_000.0).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("tokens"));
    }

    #[test]
    fn test_oversized_task_rejected_before_scheduling() {
        let repo = TaskRepository::in_memory();
        let client = Principal::client("client-1");
        let group = repo.add_group(&client, "Website").unwrap();

        let err = repo.add_task(&client, &group.id, "Huge", 300_000_000.0).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert!(repo.approved_tasks().is_empty());
        assert_eq!(repo.get_group(&group.id).unwrap().total_tokens, 0.0);
    }

    #[test]
    fn test_validate_title_trims() {
        assert_eq!(validate_title("  Logo  ").unwrap(), "Logo");
        assert_eq!(validate_title("   ").unwrap_err().code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn test_add_task_to_missing_group_is_rejected() {
        let repo = TaskRepository::in_memory();
        let err = repo
            .add_task(&Principal::client("c"), "nope", "Logo", 1.0)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GroupNotFound);
    }

    #[test]
    fn test_handles_share_state() {
        let repo = TaskRepository::in_memory();
        let other = repo.clone();
        repo.add_group(&Principal::client("c"), "Website").unwrap();
        assert_eq!(other.groups().len(), 1);
    }
}
