//! Integration tests for the task repository.
//!
//! These tests drive the board through its public API: group totals,
//! workflow moves with approval stamping, and the role checks.

use chrono::{Duration, TimeZone, Utc};
use design_board::capability::Principal;
use design_board::clock::{Clock, ManualClock};
use design_board::error::ErrorCode;
use design_board::repository::{BoardState, TaskRepository, TaskUpdate};
use design_board::types::KanbanColumn;
use std::sync::Arc;

/// Helper to create a repository on a manual clock.
fn setup() -> (TaskRepository, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap(),
    ));
    let repo = TaskRepository::new(BoardState::default(), Arc::clone(&clock) as Arc<dyn Clock>);
    (repo, clock)
}

fn client() -> Principal {
    Principal::client("client-1")
}

fn agent() -> Principal {
    Principal::agent("agent-1")
}

fn assert_total_matches(repo: &TaskRepository, group_id: &str) {
    let group = repo.get_group(group_id).unwrap();
    assert_eq!(group.total_tokens, group.recomputed_total());
}

#[test]
fn group_total_tracks_add_edit_delete() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Brand refresh").unwrap();

    let logo = repo.add_task(&client(), &group.id, "Logo", 4.0).unwrap();
    let palette = repo.add_task(&client(), &group.id, "Palette", 1.5).unwrap();
    assert_eq!(repo.get_group(&group.id).unwrap().total_tokens, 5.5);
    assert_total_matches(&repo, &group.id);

    repo.update_task(
        &client(),
        &logo.id,
        TaskUpdate {
            title: None,
            tokens: Some(2.0),
        },
    )
    .unwrap();
    assert_eq!(repo.get_group(&group.id).unwrap().total_tokens, 3.5);
    assert_total_matches(&repo, &group.id);

    // Deleting from a later column still adjusts the total.
    repo.advance(&agent(), &palette.id).unwrap();
    repo.delete_task(&client(), &palette.id).unwrap();
    assert_eq!(repo.get_group(&group.id).unwrap().total_tokens, 2.0);
    assert_total_matches(&repo, &group.id);
}

#[test]
fn approval_is_stamped_once() {
    let (repo, clock) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();
    let task = repo.add_task(&client(), &group.id, "Landing page", 2.0).unwrap();

    let first = repo.advance(&agent(), &task.id).unwrap();
    assert_eq!(first.to, KanbanColumn::Approved);
    assert!(first.approval_stamped);
    let stamped = repo.get_task(&task.id).unwrap().approved_at;
    assert_eq!(stamped, Some(clock.now()));

    // Leave and re-enter approved later: the stamp does not move.
    clock.advance(Duration::hours(3));
    repo.retreat(&agent(), &task.id).unwrap();
    let again = repo.move_to(&agent(), &task.id, KanbanColumn::Approved).unwrap();
    assert!(!again.approval_stamped);
    assert_eq!(repo.get_task(&task.id).unwrap().approved_at, stamped);
}

#[test]
fn submit_request_returns_task_to_request_and_keeps_approval() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();
    let task = repo.add_task(&client(), &group.id, "Hero banner", 1.0).unwrap();
    repo.advance(&agent(), &task.id).unwrap();
    repo.move_to(&agent(), &task.id, KanbanColumn::InAction).unwrap();

    let t = repo.submit_request(&client(), &task.id).unwrap();
    assert_eq!(t.from, KanbanColumn::InAction);
    assert_eq!(t.to, KanbanColumn::Request);

    let task = repo.get_task(&task.id).unwrap();
    assert_eq!(task.column, KanbanColumn::Request);
    assert!(task.approved_at.is_some());
}

#[test]
fn boundary_moves_are_unchanged() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();
    let task = repo.add_task(&client(), &group.id, "Copy", 1.0).unwrap();

    let back = repo.retreat(&agent(), &task.id).unwrap();
    assert!(!back.changed());
    assert_eq!(back.to, KanbanColumn::Request);

    repo.move_to(&agent(), &task.id, KanbanColumn::Finished).unwrap();
    let forward = repo.advance(&agent(), &task.id).unwrap();
    assert!(!forward.changed());
    assert_eq!(repo.get_task(&task.id).unwrap().column, KanbanColumn::Finished);
}

#[test]
fn roles_are_enforced() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();
    let task = repo.add_task(&client(), &group.id, "Sitemap", 1.0).unwrap();

    let err = repo.advance(&client(), &task.id).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let err = repo.add_task(&agent(), &group.id, "Sneaky", 1.0).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let other = Principal::client("client-2");
    let err = repo.delete_task(&other, &task.id).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert!(repo.get_task(&task.id).is_some());
}

#[test]
fn approved_tasks_are_not_editable() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();
    let task = repo.add_task(&client(), &group.id, "Footer", 1.0).unwrap();
    repo.advance(&agent(), &task.id).unwrap();

    let err = repo
        .update_task(
            &client(),
            &task.id,
            TaskUpdate {
                title: Some("Bigger footer".to_string()),
                tokens: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotEditable);
    assert_eq!(repo.get_task(&task.id).unwrap().title, "Footer");
}

#[test]
fn invalid_input_and_missing_ids_are_errors() {
    let (repo, _) = setup();
    let group = repo.add_group(&client(), "Website").unwrap();

    let err = repo.add_task(&client(), &group.id, "Odd", 1.25).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    assert_eq!(err.field.as_deref(), Some("tokens"));

    let err = repo.add_task(&client(), &group.id, "   ", 1.0).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    let err = repo.add_task(&client(), "missing", "Task", 1.0).unwrap_err();
    assert_eq!(err.code, ErrorCode::GroupNotFound);

    let err = repo.advance(&agent(), "missing").unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);

    assert!(repo.get_group(&group.id).unwrap().tasks.is_empty());
}

#[test]
fn column_queries_follow_insertion_order() {
    let (repo, _) = setup();
    let web = repo.add_group(&client(), "Website").unwrap();
    let brand = repo.add_group(&client(), "Brand").unwrap();
    let a = repo.add_task(&client(), &web.id, "A", 1.0).unwrap();
    let b = repo.add_task(&client(), &brand.id, "B", 2.0).unwrap();
    let c = repo.add_task(&client(), &web.id, "C", 0.5).unwrap();
    repo.advance(&agent(), &b.id).unwrap();

    let request: Vec<String> = repo
        .tasks_by_column(KanbanColumn::Request)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(request, vec![a.id, c.id]);

    let summaries = repo.column_summaries();
    assert_eq!(summaries.len(), 5);
    assert_eq!(summaries[0].task_count, 2);
    assert_eq!(summaries[0].total_tokens, 1.5);
    assert_eq!(summaries[1].total_tokens, 2.0);
}
