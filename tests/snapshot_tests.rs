//! Integration tests for board snapshots on disk.

use design_board::capability::Principal;
use design_board::clock::SystemClock;
use design_board::repository::{BoardState, TaskRepository};
use design_board::snapshot::{self, CURRENT_SCHEMA_VERSION, Snapshot};
use design_board::types::KanbanColumn;
use std::sync::Arc;
use tempfile::TempDir;

/// Board with one group, two tasks, one of them approved.
fn seeded_repo() -> TaskRepository {
    let repo = TaskRepository::in_memory();
    let client = Principal::client("client-1");
    let group = repo.add_group(&client, "Website").unwrap();
    let task = repo.add_task(&client, &group.id, "Landing page", 2.5).unwrap();
    repo.add_task(&client, &group.id, "Favicon", 0.0).unwrap();
    repo.advance(&Principal::agent("agent-1"), &task.id).unwrap();
    repo
}

#[test]
fn missing_file_loads_empty_board() {
    let dir = TempDir::new().unwrap();
    let board = snapshot::load_or_empty(&dir.path().join("board.json")).unwrap();
    assert_eq!(board, BoardState::default());
}

#[test]
fn plain_json_snapshot_restores_board() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("board.json");
    let repo = seeded_repo();

    snapshot::save(&path, repo.snapshot_state()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"schema_version\""));
    assert!(content.contains("Landing page"));

    let restored = TaskRepository::new(snapshot::load_or_empty(&path).unwrap(), Arc::new(SystemClock));
    assert_eq!(restored.snapshot_state(), repo.snapshot_state());
    assert_eq!(restored.tasks_by_column(KanbanColumn::Approved).len(), 1);
    assert!(restored.approved_tasks()[0].approved_at.is_some());
}

#[test]
fn gz_extension_writes_compressed_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.json.gz");
    let repo = seeded_repo();

    snapshot::save(&path, repo.snapshot_state()).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    let loaded = Snapshot::from_file(&path).unwrap();
    assert_eq!(loaded.board, repo.snapshot_state());
    assert!(!dir.path().join("board.json.tmp").exists());
}

#[test]
fn incompatible_schema_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.json");
    let mut snap = Snapshot::new(BoardState::default());
    snap.schema_version = CURRENT_SCHEMA_VERSION + 1;
    std::fs::write(&path, snap.to_json_pretty().unwrap()).unwrap();

    let err = Snapshot::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("schema version"));
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(snapshot::load_or_empty(&path).is_err());
}

#[test]
fn stale_group_total_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.json");
    let mut board = seeded_repo().snapshot_state();
    board.groups[0].total_tokens += 1.0;
    std::fs::write(&path, Snapshot::new(board).to_json_pretty().unwrap()).unwrap();

    let err = snapshot::load_or_empty(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("total"));
}

#[test]
fn invalid_task_tokens_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.json");
    let mut board = seeded_repo().snapshot_state();
    board.groups[0].tasks[0].tokens = 1.25;
    board.groups[0].total_tokens = board.groups[0].recomputed_total();
    std::fs::write(&path, Snapshot::new(board).to_json_pretty().unwrap()).unwrap();

    assert!(snapshot::load_or_empty(&path).is_err());
}
