//! Board snapshots on disk.
//!
//! The CLI keeps the board between invocations in a versioned JSON document.
//! Files ending in `.gz` are written gzip-compressed; reading detects gzip
//! from the magic bytes regardless of the extension.

use crate::repository::{BoardState, validate_tokens};
use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

/// Layout version of the board document.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Snapshot format version (semver).
pub const SNAPSHOT_VERSION: &str = "1.0.0";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: i32,

    pub snapshot_version: String,

    /// RFC 3339 timestamp of when the snapshot was written.
    pub saved_at: String,

    /// Tool name and version that wrote the snapshot.
    pub saved_by: String,

    pub board: BoardState,
}

impl Snapshot {
    pub fn new(board: BoardState) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            saved_by: format!("design-board v{}", env!("CARGO_PKG_VERSION")),
            board,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_schema_compatible(&self) -> bool {
        self.schema_version == CURRENT_SCHEMA_VERSION
    }

    /// Read a snapshot (plain JSON or gzip).
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open snapshot {}", path.display()))?
            .read_to_end(&mut bytes)?;

        let snapshot: Snapshot = if bytes.starts_with(&GZIP_MAGIC) {
            serde_json::from_reader(GzDecoder::new(BufReader::new(bytes.as_slice())))?
        } else {
            serde_json::from_slice(&bytes)?
        };

        if !snapshot.is_schema_compatible() {
            bail!(
                "Snapshot {} has schema version {}, expected {}",
                path.display(),
                snapshot.schema_version,
                CURRENT_SCHEMA_VERSION
            );
        }
        Ok(snapshot)
    }

    /// Write the snapshot, creating parent directories as needed.
    ///
    /// The file is written next to the target and renamed into place.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = self.to_json_pretty()?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            if is_gzip_path(path) {
                let mut encoder = GzEncoder::new(file, Compression::default());
                encoder.write_all(json.as_bytes())?;
                encoder.finish()?;
            } else {
                file.write_all(json.as_bytes())?;
            }
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace snapshot {}", path.display()))?;

        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

/// Board state from `path`, or an empty board when the file does not exist.
pub fn load_or_empty(path: &Path) -> Result<BoardState> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot, starting empty");
        return Ok(BoardState::default());
    }
    let board = Snapshot::from_file(path)?.board;
    check_board(&board).with_context(|| format!("Invalid snapshot {}", path.display()))?;
    Ok(board)
}

/// Every task carries valid tokens and belongs to its group, and every
/// group's cached total matches its tasks.
fn check_board(board: &BoardState) -> Result<()> {
    for group in &board.groups {
        for task in &group.tasks {
            if let Err(e) = validate_tokens(task.tokens) {
                bail!("task {} in group {}: {}", task.id, group.id, e);
            }
            if task.parent_id != group.id {
                bail!("task {} is filed under group {} but names {}", task.id, group.id, task.parent_id);
            }
        }
        let recomputed = group.recomputed_total();
        if group.total_tokens != recomputed {
            bail!(
                "group {} total is {} but its tasks sum to {}",
                group.id,
                group.total_tokens,
                recomputed
            );
        }
    }
    Ok(())
}

pub fn save(path: &Path, board: BoardState) -> Result<()> {
    Snapshot::new(board).write_to(path)
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}
