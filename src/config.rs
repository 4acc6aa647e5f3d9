//! Configuration loading and management.

use crate::ledger::DEFAULT_MAX_TOKENS_PER_DAY;
use crate::scheduler::{CapacityRule, CapacityUnit};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default port for the dashboard.
pub const DEFAULT_DASHBOARD_PORT: u16 = 31995;

/// Project-local config file, relative to the working directory.
pub const PROJECT_CONFIG_PATH: &str = ".design-board/config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub board: BoardConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Daily token budget for the admission check.
    #[serde(default = "default_max_tokens_per_day")]
    pub max_tokens_per_day: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_day: default_max_tokens_per_day(),
        }
    }
}

fn default_max_tokens_per_day() -> f64 {
    DEFAULT_MAX_TOKENS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub capacity_unit: CapacityUnit,

    /// Work units per business day.
    #[serde(default = "default_daily_capacity")]
    pub daily_capacity: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity_unit: CapacityUnit::default(),
            daily_capacity: default_daily_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn capacity_rule(&self) -> CapacityRule {
        CapacityRule::new(self.capacity_unit, self.daily_capacity)
    }
}

fn default_daily_capacity() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Calendar days in the timeline window.
    #[serde(default = "default_window_days")]
    pub window_days: usize,

    /// Days of the window that are rendered.
    #[serde(default = "default_visible_days")]
    pub visible_days: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            visible_days: default_visible_days(),
        }
    }
}

fn default_window_days() -> usize {
    30
}

fn default_visible_days() -> usize {
    14
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_ai_delay_ms")]
    pub ai_delay_ms: u64,

    #[serde(default = "default_agent_delay_ms")]
    pub agent_delay_ms: u64,

    /// Upper bound of the random extra delay for agent replies.
    #[serde(default = "default_agent_jitter_ms")]
    pub agent_jitter_ms: u64,

    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ai_delay_ms: default_ai_delay_ms(),
            agent_delay_ms: default_agent_delay_ms(),
            agent_jitter_ms: default_agent_jitter_ms(),
            connect_delay_ms: default_connect_delay_ms(),
        }
    }
}

impl ChatConfig {
    pub fn ai_delay(&self) -> Duration {
        Duration::from_millis(self.ai_delay_ms)
    }

    pub fn agent_delay(&self) -> Duration {
        Duration::from_millis(self.agent_delay_ms)
    }

    pub fn agent_jitter(&self) -> Duration {
        Duration::from_millis(self.agent_jitter_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}

fn default_ai_delay_ms() -> u64 {
    1500
}

fn default_agent_delay_ms() -> u64 {
    2000
}

fn default_agent_jitter_ms() -> u64 {
    2000
}

fn default_connect_delay_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Board snapshot file; `.gz` enables compression.
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(".design-board/board.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
        }
    }
}

fn default_dashboard_port() -> u16 {
    DEFAULT_DASHBOARD_PORT
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve configuration: the explicit path, else the project file, else
    /// the user file, else defaults. Environment overrides apply last.
    ///
    /// An explicit path that cannot be loaded is an error; the discovered
    /// locations are skipped when absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::discover()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn discover() -> Result<Self> {
        let user_config = dirs::home_dir().map(|h| h.join(".design-board").join("config.yaml"));
        let candidates = std::iter::once(PathBuf::from(PROJECT_CONFIG_PATH)).chain(user_config);

        for path in candidates {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Apply `DESIGN_BOARD_*` environment variables. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DESIGN_BOARD_SNAPSHOT") {
            self.snapshot.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("DESIGN_BOARD_MAX_TOKENS_PER_DAY")
            && let Ok(max) = max.parse()
        {
            self.board.max_tokens_per_day = max;
        }

        if let Ok(port) = std::env::var("DESIGN_BOARD_PORT")
            && let Ok(port) = port.parse()
        {
            self.dashboard.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.board.max_tokens_per_day.is_finite() || self.board.max_tokens_per_day < 0.0 {
            bail!(
                "board.max_tokens_per_day must be a non-negative number, got {}",
                self.board.max_tokens_per_day
            );
        }
        if !self.scheduler.daily_capacity.is_finite() || self.scheduler.daily_capacity <= 0.0 {
            bail!(
                "scheduler.daily_capacity must be positive, got {}",
                self.scheduler.daily_capacity
            );
        }
        if self.timeline.visible_days > self.timeline.window_days {
            bail!(
                "timeline.visible_days ({}) exceeds timeline.window_days ({})",
                self.timeline.visible_days,
                self.timeline.window_days
            );
        }
        Ok(())
    }
}
