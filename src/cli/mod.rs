//! CLI command definitions for design-board
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::error::{BoardError, BoardResult};
use crate::format::OutputFormat;
use crate::ledger;
use crate::logging::LogTarget;
use crate::repository::validate_tokens;
use crate::types::{KanbanColumn, Tokens, UserRole};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Role the CLI acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RoleArg {
    /// Client requesting work
    #[default]
    User,
    /// Project agent managing the workflow
    Agent,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => UserRole::User,
            RoleArg::Agent => UserRole::Agent,
        }
    }
}

/// Design service project board
#[derive(Parser, Debug)]
#[command(name = "design-board", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Board snapshot file (overrides config)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Act as a client (user) or a project agent
    #[arg(long, value_enum, default_value = "user", global = true)]
    pub role: RoleArg,

    /// Identity recorded as requester or mover
    #[arg(long, default_value = "local-user", global = true)]
    pub user: String,

    /// Output format: json or markdown
    #[arg(long, default_value = "markdown", global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage task groups
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },

    /// Manage tasks and move them across the board
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Show the kanban board
    Board {
        /// Only this column
        #[arg(long)]
        column: Option<KanbanColumn>,
    },

    /// Show the timeline of approved tasks
    Timeline {
        /// First day of the timeline (default: today)
        #[arg(long)]
        horizon: Option<NaiveDate>,
    },

    /// Convert between minutes and tokens
    Convert(ConvertArgs),

    /// Check whether a task fits the daily token budget
    Admit(AdmitArgs),

    /// List membership plans
    Plans,

    /// Send a message to the project assistant
    Chat {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,

        /// Connect to a human agent before sending
        #[arg(long)]
        agent: bool,
    },

    /// Serve the read-only dashboard
    Serve {
        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create a task group
    Add { title: String },

    /// Delete a group and all of its tasks
    Delete { id: String },

    /// List groups with their tasks
    List,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Request a task in a group
    Add {
        /// Group id
        group: String,
        title: String,
        /// Effort in tokens (multiples of 0.5)
        #[arg(long, default_value_t = 0.0)]
        tokens: f64,
    },

    /// Edit a pending request
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        tokens: Option<f64>,
    },

    /// Delete a task
    Delete { id: String },

    /// Move a task one column forward
    Advance { id: String },

    /// Move a task one column back
    Retreat { id: String },

    /// Move a task to a column
    Move { id: String, column: KanbanColumn },

    /// Send a task back to request
    Submit { id: String },

    /// Set or clear the agent working a task
    Assign {
        id: String,
        /// Agent id; omit to clear
        #[arg(long)]
        agent: Option<String>,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ConvertArgs {
    /// Minutes to convert to tokens
    #[arg(long)]
    pub minutes: Option<f64>,

    /// Tokens to convert to time
    #[arg(long)]
    pub tokens: Option<f64>,
}

impl ConvertArgs {
    /// Token amount to convert. Explicit token input must be a valid estimate.
    pub fn resolve_tokens(&self) -> BoardResult<Tokens> {
        match (self.minutes, self.tokens) {
            (Some(minutes), _) => Ok(ledger::tokens_from_minutes(minutes)),
            (None, Some(tokens)) => validate_tokens(tokens),
            (None, None) => Err(BoardError::missing_field("minutes")
                .with_details("either --minutes or --tokens is required")),
        }
    }
}

#[derive(Args, Debug)]
pub struct AdmitArgs {
    /// Tokens of the candidate task
    #[arg(long)]
    pub tokens: f64,

    /// Day to check (default: the timeline horizon)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// First day of the timeline (default: today)
    #[arg(long)]
    pub horizon: Option<NaiveDate>,

    /// Daily budget (overrides config)
    #[arg(long)]
    pub max: Option<f64>,
}
