//! Design Board Library
//!
//! Token ledger, kanban workflow and timeline scheduling for a design-service
//! project board, plus the chat, identity and membership collaborators.

pub mod capability;
pub mod chat;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod membership;
pub mod repository;
pub mod scheduler;
pub mod snapshot;
pub mod types;
pub mod workflow;
