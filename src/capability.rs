//! Capabilities granted by a principal's role.
//!
//! Clients (role `user`) request work: they create groups and tasks, edit
//! their own requests, delete them and resubmit them. Agents manage the
//! workflow: they move tasks between columns.

use crate::error::{BoardError, BoardResult};
use crate::types::{User, UserRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RequestWork,
    ManageWorkflow,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RequestWork => "request_work",
            Capability::ManageWorkflow => "manage_workflow",
        }
    }
}

/// The acting identity behind a board operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: UserRole,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, UserRole::User)
    }

    pub fn agent(id: impl Into<String>) -> Self {
        Self::new(id, UserRole::Agent)
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.id.clone(), user.role)
    }

    pub fn has(&self, capability: Capability) -> bool {
        matches!(
            (self.role, capability),
            (UserRole::User, Capability::RequestWork) | (UserRole::Agent, Capability::ManageWorkflow)
        )
    }

    /// Reject with `Unauthorized` unless the principal holds the capability.
    pub fn require(&self, capability: Capability, action: &str) -> BoardResult<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(BoardError::unauthorized(&self.id, action).with_details(format!(
                "requires {} capability",
                capability.as_str()
            )))
        }
    }
}
