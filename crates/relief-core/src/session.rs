//! # Session
//!
//! The authenticated user behind a command, and what they may do.
//!
//! ## Permission Matrix
//! ```text
//! ┌──────────────────────────┬───────┬──────────────┬───────────┬────────┐
//! │ Action                   │ admin │ ngo          │ volunteer │ victim │
//! ├──────────────────────────┼───────┼──────────────┼───────────┼────────┤
//! │ verify NGOs / volunteers │  ✔    │              │           │        │
//! │ manage resources         │  ✔    │ verified +   │           │        │
//! │                          │       │ permission   │           │        │
//! │ create / assign tasks    │  ✔    │  ✔           │           │        │
//! │ accept / update tasks    │       │              │  ✔        │        │
//! │ send SOS, give feedback  │       │              │           │  ✔     │
//! └──────────────────────────┴───────┴──────────────┴───────────┴────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::status::Role;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// NGO accounts only; false for every other role.
    pub ngo_verified: bool,
    /// NGO accounts only; false for every other role.
    pub can_manage_resources: bool,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails unless the session's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role], action: &str) -> CoreResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(CoreError::denied(format!(
                "{} requires role {}",
                action,
                allowed
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(" or ")
            )))
        }
    }

    /// Admins always; NGOs once verified and granted resource permission.
    pub fn require_resource_manager(&self, action: &str) -> CoreResult<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Ngo if !self.ngo_verified => Err(CoreError::NotVerified {
                what: "NGO".to_string(),
            }),
            Role::Ngo if self.can_manage_resources => Ok(()),
            _ => Err(CoreError::denied(format!(
                "{} requires resource management permission",
                action
            ))),
        }
    }
}
