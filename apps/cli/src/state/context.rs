//! # Application Context
//!
//! Database handle, configuration, output mode and the authenticated
//! session, passed by reference to every command handler.

use serde_json::Value;
use tracing::{debug, info};

use relief_core::{Role, Session};
use relief_db::Database;

use crate::error::{ApiError, ApiResult};
use crate::output::Output;
use crate::state::AppConfig;

#[derive(Debug, Clone)]
pub struct AppContext {
    db: Database,
    config: AppConfig,
    output: Output,
    session: Option<Session>,
}

impl AppContext {
    pub fn new(db: Database, config: AppConfig, output: Output) -> Self {
        AppContext {
            db,
            config,
            output,
            session: None,
        }
    }

    /// Context already logged in as `session`.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Checks credentials and keeps the resulting session.
    ///
    /// Volunteers get their `last_active` stamp refreshed.
    pub async fn login(&mut self, email: &str, password: &str) -> ApiResult<&Session> {
        let session = self.db.users().authenticate(email, password).await?;
        if session.role == Role::Volunteer {
            self.db.volunteers().touch(&session.user_id).await?;
        }
        info!(user_id = %session.user_id, role = %session.role, "Session opened");
        Ok(self.session.insert(session))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn out(&self) -> &Output {
        &self.output
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn require_session(&self) -> ApiResult<&Session> {
        self.session.as_ref().ok_or_else(|| {
            ApiError::unauthenticated(
                "log in with --user and --password (or RELIEF_USER / RELIEF_PASSWORD)",
            )
        })
    }

    pub fn require_role(&self, allowed: &[Role], action: &str) -> ApiResult<&Session> {
        let session = self.require_session()?;
        session.require_role(allowed, action)?;
        Ok(session)
    }

    /// Admin or NGO.
    pub fn require_staff(&self, action: &str) -> ApiResult<&Session> {
        self.require_role(&[Role::Admin, Role::Ngo], action)
    }

    pub fn require_admin(&self, action: &str) -> ApiResult<&Session> {
        self.require_role(&[Role::Admin], action)
    }

    pub fn require_resource_manager(&self, action: &str) -> ApiResult<&Session> {
        let session = self.require_session()?;
        session.require_resource_manager(action)?;
        Ok(session)
    }

    /// Writes an audit row attributed to the session's user.
    pub async fn audit(
        &self,
        action: &str,
        target_table: &str,
        target_id: Option<&str>,
        details: Option<Value>,
    ) -> ApiResult<()> {
        let actor = self.session.as_ref().map(|s| s.user_id.as_str());
        self.db
            .audit()
            .record(actor, action, target_table, target_id, details)
            .await?;
        debug!(action, target_table, "Audit recorded");
        Ok(())
    }
}
