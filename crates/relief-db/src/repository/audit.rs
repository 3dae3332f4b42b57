//! Append-only trail of privileged actions.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use relief_core::AuditLog;

use crate::error::DbResult;
use crate::repository::new_id;

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    pub async fn record(
        &self,
        actor_user_id: Option<&str>,
        action: &str,
        target_table: &str,
        target_id: Option<&str>,
        details: Option<serde_json::Value>,
    ) -> DbResult<AuditLog> {
        let entry = AuditLog {
            id: new_id(),
            actor_user_id: actor_user_id.map(str::to_string),
            action: action.to_string(),
            target_table: target_table.to_string(),
            target_id: target_id.map(str::to_string),
            details: details.map(|d| d.to_string()),
            logged_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor_user_id, action, target_table, target_id, details, logged_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.actor_user_id)
        .bind(&entry.action)
        .bind(&entry.target_table)
        .bind(&entry.target_id)
        .bind(&entry.details)
        .bind(entry.logged_at)
        .execute(&self.pool)
        .await?;

        debug!(action = %entry.action, table = %entry.target_table, "Audit entry recorded");
        Ok(entry)
    }

    /// Newest entries first.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, actor_user_id, action, target_table, target_id, details, logged_at
            FROM audit_logs
            ORDER BY logged_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
