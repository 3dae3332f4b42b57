//! Public warnings for an area.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_message};
use relief_core::{Alert, AlertFields, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

impl AlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AlertRepository { pool }
    }

    pub async fn create(&self, fields: &AlertFields) -> DbResult<Alert> {
        let message = fields
            .message
            .as_deref()
            .ok_or_else(|| ValidationError::required("message"))?;
        validate_message(message)?;

        let alert = Alert {
            id: new_id(),
            message: message.trim().to_string(),
            severity: optional_text(fields.severity.as_deref()),
            location: optional_text(fields.location.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO alerts (id, message, severity, location, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&alert.id)
        .bind(&alert.message)
        .bind(&alert.severity)
        .bind(&alert.location)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await?;

        info!(alert_id = %alert.id, "Alert issued");
        Ok(alert)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>(
            "SELECT id, message, severity, location, created_at FROM alerts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(alert)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Alert>> {
        let alerts = sqlx::query_as::<_, Alert>(
            "SELECT id, message, severity, location, created_at FROM alerts ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    pub async fn update(&self, id: &str, fields: &AlertFields) -> DbResult<Alert> {
        if let Some(message) = fields.message.as_deref() {
            validate_message(message)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE alerts SET
                message = COALESCE(?, message),
                severity = COALESCE(?, severity),
                location = COALESCE(?, location)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.message.as_deref()))
        .bind(optional_text(fields.severity.as_deref()))
        .bind(optional_text(fields.location.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Alert", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::test_db;

    #[tokio::test]
    async fn test_alert_crud() {
        let db = test_db().await;

        assert!(db.alerts().create(&AlertFields::default()).await.is_err());

        let alert = db
            .alerts()
            .create(&AlertFields {
                message: Some("River above danger level at Kanaighat".to_string()),
                severity: Some("high".to_string()),
                location: Some("Kanaighat".to_string()),
            })
            .await
            .unwrap();

        let updated = db
            .alerts()
            .update(
                &alert.id,
                &AlertFields {
                    severity: Some("critical".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.severity.as_deref(), Some("critical"));
        assert_eq!(updated.message, alert.message);

        assert_eq!(db.alerts().list().await.unwrap().len(), 1);
        db.alerts().delete(&alert.id).await.unwrap();
        assert!(matches!(db.alerts().delete(&alert.id).await, Err(DbError::NotFound { .. })));
    }
}
