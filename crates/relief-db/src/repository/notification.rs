//! # Notification Repository
//!
//! Stored in-app messages. Nothing is actually emailed or texted; the
//! channel is recorded for whoever delivers them later.
//!
//! ## Addressing
//! ```text
//! recipient_user_id = Some(u)            → direct message to u
//! recipient_user_id = None, role = r     → visible to every user with role r
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use relief_core::validation::validate_message;
use relief_core::{
    NewNotification, Notification, NotificationChannel, NotificationStatus, Role,
    ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const NOTIFICATION_COLUMNS: &str = "id, recipient_user_id, recipient_role, channel, message, status, meta, created_at, delivered_at";

/// Inserts one notification on an existing connection.
pub(crate) async fn insert_notification(
    conn: &mut SqliteConnection,
    form: &NewNotification,
    status: NotificationStatus,
) -> DbResult<Notification> {
    validate_message(&form.message)?;
    if form.recipient_user_id.is_none() && form.recipient_role.is_none() {
        return Err(ValidationError::required("recipient").into());
    }

    let now = Utc::now();
    let notification = Notification {
        id: new_id(),
        recipient_user_id: form.recipient_user_id.clone(),
        recipient_role: form.recipient_role,
        channel: form.channel,
        message: form.message.trim().to_string(),
        status,
        meta: form.meta.as_ref().map(|m| m.to_string()),
        created_at: now,
        delivered_at: match status {
            NotificationStatus::Sent | NotificationStatus::Delivered => Some(now),
            _ => None,
        },
    };

    sqlx::query(
        r#"
        INSERT INTO notifications (id, recipient_user_id, recipient_role, channel, message,
                                   status, meta, created_at, delivered_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.recipient_user_id)
    .bind(notification.recipient_role)
    .bind(notification.channel)
    .bind(&notification.message)
    .bind(notification.status)
    .bind(&notification.meta)
    .bind(notification.created_at)
    .bind(notification.delivered_at)
    .execute(&mut *conn)
    .await?;

    debug!(notification_id = %notification.id, "Inserted notification");
    Ok(notification)
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Queues a single notification (status pending).
    pub async fn create(&self, form: &NewNotification) -> DbResult<Notification> {
        let mut conn = self.pool.acquire().await?;
        insert_notification(&mut conn, form, NotificationStatus::Pending).await
    }

    /// One sent notification per user holding `role`. Returns how many were
    /// written; zero means nobody has that role.
    pub async fn broadcast_to_role(
        &self,
        role: Role,
        message: &str,
        channel: NotificationChannel,
    ) -> DbResult<usize> {
        validate_message(message)?;

        let mut tx = self.pool.begin().await?;

        let recipients: Vec<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = ? ORDER BY name")
                .bind(role)
                .fetch_all(&mut *tx)
                .await?;

        for user_id in &recipients {
            let form = NewNotification {
                recipient_user_id: Some(user_id.clone()),
                recipient_role: Some(role),
                channel,
                message: message.to_string(),
                meta: None,
            };
            insert_notification(&mut tx, &form, NotificationStatus::Sent).await?;
        }

        tx.commit().await?;

        info!(role = %role, count = recipients.len(), "Broadcast notification");
        Ok(recipients.len())
    }

    /// Messages addressed to the user directly or to their role, newest first.
    pub async fn list_for_user(&self, user_id: &str, role: Role) -> DbResult<Vec<Notification>> {
        let sql = format!(
            r#"
            SELECT {} FROM notifications
            WHERE recipient_user_id = ?1
               OR (recipient_user_id IS NULL AND recipient_role = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#,
            NOTIFICATION_COLUMNS
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    pub async fn mark_read(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE notifications SET status = ? WHERE id = ?")
            .bind(NotificationStatus::Read)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        Ok(())
    }

    /// Most recent notifications across everyone.
    pub async fn list_all(&self, limit: i64) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications ORDER BY created_at DESC, rowid DESC LIMIT ?",
            NOTIFICATION_COLUMNS
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }
}
