//! Victim feedback on handled requests. One per request.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_rating};
use relief_core::{CoreError, Feedback, NewFeedback, SosStatus, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const FEEDBACK_COLUMNS: &str = "id, request_id, victim_id, rating, comments, created_at";

#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeedbackRepository { pool }
    }

    /// Rates one of the victim's own requests once it has been picked up.
    pub async fn submit(&self, victim_id: &str, form: &NewFeedback) -> DbResult<Feedback> {
        validate_rating(form.rating)?;

        let mut tx = self.pool.begin().await?;

        let request: Option<(String, SosStatus)> =
            sqlx::query_as("SELECT victim_id, status FROM sos_requests WHERE id = ?")
                .bind(&form.request_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (owner, status) = request.ok_or_else(|| DbError::not_found("SOS request", &form.request_id))?;

        if owner != victim_id {
            return Err(CoreError::denied("feedback can only be given on your own requests").into());
        }
        if !status.accepts_feedback() {
            return Err(CoreError::denied(format!(
                "feedback is not accepted while the request is {}",
                status
            ))
            .into());
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE request_id = ?")
            .bind(&form.request_id)
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Err(ValidationError::Duplicate {
                field: "feedback for request".to_string(),
                value: form.request_id.clone(),
            }
            .into());
        }

        let feedback = Feedback {
            id: new_id(),
            request_id: form.request_id.clone(),
            victim_id: victim_id.to_string(),
            rating: form.rating,
            comments: optional_text(form.comments.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO feedback (id, request_id, victim_id, rating, comments, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&feedback.id)
        .bind(&feedback.request_id)
        .bind(&feedback.victim_id)
        .bind(feedback.rating)
        .bind(&feedback.comments)
        .bind(feedback.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(request_id = %feedback.request_id, rating = feedback.rating, "Feedback received");
        Ok(feedback)
    }

    pub async fn list_for_request(&self, request_id: &str) -> DbResult<Vec<Feedback>> {
        let sql = format!("SELECT {} FROM feedback WHERE request_id = ?", FEEDBACK_COLUMNS);
        let feedback = sqlx::query_as::<_, Feedback>(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(feedback)
    }

    /// All feedback, newest first.
    pub async fn list(&self) -> DbResult<Vec<Feedback>> {
        let sql = format!(
            "SELECT {} FROM feedback ORDER BY created_at DESC, rowid DESC",
            FEEDBACK_COLUMNS
        );
        let feedback = sqlx::query_as::<_, Feedback>(&sql).fetch_all(&self.pool).await?;
        Ok(feedback)
    }
}
