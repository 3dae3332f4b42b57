//! # SOS Repository
//!
//! Emergency requests from victims, their priority and their lifecycle.
//!
//! ## Submission
//! ```text
//! victim submits form
//!      │
//!      ▼
//! validate location / need / description / coordinates
//!      │
//!      ▼
//! ┌──────────────────── one transaction ─────────────────────┐
//! │ INSERT sos_requests (pending, priority_score from urgency)│
//! │ INSERT notifications × 3 (admin, volunteer, ngo)          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Status only moves forward (see [`SosStatus::can_transition_to`]), and
//! every status write is guarded on the status it was read with.

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use relief_core::rules::sos_alert_message;
use relief_core::validation::{validate_coordinates, validate_required};
use relief_core::{
    CoreError, NewNotification, NewSosRequest, NotificationChannel, NotificationStatus, Role,
    SosRequest, SosRequestView, SosStatus, UrgencyLevel, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::notification::insert_notification;

const SOS_COLUMNS: &str = r#"
    id, victim_id, location, latitude, longitude, type_of_need, description, urgency,
    status, priority_score, assigned_volunteer_id, assigned_ngo_id, created_at, updated_at
"#;

const VIEW_SELECT: &str = r#"
    SELECT r.id, r.victim_id, u.name AS victim_name, r.location, r.type_of_need,
           r.description, r.urgency, r.status, r.priority_score,
           vu.name AS volunteer_name, n.org_name AS ngo_name, r.created_at
    FROM sos_requests r
    JOIN users u ON u.id = r.victim_id
    LEFT JOIN users vu ON vu.id = r.assigned_volunteer_id
    LEFT JOIN ngos n ON n.id = r.assigned_ngo_id
"#;

/// Roles alerted when a request comes in.
const ALERTED_ROLES: [Role; 3] = [Role::Admin, Role::Volunteer, Role::Ngo];

/// Moves a request from `from` to `to` on an existing connection. Returns
/// false when the request was not in `from` (nothing is written).
pub(crate) async fn advance_status(
    conn: &mut SqliteConnection,
    request_id: &str,
    from: SosStatus,
    to: SosStatus,
    volunteer_id: Option<&str>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sos_requests SET
            status = ?1,
            assigned_volunteer_id = COALESCE(?2, assigned_volunteer_id),
            updated_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(to)
    .bind(volunteer_id)
    .bind(Utc::now())
    .bind(request_id)
    .bind(from)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Puts an assigned request back in the queue when the volunteer holding it
/// lets it go. Requests already picked up elsewhere are left alone.
pub(crate) async fn release_volunteer(
    conn: &mut SqliteConnection,
    request_id: &str,
    volunteer_id: &str,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sos_requests SET
            status = 'pending',
            assigned_volunteer_id = NULL,
            updated_at = ?1
        WHERE id = ?2 AND status = 'assigned' AND assigned_volunteer_id = ?3
        "#,
    )
    .bind(Utc::now())
    .bind(request_id)
    .bind(volunteer_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct SosRepository {
    pool: SqlitePool,
}

impl SosRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SosRepository { pool }
    }

    /// Records a new request and alerts coordinators, volunteers and NGOs.
    pub async fn submit(&self, victim_id: &str, form: &NewSosRequest) -> DbResult<SosRequest> {
        let location = validate_required("location", &form.location)?;
        let type_of_need = validate_required("type_of_need", &form.type_of_need)?;
        let description = validate_required("description", &form.description)?;
        validate_coordinates(form.latitude, form.longitude)?;

        let urgency = form.urgency.unwrap_or_default();
        let now = Utc::now();
        let request = SosRequest {
            id: new_id(),
            victim_id: victim_id.to_string(),
            location: location.to_string(),
            latitude: form.latitude,
            longitude: form.longitude,
            type_of_need: type_of_need.to_string(),
            description: description.to_string(),
            urgency,
            status: SosStatus::Pending,
            priority_score: urgency.priority_score(),
            assigned_volunteer_id: None,
            assigned_ngo_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let is_victim: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(victim_id)
            .fetch_optional(&mut *tx)
            .await?;
        match is_victim {
            None => return Err(DbError::not_found("Victim", victim_id)),
            Some(Role::Victim) => {}
            Some(_) => return Err(CoreError::denied("sending an SOS requires role victim").into()),
        }

        sqlx::query(
            r#"
            INSERT INTO sos_requests (id, victim_id, location, latitude, longitude, type_of_need,
                                      description, urgency, status, priority_score,
                                      assigned_volunteer_id, assigned_ngo_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.victim_id)
        .bind(&request.location)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(&request.type_of_need)
        .bind(&request.description)
        .bind(request.urgency)
        .bind(request.status)
        .bind(request.priority_score)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await?;

        let message = sos_alert_message(
            &request.id,
            &request.type_of_need,
            &request.location,
            request.urgency,
        );
        for role in ALERTED_ROLES {
            let alert = NewNotification {
                recipient_user_id: None,
                recipient_role: Some(role),
                channel: NotificationChannel::InApp,
                message: message.clone(),
                meta: Some(json!({ "request_id": request.id })),
            };
            insert_notification(&mut tx, &alert, NotificationStatus::Sent).await?;
        }

        tx.commit().await?;

        info!(
            request_id = %request.id,
            urgency = %request.urgency,
            need = %request.type_of_need,
            "SOS request submitted"
        );
        Ok(request)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<SosRequest>> {
        let sql = format!("SELECT {} FROM sos_requests WHERE id = ?", SOS_COLUMNS);
        let request = sqlx::query_as::<_, SosRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    pub async fn get_view(&self, id: &str) -> DbResult<Option<SosRequestView>> {
        let sql = format!("{} WHERE r.id = ?", VIEW_SELECT);
        let view = sqlx::query_as::<_, SosRequestView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(view)
    }

    /// Requests newest first, optionally only one victim's.
    pub async fn list_views(&self, victim_id: Option<&str>) -> DbResult<Vec<SosRequestView>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR r.victim_id = ?1) ORDER BY r.created_at DESC, r.rowid DESC",
            VIEW_SELECT
        );
        let views = sqlx::query_as::<_, SosRequestView>(&sql)
            .bind(victim_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(views)
    }

    /// Pending requests, critical first, oldest first within a level.
    pub async fn list_pending_by_priority(&self) -> DbResult<Vec<SosRequestView>> {
        let sql = format!(
            r#"
            {} WHERE r.status = 'pending'
            ORDER BY
                CASE r.urgency
                    WHEN 'critical' THEN 1
                    WHEN 'high' THEN 2
                    WHEN 'medium' THEN 3
                    ELSE 4
                END,
                r.created_at,
                r.rowid
            "#,
            VIEW_SELECT
        );
        let views = sqlx::query_as::<_, SosRequestView>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = views.len(), "Listed pending requests");
        Ok(views)
    }

    /// Re-prioritizes an open request.
    pub async fn set_urgency(&self, id: &str, urgency: UrgencyLevel) -> DbResult<SosRequest> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))?;

        if current.status.is_terminal() {
            return Err(CoreError::transition("SOS request", current.status, current.status).into());
        }

        sqlx::query(
            "UPDATE sos_requests SET urgency = ?, priority_score = ?, updated_at = ? WHERE id = ?",
        )
        .bind(urgency)
        .bind(urgency.priority_score())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!(request_id = %id, urgency = %urgency, "SOS urgency changed");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))
    }

    /// Moves a request forward (or cancels it).
    pub async fn set_status(&self, id: &str, status: SosStatus) -> DbResult<SosRequest> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))?;

        if !current.status.can_transition_to(status) {
            return Err(CoreError::transition("SOS request", current.status, status).into());
        }

        let mut conn = self.pool.acquire().await?;
        if !advance_status(&mut conn, id, current.status, status, None).await? {
            return Err(CoreError::transition("SOS request", current.status, status).into());
        }
        drop(conn);

        info!(request_id = %id, from = %current.status, to = %status, "SOS status changed");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))
    }

    /// Assigns a volunteer and/or an NGO. Pending requests become assigned;
    /// already-assigned requests can be reassigned.
    pub async fn assign(
        &self,
        id: &str,
        volunteer_id: Option<&str>,
        ngo_id: Option<&str>,
    ) -> DbResult<SosRequest> {
        if volunteer_id.is_none() && ngo_id.is_none() {
            return Err(ValidationError::required("volunteer or ngo").into());
        }

        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))?;

        if !matches!(current.status, SosStatus::Pending | SosStatus::Assigned) {
            return Err(
                CoreError::transition("SOS request", current.status, SosStatus::Assigned).into(),
            );
        }

        let result = sqlx::query(
            r#"
            UPDATE sos_requests SET
                status = 'assigned',
                assigned_volunteer_id = COALESCE(?1, assigned_volunteer_id),
                assigned_ngo_id = COALESCE(?2, assigned_ngo_id),
                updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(volunteer_id)
        .bind(ngo_id)
        .bind(Utc::now())
        .bind(id)
        .bind(current.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(
                CoreError::transition("SOS request", current.status, SosStatus::Assigned).into(),
            );
        }

        info!(request_id = %id, ?volunteer_id, ?ngo_id, "SOS request assigned");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SOS request", id))
    }

    /// The victim's requests that are far enough along to rate and have
    /// not been rated yet, newest first.
    pub async fn feedback_eligible(&self, victim_id: &str) -> DbResult<Vec<SosRequestView>> {
        let sql = format!(
            r#"
            {} WHERE r.victim_id = ?
              AND r.status IN ('assigned', 'in_process', 'delivered', 'completed')
              AND NOT EXISTS (SELECT 1 FROM feedback f WHERE f.request_id = r.id)
            ORDER BY r.created_at DESC, r.rowid DESC
            "#,
            VIEW_SELECT
        );
        let views = sqlx::query_as::<_, SosRequestView>(&sql)
            .bind(victim_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, flood_request, test_db};

    #[tokio::test]
    async fn test_submit_alerts_three_roles() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;

        let request = db
            .sos()
            .submit(&victim.id, &flood_request(UrgencyLevel::High))
            .await
            .unwrap();

        assert_eq!(request.status, SosStatus::Pending);
        assert_eq!(request.priority_score, 75);

        let alerts = db.notifications().list_all(10).await.unwrap();
        assert_eq!(alerts.len(), 3);
        for alert in &alerts {
            assert!(alert.recipient_user_id.is_none());
            assert_eq!(alert.status, NotificationStatus::Sent);
            assert!(alert.message.starts_with(&format!("NEW SOS REQUEST #{}", request.id)));
            assert!(alert.message.ends_with("Urgency: high"));
            assert!(alert.meta.as_deref().unwrap().contains(&request.id));
        }
        let mut roles: Vec<_> = alerts.iter().filter_map(|a| a.recipient_role).collect();
        roles.sort_by_key(|r| r.as_str());
        assert_eq!(roles, vec![Role::Admin, Role::Ngo, Role::Volunteer]);
    }

    #[tokio::test]
    async fn test_submit_validates_and_defaults_urgency() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;

        let mut form = flood_request(UrgencyLevel::Low);
        form.description = "  ".to_string();
        let err = db.sos().submit(&victim.id, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: description is required");

        let mut form = flood_request(UrgencyLevel::Low);
        form.latitude = Some(123.0);
        assert!(db.sos().submit(&victim.id, &form).await.is_err());

        let mut form = flood_request(UrgencyLevel::Low);
        form.urgency = None;
        let request = db.sos().submit(&victim.id, &form).await.unwrap();
        assert_eq!(request.urgency, UrgencyLevel::Low);
        assert_eq!(request.priority_score, 25);

        // nothing from the rejected forms was kept
        assert_eq!(db.sos().list_views(None).await.unwrap().len(), 1);
        assert_eq!(db.notifications().list_all(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_only_victims_submit() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Sara").await;

        let err = db
            .sos()
            .submit(&volunteer.id, &flood_request(UrgencyLevel::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_pending_sorted_by_urgency_then_age() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;

        let low = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::Low)).await.unwrap();
        let high_1 = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::High)).await.unwrap();
        let critical = db
            .sos()
            .submit(&victim.id, &flood_request(UrgencyLevel::Critical))
            .await
            .unwrap();
        let high_2 = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::High)).await.unwrap();
        let done = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::Critical)).await.unwrap();
        db.sos().set_status(&done.id, SosStatus::Cancelled).await.unwrap();

        let ids: Vec<_> = db
            .sos()
            .list_pending_by_priority()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![critical.id, high_1.id, high_2.id, low.id]);
    }

    #[tokio::test]
    async fn test_status_moves_forward_only() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let request = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::Medium)).await.unwrap();

        let updated = db.sos().set_status(&request.id, SosStatus::InProcess).await.unwrap();
        assert_eq!(updated.status, SosStatus::InProcess);

        let err = db.sos().set_status(&request.id, SosStatus::Pending).await.unwrap_err();
        assert_eq!(err.to_string(), "SOS request cannot move from in_process to pending");

        db.sos().set_status(&request.id, SosStatus::Completed).await.unwrap();
        assert!(db.sos().set_status(&request.id, SosStatus::Cancelled).await.is_err());
        assert!(db.sos().set_urgency(&request.id, UrgencyLevel::Critical).await.is_err());
    }

    #[tokio::test]
    async fn test_set_urgency_recomputes_score() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let request = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::Low)).await.unwrap();

        let updated = db.sos().set_urgency(&request.id, UrgencyLevel::Critical).await.unwrap();
        assert_eq!(updated.urgency, UrgencyLevel::Critical);
        assert_eq!(updated.priority_score, 100);
    }

    #[tokio::test]
    async fn test_assign_and_view_names() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let ngo = testing::ngo(&db, "River Aid").await;
        let request = db.sos().submit(&victim.id, &flood_request(UrgencyLevel::High)).await.unwrap();

        assert!(db.sos().assign(&request.id, None, None).await.is_err());

        let assigned = db
            .sos()
            .assign(&request.id, Some(&volunteer.id), None)
            .await
            .unwrap();
        assert_eq!(assigned.status, SosStatus::Assigned);

        db.sos().assign(&request.id, None, Some(&ngo.id)).await.unwrap();

        let view = db.sos().get_view(&request.id).await.unwrap().unwrap();
        assert_eq!(view.victim_name, "Rahim");
        assert_eq!(view.volunteer_name.as_deref(), Some("Sara"));
        assert_eq!(view.ngo_name.as_deref(), Some("River Aid"));
    }

    #[tokio::test]
    async fn test_list_views_filters_by_victim() {
        let db = test_db().await;
        let rahim = testing::victim(&db, "Rahim").await;
        let karim = testing::victim(&db, "Karim").await;
        let first = db.sos().submit(&rahim.id, &flood_request(UrgencyLevel::Low)).await.unwrap();
        let second = db.sos().submit(&rahim.id, &flood_request(UrgencyLevel::Low)).await.unwrap();
        db.sos().submit(&karim.id, &flood_request(UrgencyLevel::Low)).await.unwrap();

        let mine = db.sos().list_views(Some(&rahim.id)).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert_eq!(db.sos().list_views(None).await.unwrap().len(), 3);
    }
}
