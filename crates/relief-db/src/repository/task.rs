//! # Task Repository
//!
//! Field work, who is doing it, and the history of every status change.
//!
//! ## Assignment
//! ```text
//! ┌────────────────────────── one transaction ───────────────────────────┐
//! │ task must be unassigned                                              │
//! │ volunteer must exist and be available ── else VolunteerUnavailable   │
//! │                                                                      │
//! │ task       → assigned (volunteer set)                                │
//! │ volunteer  → busy, last_active = now                                 │
//! │ request    → assigned, if linked and still pending                   │
//! │ task_history row                                                     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Volunteer Responses
//! ```text
//! accept   assigned ──► in_progress   (linked request → in_process)
//! decline  assigned ──► unassigned    (volunteer cleared and freed,
//!                                     linked request → pending)
//! finish   in_progress ──► completed  (volunteer freed)
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use relief_core::rules::{check_volunteer_available, ACCEPT_NOTE, DECLINE_NOTE};
use relief_core::validation::{optional_text, validate_name};
use relief_core::{
    AvailableTask, CoreError, NewTask, SosStatus, Task, TaskHistory, TaskStatus, TaskType,
    VolunteerStatus,
};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::sos::{advance_status, release_volunteer};

const TASK_COLUMNS: &str = r#"
    id, title, description, task_type, status, related_request_id, assigned_volunteer_id,
    created_by, location, created_at, updated_at, completed_at
"#;

async fn fetch_task(conn: &mut SqliteConnection, id: &str) -> DbResult<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
    sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Task", id))
}

async fn insert_history(
    conn: &mut SqliteConnection,
    task_id: &str,
    previous: Option<TaskStatus>,
    next: TaskStatus,
    changed_by: Option<&str>,
    note: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO task_history (id, task_id, previous_status, new_status, changed_by, note, changed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new_id())
    .bind(task_id)
    .bind(previous)
    .bind(next)
    .bind(changed_by)
    .bind(optional_text(note))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn set_volunteer_status(
    conn: &mut SqliteConnection,
    volunteer_id: &str,
    status: VolunteerStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE volunteers SET status = ?, last_active = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(volunteer_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TaskRepository { pool }
    }

    /// Creates an unassigned task and its first history row.
    pub async fn create(&self, form: &NewTask) -> DbResult<Task> {
        validate_name("title", &form.title)?;

        let now = Utc::now();
        let task = Task {
            id: new_id(),
            title: form.title.trim().to_string(),
            description: optional_text(form.description.as_deref()),
            task_type: form.task_type.unwrap_or(TaskType::Other),
            status: TaskStatus::Unassigned,
            related_request_id: optional_text(form.related_request_id.as_deref()),
            assigned_volunteer_id: None,
            created_by: form.created_by.clone(),
            location: optional_text(form.location.as_deref()),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut tx = self.pool.begin().await?;

        if let Some(request_id) = task.related_request_id.as_deref() {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sos_requests WHERE id = ?")
                .bind(request_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(DbError::not_found("SOS request", request_id));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, task_type, status, related_request_id,
                               assigned_volunteer_id, created_by, location, created_at, updated_at,
                               completed_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.task_type)
        .bind(task.status)
        .bind(&task.related_request_id)
        .bind(&task.created_by)
        .bind(&task.location)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_history(
            &mut tx,
            &task.id,
            None,
            TaskStatus::Unassigned,
            task.created_by.as_deref(),
            Some("Task created"),
        )
        .await?;

        tx.commit().await?;

        info!(task_id = %task.id, title = %task.title, "Task created");
        Ok(task)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    /// Tasks newest first, optionally in one state.
    pub async fn list(&self, status: Option<TaskStatus>) -> DbResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, rowid DESC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    /// Unassigned tasks, most urgent first. Tasks without a request count
    /// as medium.
    pub async fn list_available(&self) -> DbResult<Vec<AvailableTask>> {
        let tasks = sqlx::query_as::<_, AvailableTask>(
            r#"
            SELECT t.id, t.title, t.description, t.task_type, t.location, t.related_request_id,
                   COALESCE(r.urgency, 'medium') AS urgency, t.created_at
            FROM tasks t
            LEFT JOIN sos_requests r ON r.id = t.related_request_id
            WHERE t.status = 'unassigned'
            ORDER BY
                CASE COALESCE(r.urgency, 'medium')
                    WHEN 'critical' THEN 1
                    WHEN 'high' THEN 2
                    WHEN 'medium' THEN 3
                    ELSE 4
                END,
                t.created_at,
                t.rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = tasks.len(), "Listed available tasks");
        Ok(tasks)
    }

    /// The volunteer's tasks in any of `statuses` (all when empty), newest first.
    pub async fn list_for_volunteer(
        &self,
        volunteer_id: &str,
        statuses: &[TaskStatus],
    ) -> DbResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE assigned_volunteer_id = ? ORDER BY updated_at DESC, rowid DESC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(volunteer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tasks
            .into_iter()
            .filter(|t| statuses.is_empty() || statuses.contains(&t.status))
            .collect())
    }

    /// Hands an unassigned task to an available volunteer.
    pub async fn assign(
        &self,
        task_id: &str,
        volunteer_id: &str,
        assigned_by: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = fetch_task(&mut tx, task_id).await?;
        if !task.status.can_transition_to(TaskStatus::Assigned) {
            return Err(CoreError::transition("Task", task.status, TaskStatus::Assigned).into());
        }

        let volunteer_status: VolunteerStatus =
            sqlx::query_scalar("SELECT status FROM volunteers WHERE id = ?")
                .bind(volunteer_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("Volunteer", volunteer_id))?;
        check_volunteer_available(volunteer_id, volunteer_status)?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                status = 'assigned',
                assigned_volunteer_id = ?1,
                created_by = COALESCE(created_by, ?2),
                updated_at = ?3
            WHERE id = ?4 AND status = 'unassigned'
            "#,
        )
        .bind(volunteer_id)
        .bind(assigned_by)
        .bind(now)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::transition("Task", task.status, TaskStatus::Assigned).into());
        }

        set_volunteer_status(&mut tx, volunteer_id, VolunteerStatus::Busy).await?;

        if let Some(request_id) = task.related_request_id.as_deref() {
            let moved = advance_status(
                &mut tx,
                request_id,
                SosStatus::Pending,
                SosStatus::Assigned,
                Some(volunteer_id),
            )
            .await?;
            debug!(request_id = %request_id, moved, "Linked request follows assignment");
        }

        insert_history(
            &mut tx,
            task_id,
            Some(task.status),
            TaskStatus::Assigned,
            assigned_by,
            note,
        )
        .await?;

        let assigned = fetch_task(&mut tx, task_id).await?;
        tx.commit().await?;

        info!(task_id = %task_id, volunteer_id = %volunteer_id, "Task assigned");
        Ok(assigned)
    }

    /// Moves a task along its lifecycle. When `owner` is given the task
    /// must be assigned to that volunteer.
    ///
    /// Assignment itself goes through [`TaskRepository::assign`].
    pub async fn transition(
        &self,
        task_id: &str,
        next: TaskStatus,
        changed_by: Option<&str>,
        owner: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = fetch_task(&mut tx, task_id).await?;

        if let Some(owner) = owner {
            if task.assigned_volunteer_id.as_deref() != Some(owner) {
                return Err(CoreError::denied(format!("task {} is not assigned to you", task_id)).into());
            }
        }

        if next == TaskStatus::Assigned || !task.status.can_transition_to(next) {
            return Err(CoreError::transition("Task", task.status, next).into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                status = ?1,
                assigned_volunteer_id = CASE WHEN ?1 = 'unassigned' THEN NULL ELSE assigned_volunteer_id END,
                completed_at = CASE WHEN ?1 = 'completed' THEN ?2 ELSE completed_at END,
                updated_at = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(next)
        .bind(now)
        .bind(task_id)
        .bind(task.status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::transition("Task", task.status, next).into());
        }

        if let Some(volunteer_id) = task.assigned_volunteer_id.as_deref() {
            if next.releases_volunteer() {
                set_volunteer_status(&mut tx, volunteer_id, VolunteerStatus::Available).await?;
            }
        }

        if let Some(request_id) = task.related_request_id.as_deref() {
            match (next, task.assigned_volunteer_id.as_deref()) {
                (TaskStatus::InProgress, _) => {
                    advance_status(&mut tx, request_id, SosStatus::Assigned, SosStatus::InProcess, None)
                        .await?;
                }
                (TaskStatus::Unassigned, Some(volunteer_id)) => {
                    let released = release_volunteer(&mut tx, request_id, volunteer_id).await?;
                    debug!(request_id = %request_id, released, "Linked request back in the queue");
                }
                _ => {}
            }
        }

        insert_history(&mut tx, task_id, Some(task.status), next, changed_by, note).await?;

        let updated = fetch_task(&mut tx, task_id).await?;
        tx.commit().await?;

        info!(task_id = %task_id, from = %task.status, to = %next, "Task status changed");
        Ok(updated)
    }

    /// The assigned volunteer starts work.
    pub async fn accept(&self, task_id: &str, volunteer_id: &str) -> DbResult<Task> {
        self.transition(
            task_id,
            TaskStatus::InProgress,
            Some(volunteer_id),
            Some(volunteer_id),
            Some(ACCEPT_NOTE),
        )
        .await
    }

    /// The assigned volunteer hands the task back for someone else.
    pub async fn decline(&self, task_id: &str, volunteer_id: &str) -> DbResult<Task> {
        self.transition(
            task_id,
            TaskStatus::Unassigned,
            Some(volunteer_id),
            Some(volunteer_id),
            Some(DECLINE_NOTE),
        )
        .await
    }

    /// Status changes, oldest first.
    pub async fn history(&self, task_id: &str) -> DbResult<Vec<TaskHistory>> {
        let history = sqlx::query_as::<_, TaskHistory>(
            r#"
            SELECT id, task_id, previous_status, new_status, changed_by, note, changed_at
            FROM task_history
            WHERE task_id = ?
            ORDER BY changed_at, rowid
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, test_db};
    use crate::Database;
    use relief_core::UrgencyLevel;

    async fn task(db: &Database, title: &str, request_id: Option<&str>) -> Task {
        db.tasks()
            .create(&NewTask {
                title: title.to_string(),
                task_type: Some(TaskType::Delivery),
                related_request_id: request_id.map(str::to_string),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    async fn volunteer_status(db: &Database, id: &str) -> VolunteerStatus {
        db.volunteers().get(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let db = test_db().await;
        let created = db
            .tasks()
            .create(&NewTask {
                title: "Survey embankment".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.status, TaskStatus::Unassigned);
        assert_eq!(created.task_type, TaskType::Other);

        let history = db.tasks().history(&created.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_status, None);

        assert!(db
            .tasks()
            .create(&NewTask {
                title: "Orphan".to_string(),
                related_request_id: Some("missing".to_string()),
                ..Default::default()
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_available_ordered_by_request_urgency() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let low = testing::sos(&db, &victim.id, UrgencyLevel::Low).await;
        let critical = testing::sos(&db, &victim.id, UrgencyLevel::Critical).await;

        let t_low = task(&db, "Deliver blankets", Some(&low.id)).await;
        let t_plain = task(&db, "Check generator", None).await;
        let t_critical = task(&db, "Boat rescue", Some(&critical.id)).await;

        let available = db.tasks().list_available().await.unwrap();
        let ids: Vec<_> = available.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![t_critical.id.as_str(), t_plain.id.as_str(), t_low.id.as_str()]);
        assert_eq!(available[1].urgency, UrgencyLevel::Medium);
    }

    #[tokio::test]
    async fn test_assign_marks_volunteer_busy_and_request_assigned() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let victim = testing::victim(&db, "Rahim").await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let request = testing::sos(&db, &victim.id, UrgencyLevel::High).await;
        let created = task(&db, "Boat rescue", Some(&request.id)).await;

        let assigned = db
            .tasks()
            .assign(&created.id, &volunteer.id, Some(&admin.id), Some("Assigned by Admin"))
            .await
            .unwrap();

        assert_eq!(assigned.status, TaskStatus::Assigned);
        assert_eq!(assigned.assigned_volunteer_id.as_deref(), Some(volunteer.id.as_str()));
        assert_eq!(assigned.created_by.as_deref(), Some(admin.id.as_str()));
        assert_eq!(volunteer_status(&db, &volunteer.id).await, VolunteerStatus::Busy);

        let request = db.sos().get(&request.id).await.unwrap().unwrap();
        assert_eq!(request.status, SosStatus::Assigned);
        assert_eq!(request.assigned_volunteer_id.as_deref(), Some(volunteer.id.as_str()));

        let history = db.tasks().history(&created.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].previous_status, Some(TaskStatus::Unassigned));
        assert_eq!(history[1].new_status, TaskStatus::Assigned);
        assert_eq!(history[1].note.as_deref(), Some("Assigned by Admin"));
    }

    #[tokio::test]
    async fn test_busy_volunteer_cannot_be_assigned() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let first = task(&db, "First", None).await;
        let second = task(&db, "Second", None).await;

        db.tasks().assign(&first.id, &volunteer.id, None, None).await.unwrap();

        let err = db
            .tasks()
            .assign(&second.id, &volunteer.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::VolunteerUnavailable { .. })));

        // the failed assignment left the task untouched
        let second = db.tasks().get(&second.id).await.unwrap().unwrap();
        assert_eq!(second.status, TaskStatus::Unassigned);
        assert_eq!(db.tasks().history(&second.id).await.unwrap().len(), 1);

        let err = db
            .tasks()
            .assign(&first.id, &volunteer.id, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task cannot move from assigned to assigned");
    }

    #[tokio::test]
    async fn test_accept_then_complete() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let request = testing::sos(&db, &victim.id, UrgencyLevel::High).await;
        let created = task(&db, "Deliver water", Some(&request.id)).await;
        db.tasks().assign(&created.id, &volunteer.id, None, None).await.unwrap();

        let accepted = db.tasks().accept(&created.id, &volunteer.id).await.unwrap();
        assert_eq!(accepted.status, TaskStatus::InProgress);
        assert_eq!(
            db.sos().get(&request.id).await.unwrap().unwrap().status,
            SosStatus::InProcess
        );

        let done = db
            .tasks()
            .transition(
                &created.id,
                TaskStatus::Completed,
                Some(&volunteer.id),
                Some(&volunteer.id),
                Some("Delivered 40 litres"),
            )
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(volunteer_status(&db, &volunteer.id).await, VolunteerStatus::Available);

        let mine = db
            .tasks()
            .list_for_volunteer(&volunteer.id, &[TaskStatus::Completed])
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert!(db
            .tasks()
            .list_for_volunteer(&volunteer.id, &[TaskStatus::Assigned])
            .await
            .unwrap()
            .is_empty());

        let notes: Vec<_> = db
            .tasks()
            .history(&created.id)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|h| h.note)
            .collect();
        assert!(notes.contains(&ACCEPT_NOTE.to_string()));
    }

    #[tokio::test]
    async fn test_decline_returns_task_to_pool() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let created = task(&db, "Deliver water", None).await;
        db.tasks().assign(&created.id, &volunteer.id, None, None).await.unwrap();

        let declined = db.tasks().decline(&created.id, &volunteer.id).await.unwrap();
        assert_eq!(declined.status, TaskStatus::Unassigned);
        assert!(declined.assigned_volunteer_id.is_none());
        assert_eq!(volunteer_status(&db, &volunteer.id).await, VolunteerStatus::Available);
        assert_eq!(db.tasks().list_available().await.unwrap().len(), 1);

        let last = db.tasks().history(&created.id).await.unwrap().pop().unwrap();
        assert_eq!(last.note.as_deref(), Some(DECLINE_NOTE));
    }

    #[tokio::test]
    async fn test_reassigned_request_follows_new_volunteer() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;
        let ana = testing::volunteer(&db, "Ana").await;
        let ben = testing::volunteer(&db, "Ben").await;
        let request = testing::sos(&db, &victim.id, UrgencyLevel::High).await;
        let created = task(&db, "Boat rescue", Some(&request.id)).await;

        db.tasks().assign(&created.id, &ana.id, None, None).await.unwrap();
        db.tasks().decline(&created.id, &ana.id).await.unwrap();

        let released = db.sos().get(&request.id).await.unwrap().unwrap();
        assert_eq!(released.status, SosStatus::Pending);
        assert!(released.assigned_volunteer_id.is_none());

        db.tasks().assign(&created.id, &ben.id, None, None).await.unwrap();
        let reassigned = db.sos().get(&request.id).await.unwrap().unwrap();
        assert_eq!(reassigned.status, SosStatus::Assigned);
        assert_eq!(reassigned.assigned_volunteer_id.as_deref(), Some(ben.id.as_str()));
    }

    #[tokio::test]
    async fn test_only_owner_can_respond() {
        let db = test_db().await;
        let sara = testing::volunteer(&db, "Sara").await;
        let omar = testing::volunteer(&db, "Omar").await;
        let created = task(&db, "Deliver water", None).await;
        db.tasks().assign(&created.id, &sara.id, None, None).await.unwrap();

        let err = db.tasks().accept(&created.id, &omar.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::PermissionDenied { .. })));

        let err = db
            .tasks()
            .transition(&created.id, TaskStatus::Completed, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task cannot move from assigned to completed");
    }

    #[tokio::test]
    async fn test_cancel_frees_volunteer() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Sara").await;
        let created = task(&db, "Deliver water", None).await;
        db.tasks().assign(&created.id, &volunteer.id, None, None).await.unwrap();

        db.tasks()
            .transition(&created.id, TaskStatus::Cancelled, None, None, Some("Road closed"))
            .await
            .unwrap();
        assert_eq!(volunteer_status(&db, &volunteer.id).await, VolunteerStatus::Available);
        assert_eq!(db.tasks().list(Some(TaskStatus::Cancelled)).await.unwrap().len(), 1);
        assert_eq!(db.tasks().list(None).await.unwrap().len(), 1);
    }
}
