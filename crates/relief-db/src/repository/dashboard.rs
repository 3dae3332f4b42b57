//! Coordination dashboard counters, computed in a single query.

use chrono::Utc;
use sqlx::SqlitePool;

use relief_core::DashboardStats;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// "Today" is the current UTC date.
    pub async fn stats(&self) -> DbResult<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM volunteers) AS total_volunteers,
                (SELECT COUNT(*) FROM volunteers WHERE status = 'available') AS available_volunteers,
                (SELECT COUNT(*) FROM tasks) AS total_tasks,
                (SELECT COUNT(*) FROM tasks WHERE status = 'unassigned') AS unassigned_tasks,
                (SELECT COUNT(*) FROM tasks WHERE status = 'in_progress') AS in_progress_tasks,
                (SELECT COUNT(*) FROM tasks WHERE status = 'completed') AS completed_tasks,
                (SELECT COUNT(*) FROM tasks
                    WHERE status = 'completed' AND date(completed_at) = date(?1)) AS tasks_completed_today,
                (SELECT COUNT(*) FROM sos_requests
                    WHERE status IN ('assigned', 'in_process')) AS active_sos,
                (SELECT COUNT(*) FROM sos_requests WHERE status = 'pending') AS pending_sos,
                (SELECT COALESCE(SUM(quantity), 0) FROM resource_stock
                    WHERE status IN ('available', 'low')) AS available_stock_units
            "#,
        )
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}
