//! Coordination dashboard counters.

use relief_core::DashboardStats;

use crate::error::ApiResult;
use crate::state::AppContext;

pub async fn execute(ctx: &AppContext) -> ApiResult<()> {
    let stats = stats(ctx).await?;
    ctx.out().detail(
        &stats,
        &[
            (
                "volunteers",
                format!("{} ({} available)", stats.total_volunteers, stats.available_volunteers),
            ),
            ("pending SOS", stats.pending_sos.to_string()),
            ("active SOS", stats.active_sos.to_string()),
            (
                "tasks",
                format!(
                    "{} ({} unassigned, {} in progress, {} completed)",
                    stats.total_tasks,
                    stats.unassigned_tasks,
                    stats.in_progress_tasks,
                    stats.completed_tasks
                ),
            ),
            ("completed today", stats.tasks_completed_today.to_string()),
            ("stock units", stats.available_stock_units.to_string()),
        ],
    )
}

pub async fn stats(ctx: &AppContext) -> ApiResult<DashboardStats> {
    ctx.require_staff("viewing the dashboard")?;
    Ok(ctx.db().dashboard().stats().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, test_db};

    #[tokio::test]
    async fn test_dashboard_counts_volunteers() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "River Aid", false).await;
        testing::volunteer(&db, "Sara").await;
        testing::volunteer(&db, "Omar").await;

        let counts = stats(&ngo).await.unwrap();
        assert_eq!(counts.total_volunteers, 2);
        assert_eq!(counts.available_volunteers, 2);
        assert_eq!(counts.pending_sos, 0);

        let victim = testing::victim(&db, "Rahim").await;
        assert!(stats(&victim).await.is_err());
    }
}
