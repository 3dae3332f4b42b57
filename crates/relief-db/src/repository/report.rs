//! Register of generated report files.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::{NewReport, Report};

use crate::error::DbResult;
use crate::repository::new_id;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    pub async fn record(&self, form: &NewReport) -> DbResult<Report> {
        let report = Report {
            id: new_id(),
            report_type: form.report_type,
            parameters: form.parameters.as_ref().map(|p| p.to_string()),
            generated_by: form.generated_by.clone(),
            generated_at: Utc::now(),
            file_path: form.file_path.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO reports (id, report_type, parameters, generated_by, generated_at, file_path)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.id)
        .bind(report.report_type)
        .bind(&report.parameters)
        .bind(&report.generated_by)
        .bind(report.generated_at)
        .bind(&report.file_path)
        .execute(&self.pool)
        .await?;

        info!(report_id = %report.id, kind = %report.report_type, "Report recorded");
        Ok(report)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, report_type, parameters, generated_by, generated_at, file_path
            FROM reports
            ORDER BY generated_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, test_db};
    use relief_core::ReportKind;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;

        let report = db
            .reports()
            .record(&NewReport {
                report_type: ReportKind::Volunteers,
                parameters: Some(serde_json::json!({ "format": "csv" })),
                generated_by: Some(admin.id.clone()),
                file_path: Some("reports/volunteers.csv".to_string()),
            })
            .await
            .unwrap();

        let listed = db.reports().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, report.id);
        assert_eq!(listed[0].report_type, ReportKind::Volunteers);
        assert_eq!(listed[0].parameters.as_deref(), Some(r#"{"format":"csv"}"#));
    }
}
