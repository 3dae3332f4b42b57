//! # Report Commands
//!
//! CSV exports of the main listings. Each export is recorded in the
//! `reports` table with the parameters it was generated with.
//!
//! ```text
//! volunteers | ngos | victims → ID, Name, Email, Phone, Location
//! resources                   → stock rows with type and owner
//! requests                    → SOS requests with victim and assignees
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;

use relief_core::{NewReport, Report, ReportKind};

use crate::error::{ApiError, ApiResult};
use crate::output::{opt, time};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Export a listing to CSV (admin)
    Generate {
        /// volunteers, ngos, victims, resources or requests
        #[arg(long)]
        kind: ReportKind,
        /// Output file; defaults to the report directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Reports generated so far (admin)
    List,
}

pub async fn execute(ctx: &AppContext, args: ReportArgs) -> ApiResult<()> {
    match args.command {
        ReportCommand::Generate { kind, out } => {
            let report = generate(ctx, kind, out).await?;
            ctx.out().record(
                &report,
                format!(
                    "Report saved to {}",
                    report.file_path.as_deref().unwrap_or("-")
                ),
            )
        }
        ReportCommand::List => ctx.out().list(&list(ctx).await?),
    }
}

/// Header and rows for one report kind.
async fn collect(ctx: &AppContext, kind: ReportKind) -> ApiResult<(Vec<&'static str>, Vec<Vec<String>>)> {
    if let Some(role) = kind.user_role() {
        let rows = ctx
            .db()
            .users()
            .list_by_role(role)
            .await?
            .into_iter()
            .map(|u| vec![u.id, u.name, u.email, opt(&u.phone), opt(&u.location)])
            .collect();
        return Ok((vec!["ID", "Name", "Email", "Phone", "Location"], rows));
    }

    match kind {
        ReportKind::Resources => {
            let rows = ctx
                .db()
                .resources()
                .list_views(None)
                .await?
                .into_iter()
                .map(|s| {
                    vec![
                        s.id.clone(),
                        s.type_name.clone(),
                        s.quantity.to_string(),
                        s.unit.clone(),
                        opt(&s.location),
                        opt(&s.owner_name),
                        s.status.to_string(),
                        time(&s.updated_at),
                    ]
                })
                .collect();
            Ok((
                vec!["ID", "Type", "Quantity", "Unit", "Location", "Owner", "Status", "Updated"],
                rows,
            ))
        }
        _ => {
            let rows = ctx
                .db()
                .sos()
                .list_views(None)
                .await?
                .into_iter()
                .map(|r| {
                    vec![
                        r.id.clone(),
                        r.victim_name.clone(),
                        r.type_of_need.clone(),
                        r.location.clone(),
                        r.urgency.to_string(),
                        r.status.to_string(),
                        opt(&r.volunteer_name),
                        opt(&r.ngo_name),
                        time(&r.created_at),
                    ]
                })
                .collect();
            Ok((
                vec![
                    "ID", "Victim", "Need", "Location", "Urgency", "Status", "Volunteer", "NGO",
                    "Created",
                ],
                rows,
            ))
        }
    }
}

fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> ApiResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn generate(ctx: &AppContext, kind: ReportKind, out: Option<PathBuf>) -> ApiResult<Report> {
    let session = ctx.require_admin("generating reports")?;

    let (headers, rows) = collect(ctx, kind).await?;
    if rows.is_empty() {
        return Err(ApiError::validation(format!("No {} data to export", kind)));
    }

    let path = out.unwrap_or_else(|| {
        ctx.config()
            .report_dir
            .join(format!("{}_{}.csv", kind, Utc::now().format("%Y%m%d_%H%M%S")))
    });
    write_csv(&path, &headers, &rows)?;

    let file_path = path.display().to_string();
    let report = ctx
        .db()
        .reports()
        .record(&NewReport {
            report_type: kind,
            parameters: Some(json!({ "rows": rows.len() })),
            generated_by: Some(session.user_id.clone()),
            file_path: Some(file_path.clone()),
        })
        .await?;

    ctx.audit(
        "generate_report",
        "reports",
        Some(&report.id),
        Some(json!({ "kind": kind, "file": file_path })),
    )
    .await?;
    info!(kind = %kind, rows = rows.len(), path = %file_path, "Report generated");
    Ok(report)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<Report>> {
    ctx.require_admin("listing reports")?;
    Ok(ctx.db().reports().list().await?)
}
