//! Public warnings for an area. Everyone logged in reads them.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{Alert, AlertFields};

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct AlertArgs {
    #[command(subcommand)]
    pub command: AlertCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertCommand {
    /// Issue an alert (message required)
    Add(AlertForm),
    List,
    Show { id: String },
    Update {
        id: String,
        #[command(flatten)]
        form: AlertForm,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct AlertForm {
    #[arg(long)]
    pub message: Option<String>,
    #[arg(long)]
    pub severity: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
}

impl From<AlertForm> for AlertFields {
    fn from(form: AlertForm) -> Self {
        AlertFields {
            message: form.message,
            severity: form.severity,
            location: form.location,
        }
    }
}

pub async fn execute(ctx: &AppContext, args: AlertArgs) -> ApiResult<()> {
    match args.command {
        AlertCommand::Add(form) => {
            let alert = create(ctx, form.into()).await?;
            ctx.out().record(&alert, format!("Alert {} issued", alert.id))
        }
        AlertCommand::List => ctx.out().list(&list(ctx).await?),
        AlertCommand::Show { id } => {
            let alert = show(ctx, &id).await?;
            let text = alert.message.clone();
            ctx.out().record(&alert, text)
        }
        AlertCommand::Update { id, form } => {
            let alert = update(ctx, &id, form.into()).await?;
            ctx.out().record(&alert, format!("Alert {} updated", alert.id))
        }
        AlertCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Alert {} withdrawn", id))
        }
    }
}

pub async fn create(ctx: &AppContext, fields: AlertFields) -> ApiResult<Alert> {
    ctx.require_staff("issuing alerts")?;
    let alert = ctx.db().alerts().create(&fields).await?;
    ctx.audit(
        "issue_alert",
        "alerts",
        Some(&alert.id),
        Some(json!({ "severity": alert.severity, "location": alert.location })),
    )
    .await?;
    Ok(alert)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<Alert>> {
    ctx.require_session()?;
    Ok(ctx.db().alerts().list().await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<Alert> {
    ctx.require_session()?;
    ctx.db()
        .alerts()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert", id))
}

pub async fn update(ctx: &AppContext, id: &str, fields: AlertFields) -> ApiResult<Alert> {
    ctx.require_staff("editing alerts")?;
    let alert = ctx.db().alerts().update(id, &fields).await?;
    ctx.audit("update_alert", "alerts", Some(id), Some(json!(fields)))
        .await?;
    Ok(alert)
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("withdrawing alerts")?;
    ctx.db().alerts().delete(id).await?;
    ctx.audit("delete_alert", "alerts", Some(id), None).await
}
