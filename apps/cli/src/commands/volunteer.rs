//! Volunteer roster and verification.

use clap::{Args, Subcommand};

use relief_core::{VolunteerStatus, VolunteerSummary};

use crate::error::ApiResult;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct VolunteerArgs {
    #[command(subcommand)]
    pub command: VolunteerCommand,
}

#[derive(Debug, Subcommand)]
pub enum VolunteerCommand {
    /// Available volunteers first, then busy, then the rest
    List,
    /// Mark a volunteer as verified (admin)
    Verify { id: String },
    /// Withdraw verification (admin)
    Unverify { id: String },
    /// Set availability: available, busy or inactive (admin)
    Status { id: String, status: VolunteerStatus },
}

pub async fn execute(ctx: &AppContext, args: VolunteerArgs) -> ApiResult<()> {
    match args.command {
        VolunteerCommand::List => ctx.out().list(&list(ctx).await?),
        VolunteerCommand::Verify { id } => {
            set_verified(ctx, &id, true).await?;
            ctx.out().message(format!("Volunteer {} verified", id))
        }
        VolunteerCommand::Unverify { id } => {
            set_verified(ctx, &id, false).await?;
            ctx.out().message(format!("Volunteer {} no longer verified", id))
        }
        VolunteerCommand::Status { id, status } => {
            set_status(ctx, &id, status).await?;
            ctx.out().message(format!("Volunteer {} is now {}", id, status))
        }
    }
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<VolunteerSummary>> {
    ctx.require_staff("listing volunteers")?;
    Ok(ctx.db().volunteers().list_ranked().await?)
}

pub async fn set_verified(ctx: &AppContext, id: &str, verified: bool) -> ApiResult<()> {
    ctx.require_admin("verifying volunteers")?;
    ctx.db().volunteers().set_verified(id, verified).await?;
    let action = if verified {
        "verify_volunteer"
    } else {
        "unverify_volunteer"
    };
    ctx.audit(action, "volunteers", Some(id), None).await
}

pub async fn set_status(ctx: &AppContext, id: &str, status: VolunteerStatus) -> ApiResult<()> {
    ctx.require_admin("changing volunteer availability")?;
    ctx.db().volunteers().set_status(id, status).await?;
    ctx.audit(
        "set_volunteer_status",
        "volunteers",
        Some(id),
        Some(serde_json::json!({ "status": status })),
    )
    .await
}
