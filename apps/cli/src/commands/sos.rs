//! # SOS Commands
//!
//! ```text
//! victim:  sos send ──► pending ──► (staff) assign ──► assigned
//!                                                      │
//!          sos track ◄── status changes ◄──────────────┘
//! staff:   sos pending (critical first), sos prioritize, sos status
//! ```

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{NewSosRequest, Role, SosRequest, SosRequestView, SosStatus, UrgencyLevel};

use crate::error::{ApiError, ApiResult};
use crate::output::{opt, time};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct SosArgs {
    #[command(subcommand)]
    pub command: SosCommand,
}

#[derive(Debug, Subcommand)]
pub enum SosCommand {
    /// Send an emergency request (victim)
    Send(SendArgs),
    /// Follow requests; victims see their own
    Track {
        /// Show a single request
        #[arg(long)]
        id: Option<String>,
    },
    /// Pending requests, most urgent first (admin/NGO)
    Pending,
    /// Change a request's urgency (admin)
    Prioritize { id: String, urgency: UrgencyLevel },
    /// Move a request forward, or cancel it (admin/NGO)
    Status { id: String, status: SosStatus },
    /// Put a volunteer and/or NGO on a request (admin/NGO)
    Assign {
        id: String,
        #[arg(long)]
        volunteer: Option<String>,
        #[arg(long)]
        ngo: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SendArgs {
    #[arg(long)]
    pub location: String,
    /// What is needed: rescue, food, water, medical...
    #[arg(long)]
    pub need: String,
    #[arg(long)]
    pub description: String,
    /// low, medium, high or critical (default low)
    #[arg(long)]
    pub urgency: Option<UrgencyLevel>,
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,
}

pub async fn execute(ctx: &AppContext, args: SosArgs) -> ApiResult<()> {
    match args.command {
        SosCommand::Send(send_args) => {
            let request = send(ctx, send_args).await?;
            ctx.out().record(
                &request,
                format!(
                    "SOS request {} sent ({} urgency). Coordinators have been alerted.",
                    request.id, request.urgency
                ),
            )
        }
        SosCommand::Track { id: Some(id) } => {
            let view = track_one(ctx, &id).await?;
            ctx.out().detail(
                &view,
                &[
                    ("id", view.id.clone()),
                    ("victim", view.victim_name.clone()),
                    ("need", view.type_of_need.clone()),
                    ("location", view.location.clone()),
                    ("description", view.description.clone()),
                    ("urgency", view.urgency.to_string()),
                    ("status", view.status.to_string()),
                    ("volunteer", opt(&view.volunteer_name)),
                    ("NGO", opt(&view.ngo_name)),
                    ("sent", time(&view.created_at)),
                ],
            )
        }
        SosCommand::Track { id: None } => ctx.out().list(&track(ctx).await?),
        SosCommand::Pending => ctx.out().list(&pending(ctx).await?),
        SosCommand::Prioritize { id, urgency } => {
            let request = prioritize(ctx, &id, urgency).await?;
            ctx.out().record(
                &request,
                format!("Request {} is now {} urgency", request.id, request.urgency),
            )
        }
        SosCommand::Status { id, status } => {
            let request = set_status(ctx, &id, status).await?;
            ctx.out()
                .record(&request, format!("Request {} is now {}", request.id, request.status))
        }
        SosCommand::Assign { id, volunteer, ngo } => {
            let view = assign(ctx, &id, volunteer.as_deref(), ngo.as_deref()).await?;
            ctx.out().record(
                &view,
                format!(
                    "Request {} assigned (volunteer: {}, NGO: {})",
                    view.id,
                    opt(&view.volunteer_name),
                    opt(&view.ngo_name)
                ),
            )
        }
    }
}

pub async fn send(ctx: &AppContext, args: SendArgs) -> ApiResult<SosRequest> {
    let session = ctx.require_role(&[Role::Victim], "sending an SOS")?;
    let form = NewSosRequest {
        location: args.location,
        latitude: args.latitude,
        longitude: args.longitude,
        type_of_need: args.need,
        description: args.description,
        urgency: args.urgency,
    };
    Ok(ctx.db().sos().submit(&session.user_id, &form).await?)
}

/// Victims get their own requests; everyone else gets all of them.
pub async fn track(ctx: &AppContext) -> ApiResult<Vec<SosRequestView>> {
    let session = ctx.require_session()?;
    let victim = (session.role == Role::Victim).then_some(session.user_id.as_str());
    Ok(ctx.db().sos().list_views(victim).await?)
}

pub async fn track_one(ctx: &AppContext, id: &str) -> ApiResult<SosRequestView> {
    let session = ctx.require_session()?;
    let view = ctx
        .db()
        .sos()
        .get_view(id)
        .await?
        .ok_or_else(|| ApiError::not_found("SOS request", id))?;
    // Another victim's request is reported as missing.
    if session.role == Role::Victim && view.victim_id != session.user_id {
        return Err(ApiError::not_found("SOS request", id));
    }
    Ok(view)
}

pub async fn pending(ctx: &AppContext) -> ApiResult<Vec<SosRequestView>> {
    ctx.require_staff("viewing pending requests")?;
    Ok(ctx.db().sos().list_pending_by_priority().await?)
}

pub async fn prioritize(ctx: &AppContext, id: &str, urgency: UrgencyLevel) -> ApiResult<SosRequest> {
    ctx.require_admin("prioritizing requests")?;
    let request = ctx.db().sos().set_urgency(id, urgency).await?;
    ctx.audit(
        "set_urgency",
        "sos_requests",
        Some(id),
        Some(json!({ "urgency": urgency, "priority_score": request.priority_score })),
    )
    .await?;
    Ok(request)
}

pub async fn set_status(ctx: &AppContext, id: &str, status: SosStatus) -> ApiResult<SosRequest> {
    ctx.require_staff("updating request status")?;
    let request = ctx.db().sos().set_status(id, status).await?;
    ctx.audit(
        "set_sos_status",
        "sos_requests",
        Some(id),
        Some(json!({ "status": status })),
    )
    .await?;
    Ok(request)
}

pub async fn assign(
    ctx: &AppContext,
    id: &str,
    volunteer_id: Option<&str>,
    ngo_id: Option<&str>,
) -> ApiResult<SosRequestView> {
    ctx.require_staff("assigning requests")?;
    ctx.db().sos().assign(id, volunteer_id, ngo_id).await?;
    ctx.audit(
        "assign_sos",
        "sos_requests",
        Some(id),
        Some(json!({ "volunteer_id": volunteer_id, "ngo_id": ngo_id })),
    )
    .await?;
    ctx.db()
        .sos()
        .get_view(id)
        .await?
        .ok_or_else(|| ApiError::not_found("SOS request", id))
}
