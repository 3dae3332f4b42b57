//! Shelters and their occupancy.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{NewShelter, Shelter, ShelterPatch};

use crate::error::{ApiError, ApiResult};
use crate::output::opt;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct ShelterArgs {
    #[command(subcommand)]
    pub command: ShelterCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShelterCommand {
    /// Register a shelter
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        capacity: i64,
        #[arg(long, default_value_t = 0)]
        occupancy: i64,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
        #[arg(long)]
        contact: Option<String>,
    },
    List,
    Show { id: String },
    /// Change name, capacity, occupancy or contact
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        capacity: Option<i64>,
        #[arg(long)]
        occupancy: Option<i64>,
        #[arg(long)]
        contact: Option<String>,
    },
    Delete { id: String },
}

pub async fn execute(ctx: &AppContext, args: ShelterArgs) -> ApiResult<()> {
    match args.command {
        ShelterCommand::Add {
            name,
            capacity,
            occupancy,
            latitude,
            longitude,
            contact,
        } => {
            let shelter = create(
                ctx,
                &NewShelter {
                    name,
                    latitude,
                    longitude,
                    capacity,
                    current_occupancy: occupancy,
                    contact,
                },
            )
            .await?;
            ctx.out().record(
                &shelter,
                format!("Shelter {} registered ({} places)", shelter.name, shelter.capacity),
            )
        }
        ShelterCommand::List => ctx.out().list(&list(ctx).await?),
        ShelterCommand::Show { id } => {
            let shelter = show(ctx, &id).await?;
            ctx.out().detail(
                &shelter,
                &[
                    ("id", shelter.id.clone()),
                    ("name", shelter.name.clone()),
                    (
                        "occupancy",
                        format!("{} / {}", shelter.current_occupancy, shelter.capacity),
                    ),
                    ("free places", shelter.free_places().to_string()),
                    ("contact", opt(&shelter.contact)),
                ],
            )
        }
        ShelterCommand::Update {
            id,
            name,
            capacity,
            occupancy,
            contact,
        } => {
            let patch = ShelterPatch {
                name,
                capacity,
                current_occupancy: occupancy,
                contact,
            };
            let shelter = update(ctx, &id, &patch).await?;
            ctx.out().record(
                &shelter,
                format!(
                    "Shelter {} now {} / {}",
                    shelter.name, shelter.current_occupancy, shelter.capacity
                ),
            )
        }
        ShelterCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Shelter {} deleted", id))
        }
    }
}

pub async fn create(ctx: &AppContext, form: &NewShelter) -> ApiResult<Shelter> {
    ctx.require_staff("registering shelters")?;
    let shelter = ctx.db().shelters().create(form).await?;
    ctx.audit(
        "create_shelter",
        "shelters",
        Some(&shelter.id),
        Some(json!({ "name": shelter.name, "capacity": shelter.capacity })),
    )
    .await?;
    Ok(shelter)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<Shelter>> {
    ctx.require_session()?;
    Ok(ctx.db().shelters().list().await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<Shelter> {
    ctx.require_session()?;
    ctx.db()
        .shelters()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Shelter", id))
}

pub async fn update(ctx: &AppContext, id: &str, patch: &ShelterPatch) -> ApiResult<Shelter> {
    ctx.require_staff("updating shelters")?;
    let shelter = ctx.db().shelters().update(id, patch).await?;
    ctx.audit("update_shelter", "shelters", Some(id), Some(json!(patch)))
        .await?;
    Ok(shelter)
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("deleting shelters")?;
    ctx.db().shelters().delete(id).await?;
    ctx.audit("delete_shelter", "shelters", Some(id), None).await
}
