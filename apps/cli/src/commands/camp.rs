//! Relief camps and the supplies held at each.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{InventoryItem, InventoryItemFields, ReliefCamp, ReliefCampFields};

use crate::error::{ApiError, ApiResult};
use crate::output::opt;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct CampArgs {
    #[command(subcommand)]
    pub command: CampCommand,
}

#[derive(Debug, Subcommand)]
pub enum CampCommand {
    /// Open a camp (name required)
    Add(CampForm),
    List,
    Show { id: String },
    Update {
        id: String,
        #[command(flatten)]
        form: CampForm,
    },
    Delete { id: String },
    /// Supplies held at camps
    Inventory(InventoryArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct CampForm {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub capacity: Option<i64>,
    /// Person in charge
    #[arg(long)]
    pub incharge: Option<String>,
    #[arg(long)]
    pub contact: Option<String>,
}

impl From<CampForm> for ReliefCampFields {
    fn from(form: CampForm) -> Self {
        ReliefCampFields {
            name: form.name,
            location: form.location,
            capacity: form.capacity,
            incharge_name: form.incharge,
            contact: form.contact,
        }
    }
}

#[derive(Debug, Args)]
pub struct InventoryArgs {
    #[command(subcommand)]
    pub command: InventoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum InventoryCommand {
    /// Record an item (item name required)
    Add(ItemForm),
    List {
        #[arg(long)]
        camp: Option<String>,
    },
    Update {
        id: String,
        #[command(flatten)]
        form: ItemForm,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ItemForm {
    #[arg(long)]
    pub camp: Option<String>,
    #[arg(long)]
    pub item: Option<String>,
    #[arg(long)]
    pub quantity: Option<i64>,
    #[arg(long)]
    pub category: Option<String>,
}

impl From<ItemForm> for InventoryItemFields {
    fn from(form: ItemForm) -> Self {
        InventoryItemFields {
            camp_id: form.camp,
            item_name: form.item,
            quantity: form.quantity,
            category: form.category,
        }
    }
}

pub async fn execute(ctx: &AppContext, args: CampArgs) -> ApiResult<()> {
    match args.command {
        CampCommand::Add(form) => {
            let camp = create(ctx, form.into()).await?;
            ctx.out()
                .record(&camp, format!("Camp {} opened ({})", camp.name, camp.id))
        }
        CampCommand::List => ctx.out().list(&list(ctx).await?),
        CampCommand::Show { id } => {
            let camp = show(ctx, &id).await?;
            ctx.out().detail(
                &camp,
                &[
                    ("id", camp.id.clone()),
                    ("name", camp.name.clone()),
                    ("location", opt(&camp.location)),
                    ("capacity", camp.capacity.to_string()),
                    ("in charge", opt(&camp.incharge_name)),
                    ("contact", opt(&camp.contact)),
                ],
            )
        }
        CampCommand::Update { id, form } => {
            let camp = update(ctx, &id, form.into()).await?;
            ctx.out().record(&camp, format!("Camp {} updated", camp.id))
        }
        CampCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Camp {} deleted", id))
        }
        CampCommand::Inventory(inventory) => match inventory.command {
            InventoryCommand::Add(form) => {
                let item = add_item(ctx, form.into()).await?;
                ctx.out().record(
                    &item,
                    format!("{} x{} recorded ({})", item.item_name, item.quantity, item.id),
                )
            }
            InventoryCommand::List { camp } => ctx.out().list(&items(ctx, camp.as_deref()).await?),
            InventoryCommand::Update { id, form } => {
                let item = update_item(ctx, &id, form.into()).await?;
                ctx.out()
                    .record(&item, format!("{} now x{}", item.item_name, item.quantity))
            }
            InventoryCommand::Delete { id } => {
                delete_item(ctx, &id).await?;
                ctx.out().message(format!("Item {} deleted", id))
            }
        },
    }
}

pub async fn create(ctx: &AppContext, fields: ReliefCampFields) -> ApiResult<ReliefCamp> {
    ctx.require_staff("opening camps")?;
    let camp = ctx.db().camps().create(&fields).await?;
    ctx.audit(
        "create_camp",
        "relief_camps",
        Some(&camp.id),
        Some(json!({ "name": camp.name })),
    )
    .await?;
    Ok(camp)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<ReliefCamp>> {
    ctx.require_session()?;
    Ok(ctx.db().camps().list().await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<ReliefCamp> {
    ctx.require_session()?;
    ctx.db()
        .camps()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Relief camp", id))
}

pub async fn update(ctx: &AppContext, id: &str, fields: ReliefCampFields) -> ApiResult<ReliefCamp> {
    ctx.require_staff("editing camps")?;
    let camp = ctx.db().camps().update(id, &fields).await?;
    ctx.audit("update_camp", "relief_camps", Some(id), Some(json!(fields)))
        .await?;
    Ok(camp)
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("closing camps")?;
    ctx.db().camps().delete(id).await?;
    ctx.audit("delete_camp", "relief_camps", Some(id), None).await
}

pub async fn add_item(ctx: &AppContext, fields: InventoryItemFields) -> ApiResult<InventoryItem> {
    ctx.require_staff("recording camp supplies")?;
    let item = ctx.db().camps().add_item(&fields).await?;
    ctx.audit(
        "add_camp_item",
        "camp_inventory",
        Some(&item.id),
        Some(json!({ "camp_id": item.camp_id, "quantity": item.quantity })),
    )
    .await?;
    Ok(item)
}

pub async fn items(ctx: &AppContext, camp_id: Option<&str>) -> ApiResult<Vec<InventoryItem>> {
    ctx.require_session()?;
    Ok(ctx.db().camps().list_by_camp(camp_id).await?)
}

pub async fn update_item(
    ctx: &AppContext,
    id: &str,
    fields: InventoryItemFields,
) -> ApiResult<InventoryItem> {
    ctx.require_staff("editing camp supplies")?;
    let item = ctx.db().camps().update_item(id, &fields).await?;
    ctx.audit(
        "update_camp_item",
        "camp_inventory",
        Some(id),
        Some(json!({ "quantity": item.quantity })),
    )
    .await?;
    Ok(item)
}

pub async fn delete_item(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("deleting camp supplies")?;
    ctx.db().camps().delete_item(id).await?;
    ctx.audit("delete_camp_item", "camp_inventory", Some(id), None)
        .await
}
