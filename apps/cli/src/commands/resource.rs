//! # Resource Commands
//!
//! Stock is managed by admins and by verified NGOs holding resource
//! permission. An NGO only touches rows it owns; anyone logged in can look.
//!
//! ```text
//! add ──► stock row ──► allocate ──► allocation (pending ─► delivered | cancelled)
//!                  └──► transfer ──► transfer (pending ─► completed | cancelled)
//! ```

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{
    AllocationStatus, AllocationTarget, NewAllocation, NewResourceStock, NewResourceType,
    NewTransfer, ResourceAllocation, ResourceStatus, ResourceStock, ResourceStockPatch,
    ResourceStockView, ResourceTransfer, ResourceType, Role, TransferStatus,
};

use crate::error::{ApiError, ApiResult};
use crate::output::{opt, time};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub command: ResourceCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Add a stock row
    Add(AddArgs),
    /// Change quantity, location or status of a stock row
    Update {
        id: String,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        status: Option<ResourceStatus>,
    },
    /// All stock, or only the session NGO's with --mine
    List {
        #[arg(long)]
        mine: bool,
    },
    /// One stock row
    Show { id: String },
    /// Remove a stock row
    Delete { id: String },
    /// Known resource types
    Types,
    /// Add a resource type
    AddType {
        #[arg(long)]
        name: String,
        /// Counting unit, e.g. litre, pack (default "unit")
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Hand units to a victim, volunteer, NGO or shelter
    Allocate(AllocateArgs),
    /// List allocations
    Allocations {
        #[arg(long)]
        request: Option<String>,
    },
    /// Mark an allocation delivered or cancelled
    AllocationStatus { id: String, status: AllocationStatus },
    /// Send units to another NGO or location
    Transfer(TransferArgs),
    /// List transfers
    Transfers {
        #[arg(long)]
        status: Option<TransferStatus>,
    },
    /// Credit a pending transfer to its destination
    CompleteTransfer { id: String },
    /// Return a pending transfer's units to the source
    CancelTransfer { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Type name (e.g. Water) or id
    #[arg(long = "type")]
    pub resource_type: String,
    #[arg(long)]
    pub quantity: i64,
    #[arg(long)]
    pub location: Option<String>,
    /// Owning NGO (admins only; NGOs always own what they add)
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AllocateArgs {
    /// Stock row to draw from
    pub stock: String,
    #[arg(long)]
    pub quantity: i64,
    /// SOS request being served
    #[arg(long)]
    pub request: Option<String>,
    /// victim, volunteer, ngo or shelter (default victim)
    #[arg(long)]
    pub target_type: Option<AllocationTarget>,
    /// Recipient id; defaults to the request's victim
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    /// Stock row to draw from
    pub stock: String,
    #[arg(long)]
    pub quantity: i64,
    #[arg(long)]
    pub to_ngo: Option<String>,
    #[arg(long)]
    pub to_location: Option<String>,
}

pub async fn execute(ctx: &AppContext, args: ResourceArgs) -> ApiResult<()> {
    match args.command {
        ResourceCommand::Add(add_args) => {
            let stock = add(ctx, add_args).await?;
            ctx.out().record(
                &stock,
                format!("Stock {} added: {} units ({})", stock.id, stock.quantity, stock.status),
            )
        }
        ResourceCommand::Update {
            id,
            quantity,
            location,
            status,
        } => {
            let patch = ResourceStockPatch {
                quantity,
                location,
                status,
            };
            let stock = update(ctx, &id, &patch).await?;
            ctx.out().record(
                &stock,
                format!("Stock {} now {} units ({})", stock.id, stock.quantity, stock.status),
            )
        }
        ResourceCommand::List { mine } => ctx.out().list(&list(ctx, mine).await?),
        ResourceCommand::Show { id } => {
            let view = show(ctx, &id).await?;
            ctx.out().detail(
                &view,
                &[
                    ("id", view.id.clone()),
                    ("type", view.type_name.clone()),
                    ("quantity", format!("{} {}", view.quantity, view.unit)),
                    ("location", opt(&view.location)),
                    ("owner", opt(&view.owner_name)),
                    ("status", view.status.to_string()),
                    ("updated", time(&view.updated_at)),
                ],
            )
        }
        ResourceCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Stock {} deleted", id))
        }
        ResourceCommand::Types => ctx.out().list(&types(ctx).await?),
        ResourceCommand::AddType {
            name,
            unit,
            description,
        } => {
            let resource_type = add_type(
                ctx,
                &NewResourceType {
                    name,
                    unit,
                    description,
                },
            )
            .await?;
            ctx.out().record(
                &resource_type,
                format!("Resource type {} ({})", resource_type.name, resource_type.id),
            )
        }
        ResourceCommand::Allocate(allocate_args) => {
            let allocation = allocate(ctx, allocate_args).await?;
            ctx.out().record(
                &allocation,
                format!(
                    "Allocated {} units to {} {} (allocation {})",
                    allocation.quantity, allocation.target_type, allocation.target_id, allocation.id
                ),
            )
        }
        ResourceCommand::Allocations { request } => {
            ctx.out().list(&allocations(ctx, request.as_deref()).await?)
        }
        ResourceCommand::AllocationStatus { id, status } => {
            let allocation = set_allocation_status(ctx, &id, status).await?;
            ctx.out().record(
                &allocation,
                format!("Allocation {} is now {}", allocation.id, allocation.status),
            )
        }
        ResourceCommand::Transfer(transfer_args) => {
            let transfer = transfer(ctx, transfer_args).await?;
            ctx.out().record(
                &transfer,
                format!("Transfer {} of {} units started", transfer.id, transfer.quantity),
            )
        }
        ResourceCommand::Transfers { status } => ctx.out().list(&transfers(ctx, status).await?),
        ResourceCommand::CompleteTransfer { id } => {
            let (transfer, stock) = complete_transfer(ctx, &id).await?;
            ctx.out().record(
                &transfer,
                format!("Transfer {} completed; new stock row {}", transfer.id, stock.id),
            )
        }
        ResourceCommand::CancelTransfer { id } => {
            let transfer = cancel_transfer(ctx, &id).await?;
            ctx.out().record(
                &transfer,
                format!("Transfer {} cancelled; units returned", transfer.id),
            )
        }
    }
}

/// Loads a stock row the session may change: admins any, NGOs their own.
async fn managed_stock(ctx: &AppContext, id: &str, action: &str) -> ApiResult<ResourceStock> {
    let session = ctx.require_resource_manager(action)?;
    let stock = ctx
        .db()
        .resources()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource stock", id))?;

    if session.role == Role::Ngo && stock.owner_ngo_id.as_deref() != Some(session.user_id.as_str())
    {
        return Err(ApiError::forbidden(format!(
            "stock {} belongs to another organization",
            id
        )));
    }
    Ok(stock)
}

/// Accepts a type name (case-insensitive) or a type id.
async fn resolve_type(ctx: &AppContext, name_or_id: &str) -> ApiResult<String> {
    let resources = ctx.db().resources();
    if let Some(id) = resources.type_id_by_name(name_or_id).await? {
        return Ok(id);
    }
    if resources.type_name_by_id(name_or_id).await?.is_some() {
        return Ok(name_or_id.to_string());
    }
    Err(ApiError::not_found("Resource type", name_or_id))
}

pub async fn add(ctx: &AppContext, args: AddArgs) -> ApiResult<ResourceStock> {
    let session = ctx.require_resource_manager("adding resources")?;
    let owner_ngo_id = match session.role {
        Role::Ngo => {
            if args.owner.as_deref().is_some_and(|o| o != session.user_id) {
                return Err(ApiError::forbidden("NGOs can only add stock they own"));
            }
            Some(session.user_id.clone())
        }
        _ => args.owner,
    };

    let resource_type_id = resolve_type(ctx, &args.resource_type).await?;
    let stock = ctx
        .db()
        .resources()
        .add_stock(&NewResourceStock {
            resource_type_id,
            owner_ngo_id,
            quantity: args.quantity,
            location: args.location,
        })
        .await?;

    ctx.audit(
        "add_stock",
        "resource_stock",
        Some(&stock.id),
        Some(json!({ "quantity": stock.quantity })),
    )
    .await?;
    Ok(stock)
}

pub async fn update(ctx: &AppContext, id: &str, patch: &ResourceStockPatch) -> ApiResult<ResourceStock> {
    managed_stock(ctx, id, "updating resources").await?;
    let stock = ctx.db().resources().update(id, patch).await?;
    ctx.audit(
        "update_stock",
        "resource_stock",
        Some(id),
        Some(json!({ "quantity": stock.quantity, "status": stock.status })),
    )
    .await?;
    Ok(stock)
}

pub async fn list(ctx: &AppContext, mine: bool) -> ApiResult<Vec<ResourceStockView>> {
    let session = ctx.require_session()?;
    let owner = if mine {
        if session.role != Role::Ngo {
            return Err(ApiError::validation("--mine is only for NGO accounts"));
        }
        Some(session.user_id.as_str())
    } else {
        None
    };
    Ok(ctx.db().resources().list_views(owner).await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<ResourceStockView> {
    ctx.require_session()?;
    ctx.db()
        .resources()
        .get_view(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource stock", id))
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    managed_stock(ctx, id, "deleting resources").await?;
    ctx.db().resources().delete(id).await?;
    ctx.audit("delete_stock", "resource_stock", Some(id), None).await
}

pub async fn types(ctx: &AppContext) -> ApiResult<Vec<ResourceType>> {
    ctx.require_session()?;
    Ok(ctx.db().resources().list_types().await?)
}

pub async fn add_type(ctx: &AppContext, form: &NewResourceType) -> ApiResult<ResourceType> {
    ctx.require_resource_manager("adding resource types")?;
    let resource_type = ctx.db().resources().add_type(form).await?;
    ctx.audit(
        "add_resource_type",
        "resource_types",
        Some(&resource_type.id),
        Some(json!({ "name": resource_type.name })),
    )
    .await?;
    Ok(resource_type)
}

pub async fn allocate(ctx: &AppContext, args: AllocateArgs) -> ApiResult<ResourceAllocation> {
    managed_stock(ctx, &args.stock, "allocating resources").await?;
    let session = ctx.require_session()?;

    let allocation = ctx
        .db()
        .resources()
        .allocate(&NewAllocation {
            stock_id: args.stock,
            request_id: args.request,
            target_type: args.target_type,
            target_id: args.target,
            quantity: args.quantity,
            allocated_by: Some(session.user_id.clone()),
        })
        .await?;

    ctx.audit(
        "allocate",
        "resource_allocations",
        Some(&allocation.id),
        Some(json!({
            "stock_id": allocation.stock_id,
            "quantity": allocation.quantity,
            "target_type": allocation.target_type,
            "target_id": allocation.target_id,
        })),
    )
    .await?;
    Ok(allocation)
}

pub async fn allocations(ctx: &AppContext, request_id: Option<&str>) -> ApiResult<Vec<ResourceAllocation>> {
    ctx.require_staff("viewing allocations")?;
    Ok(ctx.db().resources().list_allocations(request_id).await?)
}

pub async fn set_allocation_status(
    ctx: &AppContext,
    id: &str,
    status: AllocationStatus,
) -> ApiResult<ResourceAllocation> {
    let current = ctx
        .db()
        .resources()
        .get_allocation(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Allocation", id))?;
    managed_stock(ctx, &current.stock_id, "updating allocations").await?;

    let allocation = ctx.db().resources().set_allocation_status(id, status).await?;
    ctx.audit(
        "set_allocation_status",
        "resource_allocations",
        Some(id),
        Some(json!({ "status": status })),
    )
    .await?;
    Ok(allocation)
}

pub async fn transfer(ctx: &AppContext, args: TransferArgs) -> ApiResult<ResourceTransfer> {
    managed_stock(ctx, &args.stock, "transferring resources").await?;
    let session = ctx.require_session()?;

    let transfer = ctx
        .db()
        .resources()
        .transfer(&NewTransfer {
            stock_id: args.stock,
            to_ngo_id: args.to_ngo,
            to_location: args.to_location,
            quantity: args.quantity,
            requested_by: Some(session.user_id.clone()),
        })
        .await?;

    ctx.audit(
        "transfer",
        "resource_transfers",
        Some(&transfer.id),
        Some(json!({ "stock_id": transfer.stock_id, "quantity": transfer.quantity })),
    )
    .await?;
    Ok(transfer)
}

pub async fn transfers(ctx: &AppContext, status: Option<TransferStatus>) -> ApiResult<Vec<ResourceTransfer>> {
    ctx.require_staff("viewing transfers")?;
    Ok(ctx.db().resources().list_transfers(status).await?)
}

/// NGOs may only close transfers they sent or receive.
async fn check_transfer_party(ctx: &AppContext, id: &str, action: &str) -> ApiResult<()> {
    let session = ctx.require_resource_manager(action)?;
    if session.role != Role::Ngo {
        return Ok(());
    }
    let transfer = ctx
        .db()
        .resources()
        .get_transfer(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transfer", id))?;

    let me = Some(session.user_id.as_str());
    if transfer.from_ngo_id.as_deref() == me || transfer.to_ngo_id.as_deref() == me {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "transfer {} does not involve your organization",
            id
        )))
    }
}

pub async fn complete_transfer(
    ctx: &AppContext,
    id: &str,
) -> ApiResult<(ResourceTransfer, ResourceStock)> {
    check_transfer_party(ctx, id, "completing transfers").await?;
    let (transfer, stock) = ctx.db().resources().complete_transfer(id).await?;
    ctx.audit(
        "complete_transfer",
        "resource_transfers",
        Some(id),
        Some(json!({ "credited_stock_id": stock.id })),
    )
    .await?;
    Ok((transfer, stock))
}

pub async fn cancel_transfer(ctx: &AppContext, id: &str) -> ApiResult<ResourceTransfer> {
    check_transfer_party(ctx, id, "cancelling transfers").await?;
    let transfer = ctx.db().resources().cancel_transfer(id).await?;
    ctx.audit("cancel_transfer", "resource_transfers", Some(id), None)
        .await?;
    Ok(transfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sos::{send, SendArgs};
    use crate::commands::testing::{self, test_db};
    use crate::error::ErrorCode;
    use relief_core::UrgencyLevel;

    async fn water(ctx: &AppContext) {
        add_type(
            ctx,
            &NewResourceType {
                name: "Water".to_string(),
                unit: Some("litre".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    }

    fn stock_of(quantity: i64) -> AddArgs {
        AddArgs {
            resource_type: "water".to_string(),
            quantity,
            location: Some("Sylhet depot".to_string()),
            owner: None,
        }
    }

    #[tokio::test]
    async fn test_permissions_follow_ngo_flags() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let allowed = testing::ngo(&db, "River Aid", true).await;
        let plain = testing::ngo(&db, "Hope", false).await;
        let victim = testing::victim(&db, "Rahim").await;
        water(&admin).await;

        let stock = add(&allowed, stock_of(100)).await.unwrap();
        assert_eq!(stock.owner_ngo_id, Some(testing::user_id(&allowed)));

        assert_eq!(add(&plain, stock_of(5)).await.unwrap_err().code, ErrorCode::Forbidden);
        assert_eq!(add(&victim, stock_of(5)).await.unwrap_err().code, ErrorCode::Forbidden);

        // everyone logged in can look
        assert_eq!(list(&victim, false).await.unwrap().len(), 1);
        assert_eq!(show(&victim, &stock.id).await.unwrap().type_name, "Water");

        // admins manage any row; other NGOs none
        let admin_row = add(&admin, stock_of(20)).await.unwrap();
        let err = delete(&allowed, &admin_row.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(list(&allowed, true).await.unwrap().len(), 1);

        let err = add(
            &admin,
            AddArgs {
                resource_type: "Fuel".to_string(),
                ..stock_of(1)
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_allocate_to_request_victim() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let victim = testing::victim(&db, "Rahim").await;
        water(&admin).await;

        let request = send(
            &victim,
            SendArgs {
                location: "Chhatak".to_string(),
                need: "water".to_string(),
                description: "No drinking water for two days".to_string(),
                urgency: Some(UrgencyLevel::High),
                latitude: None,
                longitude: None,
            },
        )
        .await
        .unwrap();
        let stock = add(&admin, stock_of(30)).await.unwrap();

        let allocation = allocate(
            &admin,
            AllocateArgs {
                stock: stock.id.clone(),
                quantity: 25,
                request: Some(request.id.clone()),
                target_type: None,
                target: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(allocation.target_type, AllocationTarget::Victim);
        assert_eq!(allocation.target_id, testing::user_id(&victim));
        assert_eq!(show(&admin, &stock.id).await.unwrap().status, ResourceStatus::Low);

        let err = allocate(
            &admin,
            AllocateArgs {
                stock: stock.id.clone(),
                quantity: 10,
                request: Some(request.id.clone()),
                target_type: None,
                target: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let cancelled = set_allocation_status(&admin, &allocation.id, AllocationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, AllocationStatus::Cancelled);
        assert_eq!(show(&admin, &stock.id).await.unwrap().quantity, 30);
        assert_eq!(allocations(&admin, Some(&request.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_allocation_status_limited_to_owning_ngo() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let owner = testing::ngo(&db, "River Aid", true).await;
        let other = testing::ngo(&db, "Hill Relief", true).await;
        water(&admin).await;

        let stock = add(&owner, stock_of(100)).await.unwrap();
        let allocation = allocate(
            &owner,
            AllocateArgs {
                stock: stock.id.clone(),
                quantity: 40,
                request: None,
                target_type: Some(AllocationTarget::Shelter),
                target: Some("shelter-7".to_string()),
            },
        )
        .await
        .unwrap();

        let err = set_allocation_status(&other, &allocation.id, AllocationStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(show(&admin, &stock.id).await.unwrap().quantity, 60);

        let err = set_allocation_status(&other, "missing", AllocationStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let cancelled = set_allocation_status(&owner, &allocation.id, AllocationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, AllocationStatus::Cancelled);
        assert_eq!(show(&admin, &stock.id).await.unwrap().quantity, 100);
    }

    #[tokio::test]
    async fn test_transfer_between_ngos() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let sender = testing::ngo(&db, "River Aid", true).await;
        let receiver = testing::ngo(&db, "Hope", true).await;
        let outsider = testing::ngo(&db, "Delta Care", true).await;
        water(&admin).await;

        let stock = add(&sender, stock_of(200)).await.unwrap();
        let pending = transfer(
            &sender,
            TransferArgs {
                stock: stock.id.clone(),
                quantity: 80,
                to_ngo: Some(testing::user_id(&receiver)),
                to_location: Some("Sunamganj".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(show(&sender, &stock.id).await.unwrap().quantity, 120);

        let err = complete_transfer(&outsider, &pending.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        let err = complete_transfer(&outsider, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let (done, credited) = complete_transfer(&receiver, &pending.id).await.unwrap();
        assert_eq!(done.status, TransferStatus::Completed);
        assert_eq!(credited.quantity, 80);
        assert_eq!(list(&receiver, true).await.unwrap().len(), 1);

        let err = cancel_transfer(&sender, &pending.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(
            transfers(&admin, Some(TransferStatus::Completed)).await.unwrap().len(),
            1
        );
    }
}
