//! # Resource Repository
//!
//! Resource catalogue, stock records, allocations and transfers.
//!
//! ## Taking Units Out Of Stock
//! ```text
//! allocate / transfer (quantity q from stock S)
//!      │
//!      ▼
//! ┌───────────────────────── one transaction ──────────────────────────┐
//! │ SELECT quantity, status FROM resource_stock WHERE id = S          │
//! │      │                                                             │
//! │      ├── q > quantity ──► InsufficientStock (nothing written)     │
//! │      ▼                                                             │
//! │ UPDATE resource_stock SET quantity = quantity - q                  │
//! │     WHERE id = S AND quantity >= q        ← guarded decrement      │
//! │      │                                                             │
//! │      ▼                                                             │
//! │ status re-derived (available / low / out_of_stock)                 │
//! │ INSERT resource_allocations | resource_transfers (pending)         │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transfer Lifecycle
//! ```text
//! pending ──complete──► completed   (new stock row at the destination)
//!    │
//!    └────cancel──────► cancelled   (units return to the source row)
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use relief_core::rules::check_stock;
use relief_core::validation::{optional_text, validate_name, validate_quantity};
use relief_core::{
    AllocationStatus, AllocationTarget, CoreError, NewAllocation, NewResourceStock,
    NewResourceType, NewTransfer, ResourceAllocation, ResourceStatus, ResourceStock,
    ResourceStockPatch, ResourceStockView, ResourceTransfer, ResourceType, TransferStatus,
    ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const STOCK_COLUMNS: &str =
    "id, resource_type_id, owner_ngo_id, quantity, location, status, created_at, updated_at";

const STOCK_VIEW_SELECT: &str = r#"
    SELECT s.id, s.resource_type_id, t.name AS type_name, t.unit, s.owner_ngo_id,
           n.org_name AS owner_name, s.quantity, s.location, s.status, s.updated_at
    FROM resource_stock s
    JOIN resource_types t ON t.id = s.resource_type_id
    LEFT JOIN ngos n ON n.id = s.owner_ngo_id
"#;

const TRANSFER_COLUMNS: &str = "id, stock_id, from_ngo_id, to_ngo_id, to_location, quantity, status, requested_by, created_at, completed_at";

const ALLOCATION_COLUMNS: &str = "id, stock_id, request_id, target_type, target_id, quantity, status, allocated_by, allocated_at";

const DEFAULT_UNIT: &str = "unit";

async fn fetch_stock(conn: &mut SqliteConnection, id: &str) -> DbResult<ResourceStock> {
    let sql = format!("SELECT {} FROM resource_stock WHERE id = ?", STOCK_COLUMNS);
    sqlx::query_as::<_, ResourceStock>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Resource stock", id))
}

async fn fetch_transfer(conn: &mut SqliteConnection, id: &str) -> DbResult<ResourceTransfer> {
    let sql = format!("SELECT {} FROM resource_transfers WHERE id = ?", TRANSFER_COLUMNS);
    sqlx::query_as::<_, ResourceTransfer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Transfer", id))
}

/// Takes `quantity` units out of a stock row with a guarded decrement and
/// re-derives its status. Returns the row as it now stands.
async fn withdraw(
    conn: &mut SqliteConnection,
    stock_id: &str,
    quantity: i64,
    low_threshold: i64,
) -> DbResult<ResourceStock> {
    let stock = fetch_stock(conn, stock_id).await?;
    check_stock(stock_id, stock.quantity, quantity)?;

    let remaining = stock.quantity - quantity;
    let status = stock.status.after_change(remaining, low_threshold);
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE resource_stock
        SET quantity = quantity - ?1, status = ?2, updated_at = ?3
        WHERE id = ?4 AND quantity >= ?1
        "#,
    )
    .bind(quantity)
    .bind(status)
    .bind(now)
    .bind(stock_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(stock_id = %stock_id, requested = quantity, "Stock changed underneath withdrawal");
        let current = fetch_stock(conn, stock_id).await?;
        return Err(CoreError::InsufficientStock {
            stock_id: stock_id.to_string(),
            available: current.quantity,
            requested: quantity,
        }
        .into());
    }

    debug!(stock_id = %stock_id, quantity, remaining, "Withdrew stock");
    Ok(ResourceStock {
        quantity: remaining,
        status,
        updated_at: now,
        ..stock
    })
}

/// Puts `quantity` units back into a stock row.
async fn restock(
    conn: &mut SqliteConnection,
    stock_id: &str,
    quantity: i64,
    low_threshold: i64,
) -> DbResult<()> {
    let stock = fetch_stock(conn, stock_id).await?;
    let total = stock.quantity + quantity;
    let status = stock.status.after_change(total, low_threshold);

    sqlx::query(
        "UPDATE resource_stock SET quantity = quantity + ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(quantity)
    .bind(status)
    .bind(Utc::now())
    .bind(stock_id)
    .execute(&mut *conn)
    .await?;

    debug!(stock_id = %stock_id, quantity, total, "Restocked");
    Ok(())
}

/// Repository for resources and their movements.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    pool: SqlitePool,
    low_stock_threshold: i64,
}

impl ResourceRepository {
    pub fn new(pool: SqlitePool, low_stock_threshold: i64) -> Self {
        ResourceRepository {
            pool,
            low_stock_threshold,
        }
    }

    // =========================================================================
    // Resource types
    // =========================================================================

    pub async fn add_type(&self, form: &NewResourceType) -> DbResult<ResourceType> {
        validate_name("name", &form.name)?;
        let name = form.name.trim().to_string();

        if self.type_id_by_name(&name).await?.is_some() {
            return Err(DbError::duplicate("resource type", name));
        }

        let resource_type = ResourceType {
            id: new_id(),
            name,
            unit: optional_text(form.unit.as_deref()).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            description: optional_text(form.description.as_deref()),
        };

        sqlx::query("INSERT INTO resource_types (id, name, unit, description) VALUES (?, ?, ?, ?)")
            .bind(&resource_type.id)
            .bind(&resource_type.name)
            .bind(&resource_type.unit)
            .bind(&resource_type.description)
            .execute(&self.pool)
            .await?;

        info!(type_id = %resource_type.id, name = %resource_type.name, "Resource type added");
        Ok(resource_type)
    }

    pub async fn list_types(&self) -> DbResult<Vec<ResourceType>> {
        let types = sqlx::query_as::<_, ResourceType>(
            "SELECT id, name, unit, description FROM resource_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    /// Case-insensitive lookup.
    pub async fn type_id_by_name(&self, name: &str) -> DbResult<Option<String>> {
        let id = sqlx::query_scalar("SELECT id FROM resource_types WHERE name = ? COLLATE NOCASE")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn type_name_by_id(&self, id: &str) -> DbResult<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM resource_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    pub async fn add_stock(&self, form: &NewResourceStock) -> DbResult<ResourceStock> {
        validate_quantity(form.quantity)?;

        if self.type_name_by_id(&form.resource_type_id).await?.is_none() {
            return Err(DbError::not_found("Resource type", &form.resource_type_id));
        }

        let now = Utc::now();
        let stock = ResourceStock {
            id: new_id(),
            resource_type_id: form.resource_type_id.clone(),
            owner_ngo_id: form.owner_ngo_id.clone(),
            quantity: form.quantity,
            location: optional_text(form.location.as_deref()),
            status: ResourceStatus::for_quantity(form.quantity, self.low_stock_threshold),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO resource_stock (id, resource_type_id, owner_ngo_id, quantity, location,
                                        status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stock.id)
        .bind(&stock.resource_type_id)
        .bind(&stock.owner_ngo_id)
        .bind(stock.quantity)
        .bind(&stock.location)
        .bind(stock.status)
        .bind(stock.created_at)
        .bind(stock.updated_at)
        .execute(&self.pool)
        .await?;

        info!(stock_id = %stock.id, quantity = stock.quantity, status = %stock.status, "Stock added");
        Ok(stock)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ResourceStock>> {
        let sql = format!("SELECT {} FROM resource_stock WHERE id = ?", STOCK_COLUMNS);
        let stock = sqlx::query_as::<_, ResourceStock>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }

    pub async fn get_view(&self, id: &str) -> DbResult<Option<ResourceStockView>> {
        let sql = format!("{} WHERE s.id = ?", STOCK_VIEW_SELECT);
        let view = sqlx::query_as::<_, ResourceStockView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(view)
    }

    /// Stock by type name, optionally only one NGO's.
    pub async fn list_views(&self, owner_ngo_id: Option<&str>) -> DbResult<Vec<ResourceStockView>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR s.owner_ngo_id = ?1) ORDER BY t.name, s.rowid",
            STOCK_VIEW_SELECT
        );
        let views = sqlx::query_as::<_, ResourceStockView>(&sql)
            .bind(owner_ngo_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(views)
    }

    pub async fn quantity_of(&self, id: &str) -> DbResult<i64> {
        sqlx::query_scalar("SELECT quantity FROM resource_stock WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Resource stock", id))
    }

    /// Edits a stock row. An explicit status wins; otherwise a quantity
    /// change re-derives it.
    pub async fn update(&self, id: &str, patch: &ResourceStockPatch) -> DbResult<ResourceStock> {
        if let Some(quantity) = patch.quantity {
            validate_quantity(quantity)?;
        }

        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Resource stock", id))?;

        let status = match (patch.status, patch.quantity) {
            (Some(status), _) => status,
            (None, Some(quantity)) => current.status.after_change(quantity, self.low_stock_threshold),
            (None, None) => current.status,
        };

        sqlx::query(
            r#"
            UPDATE resource_stock SET
                quantity = COALESCE(?, quantity),
                location = COALESCE(?, location),
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.quantity)
        .bind(optional_text(patch.location.as_deref()))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!(stock_id = %id, status = %status, "Stock updated");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Resource stock", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM resource_stock WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Resource stock", id));
        }

        info!(stock_id = %id, "Stock deleted");
        Ok(())
    }

    // =========================================================================
    // Allocations
    // =========================================================================

    /// Hands units out of a stock row. With a request and no explicit
    /// target, the request's victim receives them.
    pub async fn allocate(&self, form: &NewAllocation) -> DbResult<ResourceAllocation> {
        validate_quantity(form.quantity)?;

        let mut tx = self.pool.begin().await?;

        let request_victim: Option<String> = match form.request_id.as_deref() {
            Some(request_id) => Some(
                sqlx::query_scalar("SELECT victim_id FROM sos_requests WHERE id = ?")
                    .bind(request_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| DbError::not_found("SOS request", request_id))?,
            ),
            None => None,
        };

        let (target_type, target_id) = match (form.target_type, optional_text(form.target_id.as_deref())) {
            (Some(kind), Some(id)) => (kind, id),
            (None, Some(id)) => (AllocationTarget::Victim, id),
            (_, None) => match request_victim {
                Some(victim_id) => (AllocationTarget::Victim, victim_id),
                None => return Err(ValidationError::required("target").into()),
            },
        };

        withdraw(&mut tx, &form.stock_id, form.quantity, self.low_stock_threshold).await?;

        let allocation = ResourceAllocation {
            id: new_id(),
            stock_id: form.stock_id.clone(),
            request_id: form.request_id.clone(),
            target_type,
            target_id,
            quantity: form.quantity,
            status: AllocationStatus::Pending,
            allocated_by: form.allocated_by.clone(),
            allocated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO resource_allocations (id, stock_id, request_id, target_type, target_id,
                                              quantity, status, allocated_by, allocated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&allocation.id)
        .bind(&allocation.stock_id)
        .bind(&allocation.request_id)
        .bind(allocation.target_type)
        .bind(&allocation.target_id)
        .bind(allocation.quantity)
        .bind(allocation.status)
        .bind(&allocation.allocated_by)
        .bind(allocation.allocated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            allocation_id = %allocation.id,
            stock_id = %allocation.stock_id,
            quantity = allocation.quantity,
            target = %allocation.target_type,
            "Resources allocated"
        );
        Ok(allocation)
    }

    /// Allocations newest first, optionally for one request.
    pub async fn list_allocations(&self, request_id: Option<&str>) -> DbResult<Vec<ResourceAllocation>> {
        let sql = format!(
            r#"
            SELECT {} FROM resource_allocations
            WHERE (?1 IS NULL OR request_id = ?1)
            ORDER BY allocated_at DESC, rowid DESC
            "#,
            ALLOCATION_COLUMNS
        );
        let allocations = sqlx::query_as::<_, ResourceAllocation>(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(allocations)
    }

    pub async fn get_allocation(&self, id: &str) -> DbResult<Option<ResourceAllocation>> {
        let sql = format!("SELECT {} FROM resource_allocations WHERE id = ?", ALLOCATION_COLUMNS);
        let allocation = sqlx::query_as::<_, ResourceAllocation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(allocation)
    }

    /// Marks a pending allocation delivered or cancelled. Cancelling puts
    /// the units back.
    pub async fn set_allocation_status(
        &self,
        id: &str,
        status: AllocationStatus,
    ) -> DbResult<ResourceAllocation> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM resource_allocations WHERE id = ?", ALLOCATION_COLUMNS);
        let allocation = sqlx::query_as::<_, ResourceAllocation>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Allocation", id))?;

        if allocation.status != AllocationStatus::Pending || status == AllocationStatus::Pending {
            return Err(CoreError::transition("Allocation", allocation.status, status).into());
        }

        sqlx::query("UPDATE resource_allocations SET status = ? WHERE id = ? AND status = 'pending'")
            .bind(status)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if status == AllocationStatus::Cancelled {
            restock(&mut tx, &allocation.stock_id, allocation.quantity, self.low_stock_threshold)
                .await?;
        }

        tx.commit().await?;

        info!(allocation_id = %id, status = %status, "Allocation status changed");
        Ok(ResourceAllocation {
            status,
            ..allocation
        })
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Moves units out of a stock row toward another NGO or location.
    pub async fn transfer(&self, form: &NewTransfer) -> DbResult<ResourceTransfer> {
        validate_quantity(form.quantity)?;

        let to_ngo_id = optional_text(form.to_ngo_id.as_deref());
        let to_location = optional_text(form.to_location.as_deref());
        if to_ngo_id.is_none() && to_location.is_none() {
            return Err(ValidationError::required("destination").into());
        }

        let mut tx = self.pool.begin().await?;

        let source = withdraw(&mut tx, &form.stock_id, form.quantity, self.low_stock_threshold)
            .await?;

        let transfer = ResourceTransfer {
            id: new_id(),
            stock_id: form.stock_id.clone(),
            from_ngo_id: source.owner_ngo_id,
            to_ngo_id,
            to_location,
            quantity: form.quantity,
            status: TransferStatus::Pending,
            requested_by: form.requested_by.clone(),
            created_at: Utc::now(),
            completed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO resource_transfers (id, stock_id, from_ngo_id, to_ngo_id, to_location,
                                            quantity, status, requested_by, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.stock_id)
        .bind(&transfer.from_ngo_id)
        .bind(&transfer.to_ngo_id)
        .bind(&transfer.to_location)
        .bind(transfer.quantity)
        .bind(transfer.status)
        .bind(&transfer.requested_by)
        .bind(transfer.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            stock_id = %transfer.stock_id,
            quantity = transfer.quantity,
            "Transfer started"
        );
        Ok(transfer)
    }

    /// Credits the destination with a new stock row and closes the transfer.
    pub async fn complete_transfer(&self, id: &str) -> DbResult<(ResourceTransfer, ResourceStock)> {
        let mut tx = self.pool.begin().await?;

        let transfer = fetch_transfer(&mut tx, id).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(
                CoreError::transition("Transfer", transfer.status, TransferStatus::Completed).into(),
            );
        }

        let source = fetch_stock(&mut tx, &transfer.stock_id).await?;
        let now = Utc::now();
        let credited = ResourceStock {
            id: new_id(),
            resource_type_id: source.resource_type_id,
            owner_ngo_id: transfer.to_ngo_id.clone(),
            quantity: transfer.quantity,
            location: transfer.to_location.clone().or(source.location),
            status: ResourceStatus::for_quantity(transfer.quantity, self.low_stock_threshold),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO resource_stock (id, resource_type_id, owner_ngo_id, quantity, location,
                                        status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&credited.id)
        .bind(&credited.resource_type_id)
        .bind(&credited.owner_ngo_id)
        .bind(credited.quantity)
        .bind(&credited.location)
        .bind(credited.status)
        .bind(credited.created_at)
        .bind(credited.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE resource_transfers SET status = 'completed', completed_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(transfer_id = %id, stock_id = %credited.id, "Transfer completed");
        let transfer = ResourceTransfer {
            status: TransferStatus::Completed,
            completed_at: Some(now),
            ..transfer
        };
        Ok((transfer, credited))
    }

    /// Returns the units to the source row and closes the transfer.
    pub async fn cancel_transfer(&self, id: &str) -> DbResult<ResourceTransfer> {
        let mut tx = self.pool.begin().await?;

        let transfer = fetch_transfer(&mut tx, id).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(
                CoreError::transition("Transfer", transfer.status, TransferStatus::Cancelled).into(),
            );
        }

        restock(&mut tx, &transfer.stock_id, transfer.quantity, self.low_stock_threshold).await?;

        sqlx::query("UPDATE resource_transfers SET status = 'cancelled' WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(transfer_id = %id, "Transfer cancelled");
        Ok(ResourceTransfer {
            status: TransferStatus::Cancelled,
            ..transfer
        })
    }

    /// Transfers newest first, optionally in one state.
    pub async fn list_transfers(&self, status: Option<TransferStatus>) -> DbResult<Vec<ResourceTransfer>> {
        let sql = format!(
            r#"
            SELECT {} FROM resource_transfers
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            "#,
            TRANSFER_COLUMNS
        );
        let transfers = sqlx::query_as::<_, ResourceTransfer>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(transfers)
    }

    pub async fn get_transfer(&self, id: &str) -> DbResult<Option<ResourceTransfer>> {
        let sql = format!("SELECT {} FROM resource_transfers WHERE id = ?", TRANSFER_COLUMNS);
        let transfer = sqlx::query_as::<_, ResourceTransfer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(transfer)
    }
}
