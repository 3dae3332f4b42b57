//! # Camp Repository
//!
//! Relief camps and the supplies kept at each. Deleting a camp removes its
//! inventory.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_name, validate_non_negative};
use relief_core::{InventoryItem, InventoryItemFields, ReliefCamp, ReliefCampFields, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const CAMP_COLUMNS: &str = "id, name, location, capacity, incharge_name, contact, created_at";

const ITEM_COLUMNS: &str = "id, camp_id, item_name, quantity, category, updated_at";

#[derive(Debug, Clone)]
pub struct CampRepository {
    pool: SqlitePool,
}

impl CampRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CampRepository { pool }
    }

    pub async fn create(&self, fields: &ReliefCampFields) -> DbResult<ReliefCamp> {
        let name = fields
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::required("name"))?;
        validate_name("name", name)?;
        let capacity = fields.capacity.unwrap_or(0);
        validate_non_negative("capacity", capacity)?;

        let camp = ReliefCamp {
            id: new_id(),
            name: name.trim().to_string(),
            location: optional_text(fields.location.as_deref()),
            capacity,
            incharge_name: optional_text(fields.incharge_name.as_deref()),
            contact: optional_text(fields.contact.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO relief_camps (id, name, location, capacity, incharge_name, contact, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&camp.id)
        .bind(&camp.name)
        .bind(&camp.location)
        .bind(camp.capacity)
        .bind(&camp.incharge_name)
        .bind(&camp.contact)
        .bind(camp.created_at)
        .execute(&self.pool)
        .await?;

        info!(camp_id = %camp.id, name = %camp.name, "Relief camp created");
        Ok(camp)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ReliefCamp>> {
        let sql = format!("SELECT {} FROM relief_camps WHERE id = ?", CAMP_COLUMNS);
        let camp = sqlx::query_as::<_, ReliefCamp>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(camp)
    }

    pub async fn list(&self) -> DbResult<Vec<ReliefCamp>> {
        let sql = format!("SELECT {} FROM relief_camps ORDER BY name", CAMP_COLUMNS);
        let camps = sqlx::query_as::<_, ReliefCamp>(&sql).fetch_all(&self.pool).await?;
        Ok(camps)
    }

    pub async fn update(&self, id: &str, fields: &ReliefCampFields) -> DbResult<ReliefCamp> {
        if let Some(name) = fields.name.as_deref() {
            validate_name("name", name)?;
        }
        if let Some(capacity) = fields.capacity {
            validate_non_negative("capacity", capacity)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE relief_camps SET
                name = COALESCE(?, name),
                location = COALESCE(?, location),
                capacity = COALESCE(?, capacity),
                incharge_name = COALESCE(?, incharge_name),
                contact = COALESCE(?, contact)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.name.as_deref()))
        .bind(optional_text(fields.location.as_deref()))
        .bind(fields.capacity)
        .bind(optional_text(fields.incharge_name.as_deref()))
        .bind(optional_text(fields.contact.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Relief camp", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Relief camp", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM relief_camps WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Relief camp", id));
        }
        Ok(())
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub async fn add_item(&self, fields: &InventoryItemFields) -> DbResult<InventoryItem> {
        let item_name = fields
            .item_name
            .as_deref()
            .ok_or_else(|| ValidationError::required("item_name"))?;
        validate_name("item_name", item_name)?;
        let quantity = fields.quantity.unwrap_or(0);
        validate_non_negative("quantity", quantity)?;

        let item = InventoryItem {
            id: new_id(),
            camp_id: optional_text(fields.camp_id.as_deref()),
            item_name: item_name.trim().to_string(),
            quantity,
            category: optional_text(fields.category.as_deref()),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO camp_inventory (id, camp_id, item_name, quantity, category, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.camp_id)
        .bind(&item.item_name)
        .bind(item.quantity)
        .bind(&item.category)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        info!(item_id = %item.id, item = %item.item_name, quantity = item.quantity, "Inventory item added");
        Ok(item)
    }

    pub async fn get_item(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let sql = format!("SELECT {} FROM camp_inventory WHERE id = ?", ITEM_COLUMNS);
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Items by name, optionally for one camp.
    pub async fn list_by_camp(&self, camp_id: Option<&str>) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {} FROM camp_inventory WHERE (?1 IS NULL OR camp_id = ?1) ORDER BY item_name",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(camp_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn update_item(&self, id: &str, fields: &InventoryItemFields) -> DbResult<InventoryItem> {
        if let Some(name) = fields.item_name.as_deref() {
            validate_name("item_name", name)?;
        }
        if let Some(quantity) = fields.quantity {
            validate_non_negative("quantity", quantity)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE camp_inventory SET
                camp_id = COALESCE(?, camp_id),
                item_name = COALESCE(?, item_name),
                quantity = COALESCE(?, quantity),
                category = COALESCE(?, category),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.camp_id.as_deref()))
        .bind(optional_text(fields.item_name.as_deref()))
        .bind(fields.quantity)
        .bind(optional_text(fields.category.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory item", id));
        }

        self.get_item(id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    pub async fn delete_item(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM camp_inventory WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory item", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::test_db;

    #[tokio::test]
    async fn test_camp_and_inventory() {
        let db = test_db().await;

        assert!(db
            .camps()
            .create(&ReliefCampFields {
                name: Some("Negative".to_string()),
                capacity: Some(-1),
                ..Default::default()
            })
            .await
            .is_err());

        let camp = db
            .camps()
            .create(&ReliefCampFields {
                name: Some("Tilagor camp".to_string()),
                location: Some("Tilagor".to_string()),
                capacity: Some(300),
                incharge_name: Some("Farid".to_string()),
                contact: None,
            })
            .await
            .unwrap();

        let rice = db
            .camps()
            .add_item(&InventoryItemFields {
                camp_id: Some(camp.id.clone()),
                item_name: Some("Rice (kg)".to_string()),
                quantity: Some(500),
                category: Some("food".to_string()),
            })
            .await
            .unwrap();

        let updated = db
            .camps()
            .update_item(
                &rice.id,
                &InventoryItemFields {
                    quantity: Some(420),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 420);
        assert_eq!(updated.category.as_deref(), Some("food"));

        assert!(db
            .camps()
            .update_item(
                &rice.id,
                &InventoryItemFields {
                    quantity: Some(-5),
                    ..Default::default()
                }
            )
            .await
            .is_err());

        let camp = db
            .camps()
            .update(
                &camp.id,
                &ReliefCampFields {
                    capacity: Some(350),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(camp.capacity, 350);
        assert_eq!(camp.incharge_name.as_deref(), Some("Farid"));

        assert_eq!(db.camps().list_by_camp(Some(&camp.id)).await.unwrap().len(), 1);

        // inventory goes with the camp
        db.camps().delete(&camp.id).await.unwrap();
        assert!(db.camps().list_by_camp(None).await.unwrap().is_empty());
        assert!(db.camps().list().await.unwrap().is_empty());
    }
}
