//! Shelters and how full they are.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_coordinates, validate_name, validate_occupancy};
use relief_core::{NewShelter, Shelter, ShelterPatch};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const SHELTER_COLUMNS: &str =
    "id, name, latitude, longitude, capacity, current_occupancy, contact, created_at";

#[derive(Debug, Clone)]
pub struct ShelterRepository {
    pool: SqlitePool,
}

impl ShelterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShelterRepository { pool }
    }

    pub async fn create(&self, form: &NewShelter) -> DbResult<Shelter> {
        validate_name("name", &form.name)?;
        validate_coordinates(form.latitude, form.longitude)?;
        validate_occupancy(form.current_occupancy, form.capacity)?;

        let shelter = Shelter {
            id: new_id(),
            name: form.name.trim().to_string(),
            latitude: form.latitude,
            longitude: form.longitude,
            capacity: form.capacity,
            current_occupancy: form.current_occupancy,
            contact: optional_text(form.contact.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO shelters (id, name, latitude, longitude, capacity, current_occupancy,
                                  contact, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shelter.id)
        .bind(&shelter.name)
        .bind(shelter.latitude)
        .bind(shelter.longitude)
        .bind(shelter.capacity)
        .bind(shelter.current_occupancy)
        .bind(&shelter.contact)
        .bind(shelter.created_at)
        .execute(&self.pool)
        .await?;

        info!(shelter_id = %shelter.id, name = %shelter.name, "Shelter created");
        Ok(shelter)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Shelter>> {
        let sql = format!("SELECT {} FROM shelters WHERE id = ?", SHELTER_COLUMNS);
        let shelter = sqlx::query_as::<_, Shelter>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shelter)
    }

    pub async fn list(&self) -> DbResult<Vec<Shelter>> {
        let sql = format!("SELECT {} FROM shelters ORDER BY name", SHELTER_COLUMNS);
        let shelters = sqlx::query_as::<_, Shelter>(&sql).fetch_all(&self.pool).await?;
        Ok(shelters)
    }

    /// Patches a shelter. Occupancy is checked against the resulting capacity.
    pub async fn update(&self, id: &str, patch: &ShelterPatch) -> DbResult<Shelter> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shelter", id))?;

        if let Some(name) = patch.name.as_deref() {
            validate_name("name", name)?;
        }
        validate_occupancy(
            patch.current_occupancy.unwrap_or(current.current_occupancy),
            patch.capacity.unwrap_or(current.capacity),
        )?;

        sqlx::query(
            r#"
            UPDATE shelters SET
                name = COALESCE(?, name),
                capacity = COALESCE(?, capacity),
                current_occupancy = COALESCE(?, current_occupancy),
                contact = COALESCE(?, contact)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(patch.name.as_deref()))
        .bind(patch.capacity)
        .bind(patch.current_occupancy)
        .bind(optional_text(patch.contact.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shelter", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM shelters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shelter", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::test_db;

    #[tokio::test]
    async fn test_shelter_occupancy_rules() {
        let db = test_db().await;

        assert!(db
            .shelters()
            .create(&NewShelter {
                name: "Primary school".to_string(),
                capacity: 50,
                current_occupancy: 60,
                ..Default::default()
            })
            .await
            .is_err());

        let shelter = db
            .shelters()
            .create(&NewShelter {
                name: "Primary school".to_string(),
                latitude: Some(24.9),
                longitude: Some(91.87),
                capacity: 120,
                current_occupancy: 80,
                contact: Some("+880 1711 000000".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(shelter.free_places(), 40);

        // shrinking below the current occupancy is refused
        assert!(db
            .shelters()
            .update(
                &shelter.id,
                &ShelterPatch {
                    capacity: Some(70),
                    ..Default::default()
                }
            )
            .await
            .is_err());

        let updated = db
            .shelters()
            .update(
                &shelter.id,
                &ShelterPatch {
                    current_occupancy: Some(120),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.free_places(), 0);
        assert_eq!(updated.name, "Primary school");

        assert_eq!(db.shelters().list().await.unwrap().len(), 1);
        db.shelters().delete(&shelter.id).await.unwrap();
        assert!(db.shelters().list().await.unwrap().is_empty());
    }
}
