//! # Disaster Repository
//!
//! Disaster events and the people recorded as affected by them.
//!
//! Creation and edits share one `*Fields` form: `name` is required to
//! create, every `None` is left untouched on update.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_age, validate_name};
use relief_core::{AffectedPerson, AffectedPersonFields, Disaster, DisasterFields, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const DISASTER_COLUMNS: &str = "id, name, disaster_type, location, severity, status, created_at";

const PERSON_COLUMNS: &str =
    "id, disaster_id, name, age, gender, injury_status, aid_required, created_at";

#[derive(Debug, Clone)]
pub struct DisasterRepository {
    pool: SqlitePool,
}

impl DisasterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DisasterRepository { pool }
    }

    pub async fn create(&self, fields: &DisasterFields) -> DbResult<Disaster> {
        let name = fields
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::required("name"))?;
        validate_name("name", name)?;

        let disaster = Disaster {
            id: new_id(),
            name: name.trim().to_string(),
            disaster_type: optional_text(fields.disaster_type.as_deref()),
            location: optional_text(fields.location.as_deref()),
            severity: optional_text(fields.severity.as_deref()),
            status: optional_text(fields.status.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO disasters (id, name, disaster_type, location, severity, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&disaster.id)
        .bind(&disaster.name)
        .bind(&disaster.disaster_type)
        .bind(&disaster.location)
        .bind(&disaster.severity)
        .bind(&disaster.status)
        .bind(disaster.created_at)
        .execute(&self.pool)
        .await?;

        info!(disaster_id = %disaster.id, name = %disaster.name, "Disaster recorded");
        Ok(disaster)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Disaster>> {
        let sql = format!("SELECT {} FROM disasters WHERE id = ?", DISASTER_COLUMNS);
        let disaster = sqlx::query_as::<_, Disaster>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(disaster)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Disaster>> {
        let sql = format!(
            "SELECT {} FROM disasters ORDER BY created_at DESC, rowid DESC",
            DISASTER_COLUMNS
        );
        let disasters = sqlx::query_as::<_, Disaster>(&sql).fetch_all(&self.pool).await?;
        Ok(disasters)
    }

    pub async fn update(&self, id: &str, fields: &DisasterFields) -> DbResult<Disaster> {
        if let Some(name) = fields.name.as_deref() {
            validate_name("name", name)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE disasters SET
                name = COALESCE(?, name),
                disaster_type = COALESCE(?, disaster_type),
                location = COALESCE(?, location),
                severity = COALESCE(?, severity),
                status = COALESCE(?, status)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.name.as_deref()))
        .bind(optional_text(fields.disaster_type.as_deref()))
        .bind(optional_text(fields.location.as_deref()))
        .bind(optional_text(fields.severity.as_deref()))
        .bind(optional_text(fields.status.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Disaster", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Disaster", id))
    }

    /// Deletes the disaster. Its affected people stay on record, unlinked.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM disasters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Disaster", id));
        }
        Ok(())
    }

    // =========================================================================
    // Affected people
    // =========================================================================

    pub async fn add_person(&self, fields: &AffectedPersonFields) -> DbResult<AffectedPerson> {
        let name = fields
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::required("name"))?;
        validate_name("name", name)?;
        if let Some(age) = fields.age {
            validate_age(age)?;
        }

        let person = AffectedPerson {
            id: new_id(),
            disaster_id: optional_text(fields.disaster_id.as_deref()),
            name: name.trim().to_string(),
            age: fields.age,
            gender: optional_text(fields.gender.as_deref()),
            injury_status: optional_text(fields.injury_status.as_deref()),
            aid_required: optional_text(fields.aid_required.as_deref()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO affected_people (id, disaster_id, name, age, gender, injury_status,
                                         aid_required, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&person.id)
        .bind(&person.disaster_id)
        .bind(&person.name)
        .bind(person.age)
        .bind(&person.gender)
        .bind(&person.injury_status)
        .bind(&person.aid_required)
        .bind(person.created_at)
        .execute(&self.pool)
        .await?;

        info!(person_id = %person.id, "Affected person recorded");
        Ok(person)
    }

    pub async fn get_person(&self, id: &str) -> DbResult<Option<AffectedPerson>> {
        let sql = format!("SELECT {} FROM affected_people WHERE id = ?", PERSON_COLUMNS);
        let person = sqlx::query_as::<_, AffectedPerson>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(person)
    }

    /// People by name, optionally for one disaster.
    pub async fn list_by_disaster(&self, disaster_id: Option<&str>) -> DbResult<Vec<AffectedPerson>> {
        let sql = format!(
            "SELECT {} FROM affected_people WHERE (?1 IS NULL OR disaster_id = ?1) ORDER BY name",
            PERSON_COLUMNS
        );
        let people = sqlx::query_as::<_, AffectedPerson>(&sql)
            .bind(disaster_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(people)
    }

    pub async fn update_person(
        &self,
        id: &str,
        fields: &AffectedPersonFields,
    ) -> DbResult<AffectedPerson> {
        if let Some(name) = fields.name.as_deref() {
            validate_name("name", name)?;
        }
        if let Some(age) = fields.age {
            validate_age(age)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE affected_people SET
                disaster_id = COALESCE(?, disaster_id),
                name = COALESCE(?, name),
                age = COALESCE(?, age),
                gender = COALESCE(?, gender),
                injury_status = COALESCE(?, injury_status),
                aid_required = COALESCE(?, aid_required)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.disaster_id.as_deref()))
        .bind(optional_text(fields.name.as_deref()))
        .bind(fields.age)
        .bind(optional_text(fields.gender.as_deref()))
        .bind(optional_text(fields.injury_status.as_deref()))
        .bind(optional_text(fields.aid_required.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Affected person", id));
        }

        self.get_person(id)
            .await?
            .ok_or_else(|| DbError::not_found("Affected person", id))
    }

    pub async fn delete_person(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM affected_people WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Affected person", id));
        }
        Ok(())
    }
}
