//! # NGO Repository
//!
//! Organization registration, verification and resource permissions.
//!
//! ## Permission Lifecycle
//! ```text
//! register ──► verified = false, can_manage_resources = false
//!    │
//!    ├── set_verified(true) ──► verified
//!    │
//!    └── grant_resource_permission ── no registration_doc ──► error
//!              │
//!              ▼
//!        verified = true, can_manage_resources = true
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_name};
use relief_core::{NewNgo, NewUser, Ngo, NgoSummary, Role, UserAccount, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::user::insert_account;

const SUMMARY_SELECT: &str = r#"
    SELECT n.id, n.org_name, u.name, u.email, u.phone, n.region, n.contact_person,
           n.registration_doc, n.verified, n.can_manage_resources
    FROM ngos n
    JOIN users u ON u.id = n.id
"#;

#[derive(Debug, Clone)]
pub struct NgoRepository {
    pool: SqlitePool,
}

impl NgoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NgoRepository { pool }
    }

    /// Creates the NGO account and its organization row together.
    pub async fn register(&self, user: &NewUser, ngo: &NewNgo) -> DbResult<(UserAccount, Ngo)> {
        validate_name("org_name", &ngo.org_name)?;

        let mut tx = self.pool.begin().await?;

        let account = insert_account(&mut tx, user, Role::Ngo).await?;

        let record = Ngo {
            id: account.id.clone(),
            org_name: ngo.org_name.trim().to_string(),
            registration_doc: optional_text(ngo.registration_doc.as_deref()),
            region: optional_text(ngo.region.as_deref()),
            contact_person: optional_text(ngo.contact_person.as_deref()),
            verified: false,
            can_manage_resources: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO ngos (id, org_name, registration_doc, region, contact_person,
                              verified, can_manage_resources, created_at)
            VALUES (?, ?, ?, ?, ?, 0, 0, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.org_name)
        .bind(&record.registration_doc)
        .bind(&record.region)
        .bind(&record.contact_person)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(ngo_id = %record.id, org = %record.org_name, "NGO registered");
        Ok((account, record))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Ngo>> {
        let ngo = sqlx::query_as::<_, Ngo>(
            r#"
            SELECT id, org_name, registration_doc, region, contact_person,
                   verified, can_manage_resources, created_at
            FROM ngos WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ngo)
    }

    pub async fn get_details(&self, id: &str) -> DbResult<Option<NgoSummary>> {
        let sql = format!("{} WHERE n.id = ?", SUMMARY_SELECT);
        let ngo = sqlx::query_as::<_, NgoSummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ngo)
    }

    /// Every NGO, by organization name. `verified` narrows the list.
    pub async fn list(&self, verified: Option<bool>) -> DbResult<Vec<NgoSummary>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR n.verified = ?1) ORDER BY n.org_name",
            SUMMARY_SELECT
        );
        let ngos = sqlx::query_as::<_, NgoSummary>(&sql)
            .bind(verified)
            .fetch_all(&self.pool)
            .await?;
        Ok(ngos)
    }

    /// Verifies or rejects. Rejecting also withdraws resource permission.
    pub async fn set_verified(&self, id: &str, verified: bool) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ngos SET
                verified = ?1,
                can_manage_resources = CASE WHEN ?1 THEN can_manage_resources ELSE 0 END
            WHERE id = ?2
            "#,
        )
        .bind(verified)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NGO", id));
        }

        info!(ngo_id = %id, verified, "NGO verification changed");
        Ok(())
    }

    /// Lets a documented NGO manage stock. Verifies it as a side effect.
    pub async fn grant_resource_permission(&self, id: &str) -> DbResult<()> {
        let ngo = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("NGO", id))?;

        if ngo.registration_doc.is_none() {
            return Err(ValidationError::required("registration document").into());
        }

        sqlx::query("UPDATE ngos SET verified = 1, can_manage_resources = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(ngo_id = %id, "Resource permission granted");
        Ok(())
    }

    pub async fn revoke_resource_permission(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE ngos SET can_manage_resources = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NGO", id));
        }

        info!(ngo_id = %id, "Resource permission revoked");
        Ok(())
    }

    /// Attaches the registration document reference.
    pub async fn set_registration_doc(&self, id: &str, doc: &str) -> DbResult<()> {
        let doc = relief_core::validation::validate_required("registration document", doc)?;

        let result = sqlx::query("UPDATE ngos SET registration_doc = ? WHERE id = ?")
            .bind(doc)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NGO", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, new_user, test_db};
    use relief_core::CoreError;

    #[tokio::test]
    async fn test_register_creates_both_rows() {
        let db = test_db().await;
        let (account, ngo) = db
            .ngos()
            .register(
                &new_user("Nadia", "nadia@brac.test"),
                &NewNgo {
                    org_name: "River Aid".to_string(),
                    registration_doc: None,
                    region: Some("Sunamganj".to_string()),
                    contact_person: Some("Nadia".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(account.role, Role::Ngo);
        assert_eq!(ngo.id, account.id);
        assert!(!ngo.verified);

        let summary = db.ngos().get_details(&ngo.id).await.unwrap().unwrap();
        assert_eq!(summary.org_name, "River Aid");
        assert_eq!(summary.email, "nadia@brac.test");
        assert_eq!(summary.region.as_deref(), Some("Sunamganj"));
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_no_account() {
        let db = test_db().await;
        let err = db
            .ngos()
            .register(&new_user("Nadia", "nadia@brac.test"), &NewNgo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(!db.users().email_exists("nadia@brac.test").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_and_reject() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "Hope").await;

        db.ngos().set_verified(&ngo.id, true).await.unwrap();
        assert_eq!(db.ngos().list(Some(true)).await.unwrap().len(), 1);

        db.ngos().grant_resource_permission(&ngo.id).await.unwrap();
        db.ngos().set_verified(&ngo.id, false).await.unwrap();

        let record = db.ngos().get(&ngo.id).await.unwrap().unwrap();
        assert!(!record.verified);
        assert!(!record.can_manage_resources);
        assert!(db.ngos().list(Some(true)).await.unwrap().is_empty());
        assert_eq!(db.ngos().list(None).await.unwrap().len(), 1);

        assert!(matches!(
            db.ngos().set_verified("missing", true).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_grant_requires_registration_doc() {
        let db = test_db().await;
        let (_, ngo) = db
            .ngos()
            .register(
                &new_user("Omar", "omar@relief.test"),
                &NewNgo {
                    org_name: "Undocumented".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = db
            .ngos()
            .grant_resource_permission(&ngo.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: registration document is required");

        db.ngos()
            .set_registration_doc(&ngo.id, "docs/reg-2024.pdf")
            .await
            .unwrap();
        db.ngos().grant_resource_permission(&ngo.id).await.unwrap();

        let record = db.ngos().get(&ngo.id).await.unwrap().unwrap();
        assert!(record.verified);
        assert!(record.can_manage_resources);

        db.ngos().revoke_resource_permission(&ngo.id).await.unwrap();
        let record = db.ngos().get(&ngo.id).await.unwrap().unwrap();
        assert!(record.verified);
        assert!(!record.can_manage_resources);
    }

    #[tokio::test]
    async fn test_list_orders_by_org_name() {
        let db = test_db().await;
        testing::ngo(&db, "Zeta Relief").await;
        testing::ngo(&db, "Alpha Aid").await;

        let names: Vec<_> = db
            .ngos()
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.org_name)
            .collect();
        assert_eq!(names, vec!["Alpha Aid", "Zeta Relief"]);
    }
}
