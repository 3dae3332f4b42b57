//! # Volunteer Repository
//!
//! Registration, verification and availability of volunteers.
//!
//! Listings for the assignment screen come back available first, then busy,
//! then everyone else, each group by name.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use relief_core::validation::optional_text;
use relief_core::{NewUser, NewVolunteer, Role, UserAccount, Volunteer, VolunteerStatus, VolunteerSummary};

use crate::error::{DbError, DbResult};
use crate::repository::user::insert_account;

#[derive(Debug, Clone)]
pub struct VolunteerRepository {
    pool: SqlitePool,
}

impl VolunteerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VolunteerRepository { pool }
    }

    /// Creates the account and the volunteer row together. New volunteers
    /// start available and unverified.
    pub async fn register(
        &self,
        user: &NewUser,
        volunteer: &NewVolunteer,
    ) -> DbResult<(UserAccount, Volunteer)> {
        let mut tx = self.pool.begin().await?;

        let account = insert_account(&mut tx, user, Role::Volunteer).await?;

        let record = Volunteer {
            id: account.id.clone(),
            skills: optional_text(volunteer.skills.as_deref()),
            verified: false,
            status: VolunteerStatus::Available,
            last_active: Some(Utc::now()),
        };

        sqlx::query(
            "INSERT INTO volunteers (id, skills, verified, status, last_active) VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.skills)
        .bind(record.status)
        .bind(record.last_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(volunteer_id = %record.id, "Volunteer registered");
        Ok((account, record))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Volunteer>> {
        let volunteer = sqlx::query_as::<_, Volunteer>(
            "SELECT id, skills, verified, status, last_active FROM volunteers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(volunteer)
    }

    /// Volunteers ranked for assignment: available, busy, others; then name.
    pub async fn list_ranked(&self) -> DbResult<Vec<VolunteerSummary>> {
        let volunteers = sqlx::query_as::<_, VolunteerSummary>(
            r#"
            SELECT v.id, u.name, u.email, u.phone, u.location, v.skills, v.verified,
                   v.status, v.last_active
            FROM volunteers v
            JOIN users u ON u.id = v.id
            ORDER BY
                CASE v.status
                    WHEN 'available' THEN 1
                    WHEN 'busy' THEN 2
                    ELSE 3
                END,
                u.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = volunteers.len(), "Listed volunteers");
        Ok(volunteers)
    }

    pub async fn set_verified(&self, id: &str, verified: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE volunteers SET verified = ? WHERE id = ?")
            .bind(verified)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Volunteer", id));
        }

        info!(volunteer_id = %id, verified, "Volunteer verification changed");
        Ok(())
    }

    /// Sets availability and stamps `last_active`.
    pub async fn set_status(&self, id: &str, status: VolunteerStatus) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE volunteers SET status = ?, last_active = ? WHERE id = ?")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Volunteer", id));
        }

        debug!(volunteer_id = %id, status = %status, "Volunteer status changed");
        Ok(())
    }

    /// Records activity without changing status.
    pub async fn touch(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE volunteers SET last_active = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, new_user, test_db};

    #[tokio::test]
    async fn test_register() {
        let db = test_db().await;
        let (account, volunteer) = db
            .volunteers()
            .register(
                &new_user("Tanvir", "tanvir@example.org"),
                &NewVolunteer {
                    skills: Some("first aid, boat".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(account.role, Role::Volunteer);
        let stored = db.volunteers().get(&volunteer.id).await.unwrap().unwrap();
        assert_eq!(stored.skills.as_deref(), Some("first aid, boat"));
        assert_eq!(stored.status, VolunteerStatus::Available);
        assert!(!stored.verified);
        assert!(stored.last_active.is_some());
    }

    #[tokio::test]
    async fn test_list_ranked_orders_by_status_then_name() {
        let db = test_db().await;
        let zed = testing::volunteer(&db, "Zed").await;
        let bea = testing::volunteer(&db, "Bea").await;
        let ann = testing::volunteer(&db, "Ann").await;
        let cal = testing::volunteer(&db, "Cal").await;

        db.volunteers()
            .set_status(&bea.id, VolunteerStatus::Busy)
            .await
            .unwrap();
        db.volunteers()
            .set_status(&ann.id, VolunteerStatus::Inactive)
            .await
            .unwrap();

        let ranked = db.volunteers().list_ranked().await.unwrap();
        let ids: Vec<_> = ranked.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![cal.id.as_str(), zed.id.as_str(), bea.id.as_str(), ann.id.as_str()]);
    }

    #[tokio::test]
    async fn test_verify() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Mina").await;

        db.volunteers().set_verified(&volunteer.id, true).await.unwrap();
        assert!(db.volunteers().get(&volunteer.id).await.unwrap().unwrap().verified);

        assert!(matches!(
            db.volunteers().set_verified("nobody", true).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
