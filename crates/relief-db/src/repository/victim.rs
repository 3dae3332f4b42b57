//! Victim accounts.

use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::optional_text;
use relief_core::{NewUser, NewVictim, Role, UserAccount, Victim};

use crate::error::{DbError, DbResult};
use crate::repository::user::insert_account;

#[derive(Debug, Clone)]
pub struct VictimRepository {
    pool: SqlitePool,
}

impl VictimRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VictimRepository { pool }
    }

    /// Creates the account and the victim row together.
    pub async fn register(&self, user: &NewUser, victim: &NewVictim) -> DbResult<(UserAccount, Victim)> {
        let mut tx = self.pool.begin().await?;

        let account = insert_account(&mut tx, user, Role::Victim).await?;

        let record = Victim {
            id: account.id.clone(),
            verified_contact: false,
            vulnerability_notes: optional_text(victim.vulnerability_notes.as_deref()),
        };

        sqlx::query(
            "INSERT INTO victims (id, verified_contact, vulnerability_notes) VALUES (?, 0, ?)",
        )
        .bind(&record.id)
        .bind(&record.vulnerability_notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(victim_id = %record.id, "Victim registered");
        Ok((account, record))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Victim>> {
        let victim = sqlx::query_as::<_, Victim>(
            "SELECT id, verified_contact, vulnerability_notes FROM victims WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(victim)
    }

    /// Marks the victim's phone/email as confirmed.
    pub async fn set_verified_contact(&self, id: &str, verified: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE victims SET verified_contact = ? WHERE id = ?")
            .bind(verified)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Victim", id));
        }
        Ok(())
    }
}
