//! Donations received, stored in minor units.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use relief_core::validation::{optional_text, validate_name};
use relief_core::{Donation, DonationFields, Money, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const DONATION_COLUMNS: &str = "id, donor_name, amount_cents, donation_type, note, donated_at";

fn check_amount(amount: Money) -> Result<(), ValidationError> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DonationRepository {
    pool: SqlitePool,
}

impl DonationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DonationRepository { pool }
    }

    pub async fn create(&self, fields: &DonationFields) -> DbResult<Donation> {
        let donor_name = fields
            .donor_name
            .as_deref()
            .ok_or_else(|| ValidationError::required("donor_name"))?;
        validate_name("donor_name", donor_name)?;
        let amount = fields.amount.ok_or_else(|| ValidationError::required("amount"))?;
        check_amount(amount)?;

        let donation = Donation {
            id: new_id(),
            donor_name: donor_name.trim().to_string(),
            amount_cents: amount.cents(),
            donation_type: optional_text(fields.donation_type.as_deref()),
            note: optional_text(fields.note.as_deref()),
            donated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO donations (id, donor_name, amount_cents, donation_type, note, donated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&donation.id)
        .bind(&donation.donor_name)
        .bind(donation.amount_cents)
        .bind(&donation.donation_type)
        .bind(&donation.note)
        .bind(donation.donated_at)
        .execute(&self.pool)
        .await?;

        info!(donation_id = %donation.id, amount = %amount, "Donation recorded");
        Ok(donation)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Donation>> {
        let sql = format!("SELECT {} FROM donations WHERE id = ?", DONATION_COLUMNS);
        let donation = sqlx::query_as::<_, Donation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(donation)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {} FROM donations ORDER BY donated_at DESC, rowid DESC",
            DONATION_COLUMNS
        );
        let donations = sqlx::query_as::<_, Donation>(&sql).fetch_all(&self.pool).await?;
        Ok(donations)
    }

    pub async fn update(&self, id: &str, fields: &DonationFields) -> DbResult<Donation> {
        if let Some(name) = fields.donor_name.as_deref() {
            validate_name("donor_name", name)?;
        }
        if let Some(amount) = fields.amount {
            check_amount(amount)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE donations SET
                donor_name = COALESCE(?, donor_name),
                amount_cents = COALESCE(?, amount_cents),
                donation_type = COALESCE(?, donation_type),
                note = COALESCE(?, note)
            WHERE id = ?
            "#,
        )
        .bind(optional_text(fields.donor_name.as_deref()))
        .bind(fields.amount.map(|a| a.cents()))
        .bind(optional_text(fields.donation_type.as_deref()))
        .bind(optional_text(fields.note.as_deref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Donation", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Donation", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM donations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Donation", id));
        }
        Ok(())
    }

    /// Sum of every donation.
    pub async fn total(&self) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM donations")
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_cents(cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::test_db;

    fn gift(donor: &str, amount: &str) -> DonationFields {
        DonationFields {
            donor_name: Some(donor.to_string()),
            amount: Some(Money::parse(amount).unwrap()),
            donation_type: Some("cash".to_string()),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_donations_and_total() {
        let db = test_db().await;
        assert_eq!(db.donations().total().await.unwrap(), Money::zero());

        let first = db.donations().create(&gift("Local mosque", "1500.50")).await.unwrap();
        db.donations().create(&gift("Anonymous", "99.50")).await.unwrap();
        assert_eq!(first.amount().to_string(), "1500.50");
        assert_eq!(db.donations().total().await.unwrap().to_string(), "1600.00");

        assert!(db.donations().create(&gift("Nobody", "0")).await.is_err());
        assert!(db
            .donations()
            .create(&DonationFields {
                donor_name: Some("No amount".to_string()),
                ..Default::default()
            })
            .await
            .is_err());

        let updated = db
            .donations()
            .update(
                &first.id,
                &DonationFields {
                    note: Some("For boats".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.note.as_deref(), Some("For boats"));
        assert_eq!(updated.amount_cents, 150050);

        db.donations().delete(&first.id).await.unwrap();
        assert_eq!(db.donations().list().await.unwrap().len(), 1);
        assert_eq!(db.donations().total().await.unwrap().to_string(), "99.50");
    }
}
