//! # User Repository
//!
//! Accounts, login and profile edits.
//!
//! ## Login Flow
//! ```text
//! email + password
//!      │
//!      ▼
//! SELECT user by email ── none ──► InvalidCredentials
//!      │
//!      ▼
//! argon2 verify ── mismatch ──► InvalidCredentials
//!      │
//!      ▼
//! role = ngo? ──► load verified / can_manage_resources
//!      │
//!      ▼
//! Session
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use relief_core::password::{hash_password, verify_password};
use relief_core::validation::{optional_text, validate_email, validate_name, validate_phone};
use relief_core::{CoreError, NewUser, Role, Session, UserAccount, UserPatch, DEFAULT_LANGUAGE};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, location, language, created_at, updated_at";

/// Repository for login accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

/// Lower-cased, trimmed email used for storage and lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Inserts an account on an existing connection so role registrations can
/// share a transaction with their detail row.
pub(crate) async fn insert_account(
    conn: &mut SqliteConnection,
    user: &NewUser,
    role: Role,
) -> DbResult<UserAccount> {
    validate_name("name", &user.name)?;
    validate_email(&user.email)?;
    if let Some(phone) = optional_text(user.phone.as_deref()) {
        validate_phone(&phone)?;
    }

    let email = normalize_email(&user.email);

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&mut *conn)
        .await?;
    if taken > 0 {
        return Err(DbError::duplicate("email", email));
    }

    let password_hash = hash_password(&user.password)?;
    let now = Utc::now();

    let account = UserAccount {
        id: new_id(),
        name: user.name.trim().to_string(),
        email,
        phone: optional_text(user.phone.as_deref()),
        password_hash,
        role,
        location: optional_text(user.location.as_deref()),
        language: optional_text(user.language.as_deref())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, phone, password_hash, role, location, language,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account.id)
    .bind(&account.name)
    .bind(&account.email)
    .bind(&account.phone)
    .bind(&account.password_hash)
    .bind(account.role)
    .bind(&account.location)
    .bind(&account.language)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(&mut *conn)
    .await?;

    debug!(user_id = %account.id, role = %role, "Inserted account");
    Ok(account)
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an administrator account.
    pub async fn create_admin(&self, user: &NewUser) -> DbResult<UserAccount> {
        let mut conn = self.pool.acquire().await?;
        let account = insert_account(&mut conn, user, Role::Admin).await?;
        info!(user_id = %account.id, "Admin account created");
        Ok(account)
    }

    /// Checks email and password and opens a session.
    pub async fn authenticate(&self, email: &str, password: &str) -> DbResult<Session> {
        let user = match self.get_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!(email = %normalize_email(email), "Login with unknown email");
                return Err(CoreError::InvalidCredentials.into());
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(CoreError::InvalidCredentials.into());
        }

        let (ngo_verified, can_manage_resources) = if user.role == Role::Ngo {
            sqlx::query_as::<_, (bool, bool)>(
                "SELECT verified, can_manage_resources FROM ngos WHERE id = ?",
            )
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or((false, false))
        } else {
            (false, false)
        };

        debug!(user_id = %user.id, role = %user.role, "Authenticated");

        Ok(Session {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            ngo_verified,
            can_manage_resources,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UserAccount>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserAccount>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<UserAccount>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserAccount>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// All accounts, by name.
    pub async fn list(&self) -> DbResult<Vec<UserAccount>> {
        let sql = format!("SELECT {} FROM users ORDER BY name, email", USER_COLUMNS);
        let users = sqlx::query_as::<_, UserAccount>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Accounts of one role, by name.
    pub async fn list_by_role(&self, role: Role) -> DbResult<Vec<UserAccount>> {
        let sql = format!(
            "SELECT {} FROM users WHERE role = ? ORDER BY name, email",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, UserAccount>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        debug!(role = %role, count = users.len(), "Listed users by role");
        Ok(users)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies a profile edit; absent fields stay as they are.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> DbResult<UserAccount> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(phone) = optional_text(patch.phone.as_deref()) {
            validate_phone(&phone)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                location = COALESCE(?, location),
                language = COALESCE(?, language),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(optional_text(patch.name.as_deref()))
        .bind(optional_text(patch.phone.as_deref()))
        .bind(optional_text(patch.location.as_deref()))
        .bind(optional_text(patch.language.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Replaces the password hash.
    pub async fn update_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        let hash = hash_password(new_password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Deletes an account and, by cascade, its role detail row.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{self, new_user, test_db};

    #[tokio::test]
    async fn test_create_and_fetch_round_trip() {
        let db = test_db().await;
        let mut form = new_user("Rahim Uddin", "  Rahim@Example.org ");
        form.phone = Some("+880 1712 345678".to_string());

        let created = db.users().create_admin(&form).await.unwrap();
        assert_eq!(created.email, "rahim@example.org");
        assert_eq!(created.language, "en");

        let fetched = db.users().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Rahim Uddin");
        assert_eq!(fetched.phone.as_deref(), Some("+880 1712 345678"));
        assert_eq!(fetched.role, Role::Admin);
        assert_ne!(fetched.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        db.users()
            .create_admin(&new_user("A", "dup@example.org"))
            .await
            .unwrap();

        let err = db
            .users()
            .create_admin(&new_user("B", "DUP@example.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_form_rejected() {
        let db = test_db().await;

        let err = db
            .users()
            .create_admin(&new_user("", "x@example.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = db
            .users()
            .create_admin(&new_user("X", "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert_eq!(db.users().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;

        let session = db
            .users()
            .authenticate("ADMIN@relief.test", "password123")
            .await
            .unwrap();
        assert_eq!(session.user_id, admin.id);
        assert_eq!(session.role, Role::Admin);
        assert!(!session.ngo_verified);

        let err = db
            .users()
            .authenticate("admin@relief.test", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidCredentials)));

        let err = db
            .users()
            .authenticate("nobody@relief.test", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_ngo_session_carries_permissions() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "Hope").await;

        let session = db
            .users()
            .authenticate(&ngo.email, "password123")
            .await
            .unwrap();
        assert_eq!(session.role, Role::Ngo);
        assert!(!session.ngo_verified);
        assert!(!session.can_manage_resources);

        db.ngos().grant_resource_permission(&ngo.id).await.unwrap();
        let session = db
            .users()
            .authenticate(&ngo.email, "password123")
            .await
            .unwrap();
        assert!(session.ngo_verified);
        assert!(session.can_manage_resources);
    }

    #[tokio::test]
    async fn test_list_by_role_and_exists() {
        let db = test_db().await;
        testing::volunteer(&db, "Zara").await;
        testing::volunteer(&db, "Ali").await;
        testing::victim(&db, "Karim").await;

        let volunteers = db.users().list_by_role(Role::Volunteer).await.unwrap();
        let names: Vec<_> = volunteers.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ali", "Zara"]);

        assert!(db.users().email_exists("karim@victim.test").await.unwrap());
        assert!(!db.users().email_exists("ghost@victim.test").await.unwrap());
        assert_eq!(db.users().list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_password() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;

        let updated = db
            .users()
            .update(
                &admin.id,
                &UserPatch {
                    location: Some("Chittagong".to_string()),
                    language: Some("bn".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.location.as_deref(), Some("Chittagong"));
        assert_eq!(updated.language, "bn");
        assert_eq!(updated.name, "Admin");

        db.users()
            .update_password(&admin.id, "new-secret")
            .await
            .unwrap();
        assert!(db
            .users()
            .authenticate("admin@relief.test", "new-secret")
            .await
            .is_ok());

        let err = db
            .users()
            .update(&"missing".to_string(), &UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_role_row() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Mina").await;

        db.users().delete(&volunteer.id).await.unwrap();
        assert!(db.volunteers().get(&volunteer.id).await.unwrap().is_none());
        assert!(matches!(
            db.users().delete(&volunteer.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
