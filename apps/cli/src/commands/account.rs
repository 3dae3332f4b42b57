//! Login, registration and account administration.

use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;

use relief_core::{NewNgo, NewUser, NewVictim, NewVolunteer, Role, Session, UserAccount};

use crate::error::{ApiError, ApiResult};
use crate::output::yes_no;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[command(subcommand)]
    pub command: RegisterCommand,
}

#[derive(Debug, Subcommand)]
pub enum RegisterCommand {
    /// Register a volunteer
    Volunteer {
        #[command(flatten)]
        account: AccountFields,
        /// Free text, e.g. "boat, first aid"
        #[arg(long)]
        skills: Option<String>,
    },
    /// Register an NGO; it must be verified by an admin before acting
    Ngo {
        #[command(flatten)]
        account: AccountFields,
        #[arg(long)]
        org: String,
        /// Registration document reference (path or URL)
        #[arg(long)]
        doc: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Register a victim
    Victim {
        #[command(flatten)]
        account: AccountFields,
        /// Mobility, medical or other vulnerability notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Register an administrator (needs an admin session once any account exists)
    Admin {
        #[command(flatten)]
        account: AccountFields,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AccountFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    /// Password for the new account
    #[arg(long = "account-password")]
    pub account_password: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
}

impl From<AccountFields> for NewUser {
    fn from(fields: AccountFields) -> Self {
        NewUser {
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            password: fields.account_password,
            location: fields.location,
            language: fields.language,
        }
    }
}

#[derive(Debug, Args)]
pub struct PasswdArgs {
    /// The new password
    #[arg(long)]
    pub new: String,
}

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[arg(long)]
    pub role: Option<Role>,
}

pub async fn execute_login(ctx: &AppContext) -> ApiResult<()> {
    let session = login(ctx)?;
    ctx.out().detail(
        session,
        &[
            ("user", session.user_id.clone()),
            ("name", session.name.clone()),
            ("email", session.email.clone()),
            ("role", session.role.to_string()),
            ("verified NGO", yes_no(session.ngo_verified)),
            ("manages resources", yes_no(session.can_manage_resources)),
        ],
    )
}

pub async fn execute_register(ctx: &AppContext, args: RegisterArgs) -> ApiResult<()> {
    let account = register(ctx, args.command).await?;
    ctx.out().record(
        &account,
        format!("Registered {} {} ({})", account.role, account.email, account.id),
    )
}

pub async fn execute_passwd(ctx: &AppContext, args: PasswdArgs) -> ApiResult<()> {
    change_password(ctx, &args.new).await?;
    ctx.out().message("Password changed")
}

pub async fn execute_users(ctx: &AppContext, args: UsersArgs) -> ApiResult<()> {
    let users = list_users(ctx, args.role).await?;
    ctx.out().list(&users)
}

/// The session opened from `--user` / `--password`.
pub fn login(ctx: &AppContext) -> ApiResult<&Session> {
    ctx.require_session()
}

pub async fn register(ctx: &AppContext, command: RegisterCommand) -> ApiResult<UserAccount> {
    let db = ctx.db();
    let account = match command {
        RegisterCommand::Volunteer { account, skills } => {
            db.volunteers()
                .register(&account.into(), &NewVolunteer { skills })
                .await?
                .0
        }
        RegisterCommand::Ngo {
            account,
            org,
            doc,
            region,
            contact,
        } => {
            db.ngos()
                .register(
                    &account.into(),
                    &NewNgo {
                        org_name: org,
                        registration_doc: doc,
                        region,
                        contact_person: contact,
                    },
                )
                .await?
                .0
        }
        RegisterCommand::Victim { account, notes } => {
            db.victims()
                .register(
                    &account.into(),
                    &NewVictim {
                        vulnerability_notes: notes,
                    },
                )
                .await?
                .0
        }
        RegisterCommand::Admin { account } => {
            // The very first account may bootstrap itself.
            if db.users().count().await? > 0 {
                ctx.require_admin("registering an admin")?;
            }
            db.users().create_admin(&account.into()).await?
        }
    };

    ctx.audit(
        "register",
        "users",
        Some(&account.id),
        Some(json!({ "role": account.role })),
    )
    .await?;
    info!(user_id = %account.id, role = %account.role, "Account registered");
    Ok(account)
}

pub async fn change_password(ctx: &AppContext, new_password: &str) -> ApiResult<()> {
    let session = ctx.require_session()?;
    ctx.db()
        .users()
        .update_password(&session.user_id, new_password)
        .await?;
    ctx.audit("change_password", "users", Some(&session.user_id), None)
        .await
}

pub async fn list_users(ctx: &AppContext, role: Option<Role>) -> ApiResult<Vec<UserAccount>> {
    ctx.require_admin("listing accounts")?;
    let users = match role {
        Some(role) => ctx.db().users().list_by_role(role).await?,
        None => ctx.db().users().list().await?,
    };
    Ok(users)
}

/// Fails with `Unauthenticated` unless both halves of the credentials are given.
pub fn credentials<'a>(
    user: Option<&'a str>,
    password: Option<&'a str>,
) -> ApiResult<Option<(&'a str, &'a str)>> {
    match (user, password) {
        (Some(user), Some(password)) => Ok(Some((user, password))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ApiError::unauthenticated(
            "--password (or RELIEF_PASSWORD) is required with --user",
        )),
        (None, Some(_)) => Err(ApiError::unauthenticated(
            "--user (or RELIEF_USER) is required with --password",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, anonymous, test_db};
    use crate::error::ErrorCode;

    fn fields(name: &str, email: &str) -> AccountFields {
        AccountFields {
            name: name.to_string(),
            email: email.to_string(),
            account_password: testing::PASSWORD.to_string(),
            phone: Some("+8801711000000".to_string()),
            location: Some("Sunamganj".to_string()),
            language: None,
        }
    }

    #[tokio::test]
    async fn test_first_admin_bootstraps_then_needs_admin() {
        let db = test_db().await;
        let ctx = anonymous(&db);

        let first = register(
            &ctx,
            RegisterCommand::Admin {
                account: fields("Head Office", "head@relief.test"),
            },
        )
        .await
        .unwrap();
        assert_eq!(first.role, Role::Admin);

        let err = register(
            &ctx,
            RegisterCommand::Admin {
                account: fields("Intruder", "intruder@relief.test"),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);

        let victim = testing::victim(&db, "Rahim").await;
        let err = register(
            &victim,
            RegisterCommand::Admin {
                account: fields("Intruder", "intruder@relief.test"),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_register_roles_and_list() {
        let db = test_db().await;
        let ctx = anonymous(&db);

        register(
            &ctx,
            RegisterCommand::Volunteer {
                account: fields("Sara", "sara@relief.test"),
                skills: Some("swimming".to_string()),
            },
        )
        .await
        .unwrap();
        let ngo = register(
            &ctx,
            RegisterCommand::Ngo {
                account: fields("Nusrat", "nusrat@relief.test"),
                org: "River Aid".to_string(),
                doc: None,
                region: None,
                contact: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(ngo.role, Role::Ngo);

        let err = register(
            &ctx,
            RegisterCommand::Victim {
                account: fields("Copy", "SARA@relief.test"),
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let admin = testing::admin(&db).await;
        assert_eq!(list_users(&admin, None).await.unwrap().len(), 3);
        assert_eq!(list_users(&admin, Some(Role::Ngo)).await.unwrap().len(), 1);
        assert!(list_users(&ctx, None).await.is_err());

        let log = db.audit().list_recent(10).await.unwrap();
        assert_eq!(log.iter().filter(|e| e.action == "register").count(), 2);
    }

    #[tokio::test]
    async fn test_login_and_password_change() {
        let db = test_db().await;
        let volunteer = testing::volunteer(&db, "Omar").await;
        let email = volunteer.session().unwrap().email.clone();

        change_password(&volunteer, "a-new-secret-9").await.unwrap();

        let mut ctx = anonymous(&db);
        assert!(ctx.login(&email, testing::PASSWORD).await.is_err());
        let session = ctx.login(&email, "a-new-secret-9").await.unwrap();
        assert_eq!(session.role, Role::Volunteer);
        assert_eq!(login(&ctx).unwrap().email, email);

        // login refreshes the volunteer's activity stamp
        let record = db
            .volunteers()
            .get(&testing::user_id(&ctx))
            .await
            .unwrap()
            .unwrap();
        assert!(record.last_active.is_some());
    }

    #[test]
    fn test_credentials_need_both_halves() {
        assert_eq!(credentials(None, None).unwrap(), None);
        assert_eq!(
            credentials(Some("a@b.c"), Some("pw")).unwrap(),
            Some(("a@b.c", "pw"))
        );
        assert_eq!(
            credentials(Some("a@b.c"), None).unwrap_err().code,
            ErrorCode::Unauthenticated
        );
    }
}
