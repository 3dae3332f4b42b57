//! NGO verification and resource permission (admin).

use clap::{Args, Subcommand};

use relief_core::NgoSummary;

use crate::error::{ApiError, ApiResult};
use crate::output::{opt, yes_no};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct NgoArgs {
    #[command(subcommand)]
    pub command: NgoCommand,
}

#[derive(Debug, Subcommand)]
pub enum NgoCommand {
    /// List NGOs
    List {
        /// Only verified (`true`) or only unverified (`false`)
        #[arg(long)]
        verified: Option<bool>,
    },
    /// Show one NGO
    Show { id: String },
    /// Mark an NGO as verified
    Verify { id: String },
    /// Withdraw verification (also withdraws resource permission)
    Reject { id: String },
    /// Allow a documented NGO to manage resources
    Grant { id: String },
    /// Withdraw resource permission
    Revoke { id: String },
    /// Attach a registration document reference
    SetDoc { id: String, doc: String },
}

pub async fn execute(ctx: &AppContext, args: NgoArgs) -> ApiResult<()> {
    match args.command {
        NgoCommand::List { verified } => ctx.out().list(&list(ctx, verified).await?),
        NgoCommand::Show { id } => {
            let ngo = show(ctx, &id).await?;
            ctx.out().detail(
                &ngo,
                &[
                    ("id", ngo.id.clone()),
                    ("organization", ngo.org_name.clone()),
                    ("account", format!("{} <{}>", ngo.name, ngo.email)),
                    ("phone", opt(&ngo.phone)),
                    ("region", opt(&ngo.region)),
                    ("contact", opt(&ngo.contact_person)),
                    ("document", opt(&ngo.registration_doc)),
                    ("verified", yes_no(ngo.verified)),
                    ("manages resources", yes_no(ngo.can_manage_resources)),
                ],
            )
        }
        NgoCommand::Verify { id } => {
            let ngo = set_verified(ctx, &id, true).await?;
            ctx.out().record(&ngo, format!("{} verified", ngo.org_name))
        }
        NgoCommand::Reject { id } => {
            let ngo = set_verified(ctx, &id, false).await?;
            ctx.out().record(&ngo, format!("{} rejected", ngo.org_name))
        }
        NgoCommand::Grant { id } => {
            let ngo = set_resource_permission(ctx, &id, true).await?;
            ctx.out()
                .record(&ngo, format!("{} may now manage resources", ngo.org_name))
        }
        NgoCommand::Revoke { id } => {
            let ngo = set_resource_permission(ctx, &id, false).await?;
            ctx.out()
                .record(&ngo, format!("{} may no longer manage resources", ngo.org_name))
        }
        NgoCommand::SetDoc { id, doc } => {
            let ngo = set_document(ctx, &id, &doc).await?;
            ctx.out().record(&ngo, format!("Document recorded for {}", ngo.org_name))
        }
    }
}

pub async fn list(ctx: &AppContext, verified: Option<bool>) -> ApiResult<Vec<NgoSummary>> {
    ctx.require_admin("listing NGOs")?;
    Ok(ctx.db().ngos().list(verified).await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<NgoSummary> {
    ctx.require_admin("viewing an NGO")?;
    details(ctx, id).await
}

async fn details(ctx: &AppContext, id: &str) -> ApiResult<NgoSummary> {
    ctx.db()
        .ngos()
        .get_details(id)
        .await?
        .ok_or_else(|| ApiError::not_found("NGO", id))
}

pub async fn set_verified(ctx: &AppContext, id: &str, verified: bool) -> ApiResult<NgoSummary> {
    ctx.require_admin("verifying NGOs")?;
    ctx.db().ngos().set_verified(id, verified).await?;
    let action = if verified { "verify_ngo" } else { "reject_ngo" };
    ctx.audit(action, "ngos", Some(id), None).await?;
    details(ctx, id).await
}

pub async fn set_resource_permission(
    ctx: &AppContext,
    id: &str,
    allowed: bool,
) -> ApiResult<NgoSummary> {
    ctx.require_admin("managing resource permission")?;
    if allowed {
        ctx.db().ngos().grant_resource_permission(id).await?;
    } else {
        ctx.db().ngos().revoke_resource_permission(id).await?;
    }
    let action = if allowed {
        "grant_resource_permission"
    } else {
        "revoke_resource_permission"
    };
    ctx.audit(action, "ngos", Some(id), None).await?;
    details(ctx, id).await
}

pub async fn set_document(ctx: &AppContext, id: &str, doc: &str) -> ApiResult<NgoSummary> {
    ctx.require_admin("recording NGO documents")?;
    ctx.db().ngos().set_registration_doc(id, doc).await?;
    ctx.audit(
        "set_registration_doc",
        "ngos",
        Some(id),
        Some(serde_json::json!({ "doc": doc })),
    )
    .await?;
    details(ctx, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::account::{register, AccountFields, RegisterCommand};
    use crate::commands::testing::{self, anonymous, test_db};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_verification_workflow() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;

        let account = register(
            &anonymous(&db),
            RegisterCommand::Ngo {
                account: AccountFields {
                    name: "Nusrat Jahan".to_string(),
                    email: "nusrat@riveraid.test".to_string(),
                    account_password: testing::PASSWORD.to_string(),
                    phone: None,
                    location: None,
                    language: None,
                },
                org: "River Aid".to_string(),
                doc: None,
                region: Some("Sylhet".to_string()),
                contact: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(list(&admin, Some(false)).await.unwrap().len(), 1);

        // no document yet
        let err = set_resource_permission(&admin, &account.id, true)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        set_document(&admin, &account.id, "docs/river-aid.pdf").await.unwrap();
        let ngo = set_resource_permission(&admin, &account.id, true).await.unwrap();
        assert!(ngo.verified);
        assert!(ngo.can_manage_resources);

        let ngo = set_verified(&admin, &account.id, false).await.unwrap();
        assert!(!ngo.verified);
        assert!(!ngo.can_manage_resources);

        assert!(matches!(
            set_verified(&admin, "missing", true).await.unwrap_err().code,
            ErrorCode::NotFound
        ));

        let actions: Vec<String> = db
            .audit()
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert!(actions.contains(&"grant_resource_permission".to_string()));
        assert!(actions.contains(&"reject_ngo".to_string()));
    }

    #[tokio::test]
    async fn test_only_admins_manage_ngos() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "Hope", false).await;
        let id = testing::user_id(&ngo);

        let err = set_verified(&ngo, &id, true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(list(&anonymous(&db), None).await.is_err());
    }
}
