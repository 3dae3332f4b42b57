//! Audit trail of privileged actions (admin).

use clap::Args;

use relief_core::AuditLog;

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// How many entries, newest first
    #[arg(long, default_value_t = 50)]
    pub limit: i64,
}

pub async fn execute(ctx: &AppContext, args: AuditArgs) -> ApiResult<()> {
    ctx.out().list(&recent(ctx, args.limit).await?)
}

pub async fn recent(ctx: &AppContext, limit: i64) -> ApiResult<Vec<AuditLog>> {
    ctx.require_admin("reading the audit log")?;
    if limit <= 0 {
        return Err(ApiError::validation("--limit must be positive"));
    }
    Ok(ctx.db().audit().list_recent(limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, test_db};
    use crate::commands::volunteer;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_recent_entries_name_the_actor() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let sara = testing::volunteer(&db, "Sara").await;

        volunteer::set_verified(&admin, &testing::user_id(&sara), true)
            .await
            .unwrap();

        let log = recent(&admin, 5).await.unwrap();
        assert_eq!(log[0].action, "verify_volunteer");
        assert_eq!(log[0].actor_user_id, Some(testing::user_id(&admin)));

        assert_eq!(recent(&admin, 0).await.unwrap_err().code, ErrorCode::ValidationError);
        assert_eq!(recent(&sara, 5).await.unwrap_err().code, ErrorCode::Forbidden);
    }
}
