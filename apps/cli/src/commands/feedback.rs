//! Victims rate how their requests were handled.

use clap::{Args, Subcommand};

use relief_core::{Feedback, NewFeedback, Role, SosRequestView};

use crate::error::ApiResult;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct FeedbackArgs {
    #[command(subcommand)]
    pub command: FeedbackCommand,
}

#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// Your requests that can be rated (victim)
    Eligible,
    /// Rate one of your requests from 1 to 5 (victim)
    Give {
        request: String,
        #[arg(long)]
        rating: i64,
        #[arg(long)]
        comments: Option<String>,
    },
    /// Feedback received (admin/NGO)
    List {
        #[arg(long)]
        request: Option<String>,
    },
}

pub async fn execute(ctx: &AppContext, args: FeedbackArgs) -> ApiResult<()> {
    match args.command {
        FeedbackCommand::Eligible => ctx.out().list(&eligible(ctx).await?),
        FeedbackCommand::Give {
            request,
            rating,
            comments,
        } => {
            let feedback = give(
                ctx,
                &NewFeedback {
                    request_id: request,
                    rating,
                    comments,
                },
            )
            .await?;
            ctx.out()
                .record(&feedback, "Thank you for your feedback")
        }
        FeedbackCommand::List { request } => ctx.out().list(&list(ctx, request.as_deref()).await?),
    }
}

pub async fn eligible(ctx: &AppContext) -> ApiResult<Vec<SosRequestView>> {
    let session = ctx.require_role(&[Role::Victim], "rating requests")?;
    Ok(ctx.db().sos().feedback_eligible(&session.user_id).await?)
}

pub async fn give(ctx: &AppContext, form: &NewFeedback) -> ApiResult<Feedback> {
    let session = ctx.require_role(&[Role::Victim], "rating requests")?;
    Ok(ctx.db().feedback().submit(&session.user_id, form).await?)
}

pub async fn list(ctx: &AppContext, request_id: Option<&str>) -> ApiResult<Vec<Feedback>> {
    ctx.require_staff("reading feedback")?;
    let feedback = match request_id {
        Some(id) => ctx.db().feedback().list_for_request(id).await?,
        None => ctx.db().feedback().list().await?,
    };
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sos::{self, SendArgs};
    use crate::commands::testing::{self, test_db};
    use crate::error::ErrorCode;
    use relief_core::SosStatus;

    fn rating(request_id: &str, rating: i64) -> NewFeedback {
        NewFeedback {
            request_id: request_id.to_string(),
            rating,
            comments: Some("Boat came quickly".to_string()),
        }
    }

    #[tokio::test]
    async fn test_feedback_after_completion_only_once() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let victim = testing::victim(&db, "Rahim").await;
        let neighbour = testing::victim(&db, "Salma").await;

        let request = sos::send(
            &victim,
            SendArgs {
                location: "Derai".to_string(),
                need: "rescue".to_string(),
                description: "Stranded on the roof".to_string(),
                urgency: None,
                latitude: None,
                longitude: None,
            },
        )
        .await
        .unwrap();

        // still pending
        assert!(eligible(&victim).await.unwrap().is_empty());
        let err = give(&victim, &rating(&request.id, 5)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        sos::set_status(&admin, &request.id, SosStatus::Completed).await.unwrap();
        assert_eq!(eligible(&victim).await.unwrap().len(), 1);

        let err = give(&neighbour, &rating(&request.id, 4)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        let err = give(&victim, &rating(&request.id, 6)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        give(&victim, &rating(&request.id, 5)).await.unwrap();
        let err = give(&victim, &rating(&request.id, 4)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        assert_eq!(list(&admin, Some(&request.id)).await.unwrap()[0].rating, 5);
        assert!(list(&victim, None).await.is_err());
    }
}
