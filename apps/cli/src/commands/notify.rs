//! In-app notifications: broadcasts by staff, an inbox for everyone.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{NewNotification, Notification, NotificationChannel, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotifyCommand {
    /// Message every user of a role, or one user with --to (admin/NGO)
    Send {
        #[arg(long, required_unless_present = "to")]
        role: Option<Role>,
        /// Recipient user id
        #[arg(long, conflicts_with = "role")]
        to: Option<String>,
        #[arg(long)]
        message: String,
        /// in_app, email or sms (default in_app)
        #[arg(long)]
        channel: Option<NotificationChannel>,
    },
    /// Your messages, newest first
    Inbox,
    /// Mark one of your messages as read
    Read { id: String },
}

pub async fn execute(ctx: &AppContext, args: NotifyArgs) -> ApiResult<()> {
    match args.command {
        NotifyCommand::Send {
            role,
            to,
            message,
            channel,
        } => {
            let channel = channel.unwrap_or_default();
            match (role, to) {
                (_, Some(user_id)) => {
                    let notification = send_direct(ctx, &user_id, &message, channel).await?;
                    ctx.out()
                        .record(&notification, format!("Message {} queued", notification.id))
                }
                (Some(role), None) => {
                    let count = broadcast(ctx, role, &message, channel).await?;
                    ctx.out().message(format!("Notification sent to {} {}(s)", count, role))
                }
                (None, None) => Err(ApiError::validation("--role or --to is required")),
            }
        }
        NotifyCommand::Inbox => ctx.out().list(&inbox(ctx).await?),
        NotifyCommand::Read { id } => {
            mark_read(ctx, &id).await?;
            ctx.out().message(format!("Message {} marked read", id))
        }
    }
}

/// Returns how many users were reached.
pub async fn broadcast(
    ctx: &AppContext,
    role: Role,
    message: &str,
    channel: NotificationChannel,
) -> ApiResult<usize> {
    ctx.require_staff("sending notifications")?;
    let count = ctx
        .db()
        .notifications()
        .broadcast_to_role(role, message, channel)
        .await?;
    if count == 0 {
        return Err(ApiError::validation(format!("No {} accounts found", role)));
    }
    ctx.audit(
        "broadcast",
        "notifications",
        None,
        Some(json!({ "role": role, "channel": channel, "recipients": count })),
    )
    .await?;
    Ok(count)
}

pub async fn send_direct(
    ctx: &AppContext,
    user_id: &str,
    message: &str,
    channel: NotificationChannel,
) -> ApiResult<Notification> {
    ctx.require_staff("sending notifications")?;
    let recipient = ctx
        .db()
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", user_id))?;

    let notification = ctx
        .db()
        .notifications()
        .create(&NewNotification {
            recipient_user_id: Some(recipient.id),
            recipient_role: Some(recipient.role),
            channel,
            message: message.to_string(),
            meta: None,
        })
        .await?;
    ctx.audit(
        "notify_user",
        "notifications",
        Some(&notification.id),
        Some(json!({ "user_id": user_id })),
    )
    .await?;
    Ok(notification)
}

pub async fn inbox(ctx: &AppContext) -> ApiResult<Vec<Notification>> {
    let session = ctx.require_session()?;
    Ok(ctx
        .db()
        .notifications()
        .list_for_user(&session.user_id, session.role)
        .await?)
}

/// Only messages in the caller's own inbox can be marked.
pub async fn mark_read(ctx: &AppContext, id: &str) -> ApiResult<()> {
    if !inbox(ctx).await?.iter().any(|n| n.id == id) {
        return Err(ApiError::not_found("Notification", id));
    }
    Ok(ctx.db().notifications().mark_read(id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, test_db};
    use crate::error::ErrorCode;
    use relief_core::NotificationStatus;

    #[tokio::test]
    async fn test_broadcast_reaches_role_inboxes() {
        let db = test_db().await;
        let admin = testing::admin(&db).await;
        let sara = testing::volunteer(&db, "Sara").await;
        let omar = testing::volunteer(&db, "Omar").await;
        let victim = testing::victim(&db, "Rahim").await;

        let count = broadcast(&admin, Role::Volunteer, "Report to the depot at 6am", NotificationChannel::Sms)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let messages = inbox(&sara).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, NotificationChannel::Sms);
        assert_eq!(inbox(&omar).await.unwrap().len(), 1);
        assert!(inbox(&victim).await.unwrap().is_empty());

        // nobody holds the role
        let err = broadcast(&admin, Role::Ngo, "Meeting", NotificationChannel::InApp)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = broadcast(&victim, Role::Volunteer, "Help", NotificationChannel::InApp)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_direct_message_and_read() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "River Aid", false).await;
        let victim = testing::victim(&db, "Rahim").await;
        let other = testing::victim(&db, "Salma").await;

        let sent = send_direct(
            &ngo,
            &testing::user_id(&victim),
            "Boat arriving within the hour",
            NotificationChannel::InApp,
        )
        .await
        .unwrap();
        assert_eq!(sent.status, NotificationStatus::Pending);

        let err = mark_read(&other, &sent.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        mark_read(&victim, &sent.id).await.unwrap();
        assert_eq!(inbox(&victim).await.unwrap()[0].status, NotificationStatus::Read);

        let err = send_direct(&ngo, "nobody", "Hello", NotificationChannel::InApp)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
