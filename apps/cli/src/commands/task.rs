//! # Task Commands
//!
//! ```text
//! staff:      create ──► unassigned ──► assign ──► assigned
//! volunteer:                              accept ──┤     └── decline ──► unassigned
//!                                                  ▼
//!                            update ──► in_progress ──► completed | cancelled
//! ```

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{
    rules, AvailableTask, DashboardStats, NewTask, Role, Task, TaskHistory, TaskStatus, TaskType,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create an unassigned task (admin/NGO)
    Create(CreateArgs),
    /// Give an unassigned task to an available volunteer (admin/NGO)
    Assign {
        id: String,
        #[arg(long)]
        volunteer: String,
    },
    /// Unassigned tasks, most urgent first
    Available,
    /// All tasks (admin/NGO)
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Call off a task that is not finished (admin/NGO)
    Cancel {
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Task counters (admin/NGO)
    Stats,
    /// Tasks assigned to you (volunteer)
    Mine {
        #[arg(long)]
        status: Vec<TaskStatus>,
    },
    /// Start an assigned task (volunteer)
    Accept { id: String },
    /// Hand an assigned task back (volunteer)
    Decline { id: String },
    /// Move your task to in_progress, completed or cancelled (volunteer)
    Update {
        id: String,
        status: TaskStatus,
        #[arg(long)]
        note: Option<String>,
    },
    /// Status history of a task
    History { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// delivery, rescue, medical, assessment or other
    #[arg(long = "type")]
    pub task_type: Option<TaskType>,
    /// SOS request this task serves
    #[arg(long)]
    pub request: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
}

pub async fn execute(ctx: &AppContext, args: TaskArgs) -> ApiResult<()> {
    match args.command {
        TaskCommand::Create(create_args) => {
            let task = create(ctx, create_args).await?;
            ctx.out()
                .record(&task, format!("Task {} created: {}", task.id, task.title))
        }
        TaskCommand::Assign { id, volunteer } => {
            let task = assign(ctx, &id, &volunteer).await?;
            ctx.out()
                .record(&task, format!("Task {} assigned to {}", task.id, volunteer))
        }
        TaskCommand::Available => ctx.out().list(&available(ctx).await?),
        TaskCommand::List { status } => ctx.out().list(&list(ctx, status).await?),
        TaskCommand::Cancel { id, note } => {
            let task = cancel(ctx, &id, note.as_deref()).await?;
            ctx.out().record(&task, format!("Task {} cancelled", task.id))
        }
        TaskCommand::Stats => {
            let stats = stats(ctx).await?;
            ctx.out().detail(
                &stats,
                &[
                    ("total tasks", stats.total_tasks.to_string()),
                    ("unassigned", stats.unassigned_tasks.to_string()),
                    ("in progress", stats.in_progress_tasks.to_string()),
                    ("completed", stats.completed_tasks.to_string()),
                    ("completed today", stats.tasks_completed_today.to_string()),
                ],
            )
        }
        TaskCommand::Mine { status } => ctx.out().list(&mine(ctx, &status).await?),
        TaskCommand::Accept { id } => {
            let task = accept(ctx, &id).await?;
            ctx.out().record(&task, format!("Task {} is in progress", task.id))
        }
        TaskCommand::Decline { id } => {
            let task = decline(ctx, &id).await?;
            ctx.out()
                .record(&task, format!("Task {} handed back", task.id))
        }
        TaskCommand::Update { id, status, note } => {
            let task = update(ctx, &id, status, note.as_deref()).await?;
            ctx.out()
                .record(&task, format!("Task {} is now {}", task.id, task.status))
        }
        TaskCommand::History { id } => ctx.out().list(&history(ctx, &id).await?),
    }
}

pub async fn create(ctx: &AppContext, args: CreateArgs) -> ApiResult<Task> {
    let session = ctx.require_staff("creating tasks")?;
    let task = ctx
        .db()
        .tasks()
        .create(&NewTask {
            title: args.title,
            description: args.description,
            task_type: args.task_type,
            related_request_id: args.request,
            location: args.location,
            created_by: Some(session.user_id.clone()),
        })
        .await?;
    ctx.audit(
        "create_task",
        "tasks",
        Some(&task.id),
        Some(json!({ "title": task.title, "request_id": task.related_request_id })),
    )
    .await?;
    Ok(task)
}

pub async fn assign(ctx: &AppContext, id: &str, volunteer_id: &str) -> ApiResult<Task> {
    let session = ctx.require_staff("assigning tasks")?;
    let note = rules::assignment_note(&session.name);
    let task = ctx
        .db()
        .tasks()
        .assign(id, volunteer_id, Some(&session.user_id), Some(&note))
        .await?;
    ctx.audit(
        "assign_task",
        "tasks",
        Some(id),
        Some(json!({ "volunteer_id": volunteer_id })),
    )
    .await?;
    Ok(task)
}

pub async fn available(ctx: &AppContext) -> ApiResult<Vec<AvailableTask>> {
    ctx.require_role(&[Role::Admin, Role::Ngo, Role::Volunteer], "viewing available tasks")?;
    Ok(ctx.db().tasks().list_available().await?)
}

pub async fn list(ctx: &AppContext, status: Option<TaskStatus>) -> ApiResult<Vec<Task>> {
    ctx.require_staff("listing tasks")?;
    Ok(ctx.db().tasks().list(status).await?)
}

pub async fn cancel(ctx: &AppContext, id: &str, note: Option<&str>) -> ApiResult<Task> {
    let session = ctx.require_staff("cancelling tasks")?;
    let task = ctx
        .db()
        .tasks()
        .transition(id, TaskStatus::Cancelled, Some(&session.user_id), None, note)
        .await?;
    ctx.audit("cancel_task", "tasks", Some(id), None).await?;
    Ok(task)
}

pub async fn stats(ctx: &AppContext) -> ApiResult<DashboardStats> {
    ctx.require_staff("viewing task statistics")?;
    Ok(ctx.db().dashboard().stats().await?)
}

pub async fn mine(ctx: &AppContext, statuses: &[TaskStatus]) -> ApiResult<Vec<Task>> {
    let session = ctx.require_role(&[Role::Volunteer], "viewing your tasks")?;
    Ok(ctx
        .db()
        .tasks()
        .list_for_volunteer(&session.user_id, statuses)
        .await?)
}

pub async fn accept(ctx: &AppContext, id: &str) -> ApiResult<Task> {
    let session = ctx.require_role(&[Role::Volunteer], "accepting tasks")?;
    Ok(ctx.db().tasks().accept(id, &session.user_id).await?)
}

pub async fn decline(ctx: &AppContext, id: &str) -> ApiResult<Task> {
    let session = ctx.require_role(&[Role::Volunteer], "declining tasks")?;
    Ok(ctx.db().tasks().decline(id, &session.user_id).await?)
}

pub async fn update(
    ctx: &AppContext,
    id: &str,
    status: TaskStatus,
    note: Option<&str>,
) -> ApiResult<Task> {
    let session = ctx.require_role(&[Role::Volunteer], "updating task status")?;
    let user = Some(session.user_id.as_str());
    Ok(ctx.db().tasks().transition(id, status, user, user, note).await?)
}

pub async fn history(ctx: &AppContext, id: &str) -> ApiResult<Vec<TaskHistory>> {
    ctx.require_session()?;
    if ctx.db().tasks().get(id).await?.is_none() {
        return Err(ApiError::not_found("Task", id));
    }
    Ok(ctx.db().tasks().history(id).await?)
}
