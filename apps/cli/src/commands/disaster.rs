//! Disaster events and the people affected by them.
//!
//! Anyone logged in can read; admins and NGOs record and edit.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{AffectedPerson, AffectedPersonFields, Disaster, DisasterFields};

use crate::error::{ApiError, ApiResult};
use crate::output::opt;
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct DisasterArgs {
    #[command(subcommand)]
    pub command: DisasterCommand,
}

#[derive(Debug, Subcommand)]
pub enum DisasterCommand {
    /// Record a disaster (name required)
    Add(DisasterForm),
    List,
    Show { id: String },
    /// Change the given fields
    Update {
        id: String,
        #[command(flatten)]
        form: DisasterForm,
    },
    Delete { id: String },
    /// People affected by disasters
    People(PeopleArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct DisasterForm {
    #[arg(long)]
    pub name: Option<String>,
    /// Flood, cyclone, landslide...
    #[arg(long = "type")]
    pub disaster_type: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub severity: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

impl From<DisasterForm> for DisasterFields {
    fn from(form: DisasterForm) -> Self {
        DisasterFields {
            name: form.name,
            disaster_type: form.disaster_type,
            location: form.location,
            severity: form.severity,
            status: form.status,
        }
    }
}

#[derive(Debug, Args)]
pub struct PeopleArgs {
    #[command(subcommand)]
    pub command: PeopleCommand,
}

#[derive(Debug, Subcommand)]
pub enum PeopleCommand {
    /// Record an affected person (name required)
    Add(PersonForm),
    List {
        #[arg(long)]
        disaster: Option<String>,
    },
    Update {
        id: String,
        #[command(flatten)]
        form: PersonForm,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct PersonForm {
    #[arg(long)]
    pub disaster: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<i64>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub injury: Option<String>,
    /// Food, shelter, medical...
    #[arg(long)]
    pub aid: Option<String>,
}

impl From<PersonForm> for AffectedPersonFields {
    fn from(form: PersonForm) -> Self {
        AffectedPersonFields {
            disaster_id: form.disaster,
            name: form.name,
            age: form.age,
            gender: form.gender,
            injury_status: form.injury,
            aid_required: form.aid,
        }
    }
}

pub async fn execute(ctx: &AppContext, args: DisasterArgs) -> ApiResult<()> {
    match args.command {
        DisasterCommand::Add(form) => {
            let disaster = create(ctx, form.into()).await?;
            ctx.out()
                .record(&disaster, format!("Disaster {} recorded ({})", disaster.name, disaster.id))
        }
        DisasterCommand::List => ctx.out().list(&list(ctx).await?),
        DisasterCommand::Show { id } => {
            let disaster = show(ctx, &id).await?;
            ctx.out().detail(
                &disaster,
                &[
                    ("id", disaster.id.clone()),
                    ("name", disaster.name.clone()),
                    ("type", opt(&disaster.disaster_type)),
                    ("location", opt(&disaster.location)),
                    ("severity", opt(&disaster.severity)),
                    ("status", opt(&disaster.status)),
                ],
            )
        }
        DisasterCommand::Update { id, form } => {
            let disaster = update(ctx, &id, form.into()).await?;
            ctx.out()
                .record(&disaster, format!("Disaster {} updated", disaster.id))
        }
        DisasterCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Disaster {} deleted", id))
        }
        DisasterCommand::People(args) => match args.command {
            PeopleCommand::Add(form) => {
                let person = add_person(ctx, form.into()).await?;
                ctx.out()
                    .record(&person, format!("{} recorded ({})", person.name, person.id))
            }
            PeopleCommand::List { disaster } => {
                ctx.out().list(&people(ctx, disaster.as_deref()).await?)
            }
            PeopleCommand::Update { id, form } => {
                let person = update_person(ctx, &id, form.into()).await?;
                ctx.out().record(&person, format!("{} updated", person.name))
            }
            PeopleCommand::Delete { id } => {
                delete_person(ctx, &id).await?;
                ctx.out().message(format!("Record {} deleted", id))
            }
        },
    }
}

pub async fn create(ctx: &AppContext, fields: DisasterFields) -> ApiResult<Disaster> {
    ctx.require_staff("recording disasters")?;
    let disaster = ctx.db().disasters().create(&fields).await?;
    ctx.audit(
        "create_disaster",
        "disasters",
        Some(&disaster.id),
        Some(json!({ "name": disaster.name })),
    )
    .await?;
    Ok(disaster)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<Disaster>> {
    ctx.require_session()?;
    Ok(ctx.db().disasters().list().await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<Disaster> {
    ctx.require_session()?;
    ctx.db()
        .disasters()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Disaster", id))
}

pub async fn update(ctx: &AppContext, id: &str, fields: DisasterFields) -> ApiResult<Disaster> {
    ctx.require_staff("editing disasters")?;
    let disaster = ctx.db().disasters().update(id, &fields).await?;
    ctx.audit("update_disaster", "disasters", Some(id), Some(json!(fields)))
        .await?;
    Ok(disaster)
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("deleting disasters")?;
    ctx.db().disasters().delete(id).await?;
    ctx.audit("delete_disaster", "disasters", Some(id), None).await
}

pub async fn add_person(ctx: &AppContext, fields: AffectedPersonFields) -> ApiResult<AffectedPerson> {
    ctx.require_staff("recording affected people")?;
    let person = ctx.db().disasters().add_person(&fields).await?;
    ctx.audit(
        "add_affected_person",
        "affected_people",
        Some(&person.id),
        Some(json!({ "disaster_id": person.disaster_id })),
    )
    .await?;
    Ok(person)
}

pub async fn people(ctx: &AppContext, disaster_id: Option<&str>) -> ApiResult<Vec<AffectedPerson>> {
    ctx.require_session()?;
    Ok(ctx.db().disasters().list_by_disaster(disaster_id).await?)
}

pub async fn update_person(
    ctx: &AppContext,
    id: &str,
    fields: AffectedPersonFields,
) -> ApiResult<AffectedPerson> {
    ctx.require_staff("editing affected people")?;
    let person = ctx.db().disasters().update_person(id, &fields).await?;
    ctx.audit("update_affected_person", "affected_people", Some(id), None)
        .await?;
    Ok(person)
}

pub async fn delete_person(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_staff("deleting affected people")?;
    ctx.db().disasters().delete_person(id).await?;
    ctx.audit("delete_affected_person", "affected_people", Some(id), None)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, test_db};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_disaster_and_people_records() {
        let db = test_db().await;
        let ngo = testing::ngo(&db, "River Aid", false).await;
        let victim = testing::victim(&db, "Rahim").await;

        let flood = create(
            &ngo,
            DisasterForm {
                name: Some("Sylhet flash flood".to_string()),
                disaster_type: Some("flood".to_string()),
                severity: Some("severe".to_string()),
                ..Default::default()
            }
            .into(),
        )
        .await
        .unwrap();

        let person = add_person(
            &ngo,
            PersonForm {
                disaster: Some(flood.id.clone()),
                name: Some("Karim".to_string()),
                age: Some(62),
                aid: Some("medical".to_string()),
                ..Default::default()
            }
            .into(),
        )
        .await
        .unwrap();
        assert_eq!(people(&victim, Some(&flood.id)).await.unwrap().len(), 1);

        let err = add_person(
            &ngo,
            PersonForm {
                name: Some("Nobody".to_string()),
                age: Some(-3),
                ..Default::default()
            }
            .into(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let updated = update(
            &ngo,
            &flood.id,
            DisasterForm {
                status: Some("receding".to_string()),
                ..Default::default()
            }
            .into(),
        )
        .await
        .unwrap();
        assert_eq!(updated.status.as_deref(), Some("receding"));
        assert_eq!(updated.name, "Sylhet flash flood");

        // victims can read but not edit
        assert_eq!(list(&victim).await.unwrap().len(), 1);
        assert_eq!(delete(&victim, &flood.id).await.unwrap_err().code, ErrorCode::Forbidden);

        delete_person(&ngo, &person.id).await.unwrap();
        delete(&ngo, &flood.id).await.unwrap();
        assert_eq!(show(&ngo, &flood.id).await.unwrap_err().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_people_subcommand_dispatch() {
        let db = test_db().await;
        let victim = testing::victim(&db, "Rahim").await;

        let listing = DisasterArgs {
            command: DisasterCommand::People(PeopleArgs {
                command: PeopleCommand::List { disaster: None },
            }),
        };
        execute(&victim, listing).await.unwrap();

        let adding = DisasterArgs {
            command: DisasterCommand::People(PeopleArgs {
                command: PeopleCommand::Add(PersonForm {
                    name: Some("Karim".to_string()),
                    ..Default::default()
                }),
            }),
        };
        assert_eq!(execute(&victim, adding).await.unwrap_err().code, ErrorCode::Forbidden);
    }
}
