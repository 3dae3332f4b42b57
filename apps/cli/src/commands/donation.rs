//! Donations received.

use clap::{Args, Subcommand};
use serde_json::json;

use relief_core::{Donation, DonationFields, Money};

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;

#[derive(Debug, Args)]
pub struct DonationArgs {
    #[command(subcommand)]
    pub command: DonationCommand,
}

#[derive(Debug, Subcommand)]
pub enum DonationCommand {
    /// Record a donation (donor and amount required)
    Add(DonationForm),
    List,
    Show { id: String },
    Update {
        id: String,
        #[command(flatten)]
        form: DonationForm,
    },
    Delete { id: String },
    /// Sum of all donations
    Total,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DonationForm {
    #[arg(long)]
    pub donor: Option<String>,
    /// e.g. 2500 or 2500.50
    #[arg(long)]
    pub amount: Option<Money>,
    /// cash, food, clothing...
    #[arg(long = "type")]
    pub donation_type: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

impl From<DonationForm> for DonationFields {
    fn from(form: DonationForm) -> Self {
        DonationFields {
            donor_name: form.donor,
            amount: form.amount,
            donation_type: form.donation_type,
            note: form.note,
        }
    }
}

pub async fn execute(ctx: &AppContext, args: DonationArgs) -> ApiResult<()> {
    match args.command {
        DonationCommand::Add(form) => {
            let donation = create(ctx, form.into()).await?;
            ctx.out().record(
                &donation,
                format!("Donation of {} from {} recorded", donation.amount(), donation.donor_name),
            )
        }
        DonationCommand::List => ctx.out().list(&list(ctx).await?),
        DonationCommand::Show { id } => {
            let donation = show(ctx, &id).await?;
            ctx.out().record(
                &donation,
                format!("{}: {} ({})", donation.donor_name, donation.amount(), donation.id),
            )
        }
        DonationCommand::Update { id, form } => {
            let donation = update(ctx, &id, form.into()).await?;
            ctx.out()
                .record(&donation, format!("Donation {} updated", donation.id))
        }
        DonationCommand::Delete { id } => {
            delete(ctx, &id).await?;
            ctx.out().message(format!("Donation {} deleted", id))
        }
        DonationCommand::Total => {
            let total = total(ctx).await?;
            let body = json!({ "total": total.to_string(), "cents": total.cents() });
            ctx.out().record(&body, format!("Total donations: {}", total))
        }
    }
}

pub async fn create(ctx: &AppContext, fields: DonationFields) -> ApiResult<Donation> {
    ctx.require_staff("recording donations")?;
    let donation = ctx.db().donations().create(&fields).await?;
    ctx.audit(
        "record_donation",
        "donations",
        Some(&donation.id),
        Some(json!({ "amount_cents": donation.amount_cents })),
    )
    .await?;
    Ok(donation)
}

pub async fn list(ctx: &AppContext) -> ApiResult<Vec<Donation>> {
    ctx.require_staff("viewing donations")?;
    Ok(ctx.db().donations().list().await?)
}

pub async fn show(ctx: &AppContext, id: &str) -> ApiResult<Donation> {
    ctx.require_staff("viewing donations")?;
    ctx.db()
        .donations()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Donation", id))
}

pub async fn update(ctx: &AppContext, id: &str, fields: DonationFields) -> ApiResult<Donation> {
    ctx.require_staff("editing donations")?;
    let donation = ctx.db().donations().update(id, &fields).await?;
    ctx.audit(
        "update_donation",
        "donations",
        Some(id),
        Some(json!({ "amount_cents": donation.amount_cents })),
    )
    .await?;
    Ok(donation)
}

pub async fn delete(ctx: &AppContext, id: &str) -> ApiResult<()> {
    ctx.require_admin("deleting donations")?;
    ctx.db().donations().delete(id).await?;
    ctx.audit("delete_donation", "donations", Some(id), None).await
}

pub async fn total(ctx: &AppContext) -> ApiResult<Money> {
    ctx.require_staff("viewing donations")?;
    Ok(ctx.db().donations().total().await?)
}
