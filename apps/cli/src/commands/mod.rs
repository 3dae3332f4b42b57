//! # Commands
//!
//! One module per area of the relief workflow. Each module exposes an
//! `XArgs` struct with its subcommands, an `execute` entry point that
//! prints, and one async handler per subcommand returning the records it
//! touched (so tests can call handlers directly).
//!
//! ## Who Runs What
//! ```text
//! victim     ──► sos send / track, feedback give, notify inbox
//! volunteer  ──► task mine / accept / decline / update
//! ngo        ──► task create / assign, resource * (once permitted)
//! admin      ──► ngo verify / grant, volunteer verify, report generate
//! ```

use clap::Subcommand;

use crate::error::ApiResult;
use crate::state::AppContext;

pub mod account;
pub mod alert;
pub mod audit;
pub mod camp;
pub mod dashboard;
pub mod disaster;
pub mod donation;
pub mod feedback;
pub mod ngo;
pub mod notify;
pub mod report;
pub mod resource;
pub mod shelter;
pub mod sos;
pub mod task;
pub mod volunteer;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the session credentials and show who is logged in
    Login,
    /// Create a volunteer, NGO, victim or admin account
    Register(account::RegisterArgs),
    /// Change the session's password
    Passwd(account::PasswdArgs),
    /// List accounts (admin)
    Users(account::UsersArgs),
    /// Verify NGOs and manage their resource permission
    Ngo(ngo::NgoArgs),
    /// List and verify volunteers
    Volunteer(volunteer::VolunteerArgs),
    /// Send, track and prioritize SOS requests
    Sos(sos::SosArgs),
    /// Resource stock, allocation and transfers
    Resource(resource::ResourceArgs),
    /// Create, assign and work on tasks
    Task(task::TaskArgs),
    /// Notify stakeholders and read the inbox
    Notify(notify::NotifyArgs),
    /// Rate help received on a request
    Feedback(feedback::FeedbackArgs),
    /// Export CSV reports
    Report(report::ReportArgs),
    /// Coordination counters
    Dashboard,
    /// Recent audit trail (admin)
    Audit(audit::AuditArgs),
    /// Disasters and the people affected
    Disaster(disaster::DisasterArgs),
    /// Relief camps and their inventory
    Camp(camp::CampArgs),
    /// Donations received
    Donation(donation::DonationArgs),
    /// Public alerts
    Alert(alert::AlertArgs),
    /// Shelters and occupancy
    Shelter(shelter::ShelterArgs),
}

pub async fn dispatch(ctx: &AppContext, command: Commands) -> ApiResult<()> {
    match command {
        Commands::Login => account::execute_login(ctx).await,
        Commands::Register(args) => account::execute_register(ctx, args).await,
        Commands::Passwd(args) => account::execute_passwd(ctx, args).await,
        Commands::Users(args) => account::execute_users(ctx, args).await,
        Commands::Ngo(args) => ngo::execute(ctx, args).await,
        Commands::Volunteer(args) => volunteer::execute(ctx, args).await,
        Commands::Sos(args) => sos::execute(ctx, args).await,
        Commands::Resource(args) => resource::execute(ctx, args).await,
        Commands::Task(args) => task::execute(ctx, args).await,
        Commands::Notify(args) => notify::execute(ctx, args).await,
        Commands::Feedback(args) => feedback::execute(ctx, args).await,
        Commands::Report(args) => report::execute(ctx, args).await,
        Commands::Dashboard => dashboard::execute(ctx).await,
        Commands::Audit(args) => audit::execute(ctx, args).await,
        Commands::Disaster(args) => disaster::execute(ctx, args).await,
        Commands::Camp(args) => camp::execute(ctx, args).await,
        Commands::Donation(args) => donation::execute(ctx, args).await,
        Commands::Alert(args) => alert::execute(ctx, args).await,
        Commands::Shelter(args) => shelter::execute(ctx, args).await,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Contexts over a shared in-memory database, one per role.

    use relief_core::{NewNgo, NewUser, NewVictim, NewVolunteer, Session};
    use relief_db::{Database, DbConfig};

    use crate::output::Output;
    use crate::state::{AppConfig, AppContext};

    pub const PASSWORD: &str = "relief-pass-1";

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn anonymous(db: &Database) -> AppContext {
        AppContext::new(db.clone(), AppConfig::default(), Output::default())
    }

    pub fn user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{}@relief.test", name.to_lowercase().replace(' ', ".")),
            phone: None,
            password: PASSWORD.to_string(),
            location: Some("Sylhet".to_string()),
            language: None,
        }
    }

    async fn session_for(db: &Database, email: &str) -> AppContext {
        let session: Session = db.users().authenticate(email, PASSWORD).await.unwrap();
        anonymous(db).with_session(session)
    }

    pub async fn admin(db: &Database) -> AppContext {
        let account = db.users().create_admin(&user("Coordinator")).await.unwrap();
        session_for(db, &account.email).await
    }

    pub async fn victim(db: &Database, name: &str) -> AppContext {
        let (account, _) = db
            .victims()
            .register(&user(name), &NewVictim::default())
            .await
            .unwrap();
        session_for(db, &account.email).await
    }

    pub async fn volunteer(db: &Database, name: &str) -> AppContext {
        let (account, _) = db
            .volunteers()
            .register(
                &user(name),
                &NewVolunteer {
                    skills: Some("first aid".to_string()),
                },
            )
            .await
            .unwrap();
        session_for(db, &account.email).await
    }

    /// Verified NGO, optionally allowed to manage resources.
    pub async fn ngo(db: &Database, org: &str, manages_resources: bool) -> AppContext {
        let (account, _) = db
            .ngos()
            .register(
                &user(org),
                &NewNgo {
                    org_name: org.to_string(),
                    registration_doc: Some(format!("docs/{}.pdf", org.to_lowercase())),
                    region: Some("Sylhet".to_string()),
                    contact_person: None,
                },
            )
            .await
            .unwrap();
        db.ngos().set_verified(&account.id, true).await.unwrap();
        if manages_resources {
            db.ngos().grant_resource_permission(&account.id).await.unwrap();
        }
        session_for(db, &account.email).await
    }

    pub fn user_id(ctx: &AppContext) -> String {
        ctx.session().unwrap().user_id.clone()
    }
}
