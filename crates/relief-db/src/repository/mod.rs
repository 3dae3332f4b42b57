//! # Repositories
//!
//! One repository per aggregate. Each holds a pool clone and is created
//! through [`Database`](crate::Database) accessors.
//!
//! ## Pattern
//! ```text
//! pub struct XRepository { pool: SqlitePool }
//!
//! impl XRepository {
//!     pub fn new(pool) -> Self
//!     pub async fn create(&self, form) -> DbResult<X>   ← validate, INSERT
//!     pub async fn get(&self, id) -> DbResult<Option<X>>
//!     pub async fn update(&self, id, patch) -> DbResult<X> ← COALESCE(?, col)
//!     pub async fn delete(&self, id) -> DbResult<()>  ← 0 rows = NotFound
//! }
//! ```
//!
//! Multi-row workflows open a transaction with `pool.begin()` and run every
//! statement on `&mut *tx`.

pub mod alert;
pub mod audit;
pub mod camp;
pub mod dashboard;
pub mod disaster;
pub mod donation;
pub mod feedback;
pub mod ngo;
pub mod notification;
pub mod report;
pub mod resource;
pub mod shelter;
pub mod sos;
pub mod task;
pub mod user;
pub mod victim;
pub mod volunteer;

pub use alert::AlertRepository;
pub use audit::AuditRepository;
pub use camp::CampRepository;
pub use dashboard::DashboardRepository;
pub use disaster::DisasterRepository;
pub use donation::DonationRepository;
pub use feedback::FeedbackRepository;
pub use ngo::NgoRepository;
pub use notification::NotificationRepository;
pub use report::ReportRepository;
pub use resource::ResourceRepository;
pub use shelter::ShelterRepository;
pub use sos::SosRepository;
pub use task::TaskRepository;
pub use user::UserRepository;
pub use victim::VictimRepository;
pub use volunteer::VolunteerRepository;

/// Fresh UUID v4 primary key.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod testing {
    use relief_core::{
        NewNgo, NewSosRequest, NewUser, NewVictim, NewVolunteer, SosRequest, UrgencyLevel,
        UserAccount,
    };

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            password: "password123".to_string(),
            location: Some("Sylhet".to_string()),
            language: None,
        }
    }

    pub async fn admin(db: &Database) -> UserAccount {
        db.users()
            .create_admin(&new_user("Admin", "admin@relief.test"))
            .await
            .unwrap()
    }

    pub async fn victim(db: &Database, name: &str) -> UserAccount {
        let email = format!("{}@victim.test", name.to_lowercase());
        db.victims()
            .register(&new_user(name, &email), &NewVictim::default())
            .await
            .unwrap()
            .0
    }

    pub async fn volunteer(db: &Database, name: &str) -> UserAccount {
        let email = format!("{}@volunteer.test", name.to_lowercase());
        db.volunteers()
            .register(&new_user(name, &email), &NewVolunteer::default())
            .await
            .unwrap()
            .0
    }

    pub async fn ngo(db: &Database, org: &str) -> UserAccount {
        let email = format!("{}@ngo.test", org.to_lowercase().replace(' ', "."));
        db.ngos()
            .register(
                &new_user(&format!("{} contact", org), &email),
                &NewNgo {
                    org_name: org.to_string(),
                    registration_doc: Some(format!("docs/{}.pdf", org)),
                    region: Some("North".to_string()),
                    contact_person: None,
                },
            )
            .await
            .unwrap()
            .0
    }

    pub fn flood_request(urgency: UrgencyLevel) -> NewSosRequest {
        NewSosRequest {
            location: "Companiganj, Sylhet".to_string(),
            latitude: Some(25.06),
            longitude: Some(91.75),
            type_of_need: "rescue".to_string(),
            description: "Family of five on a rooftop".to_string(),
            urgency: Some(urgency),
        }
    }

    pub async fn sos(db: &Database, victim_id: &str, urgency: UrgencyLevel) -> SosRequest {
        db.sos()
            .submit(victim_id, &flood_request(urgency))
            .await
            .unwrap()
    }
}
