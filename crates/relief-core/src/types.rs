//! # Domain Types
//!
//! Persisted records, the inputs forms submit, and partial updates.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Records                                  │
//! │                                                                         │
//! │   UserAccount ──┬── Ngo        (same id, role = ngo)                   │
//! │                 ├── Volunteer  (same id, role = volunteer)             │
//! │                 └── Victim     (same id, role = victim)                │
//! │                                                                         │
//! │   Victim ──► SosRequest ──► Feedback                                   │
//! │                  │                                                      │
//! │                  ├──► Task ──► TaskHistory                             │
//! │                  └──► ResourceAllocation ◄── ResourceStock ◄─ Type     │
//! │                                                  │                      │
//! │                                                  └──► ResourceTransfer │
//! │                                                                         │
//! │   Notification, AuditLog, Report, Shelter                              │
//! │   Disaster ─► AffectedPerson, ReliefCamp ─► InventoryItem,             │
//! │   Donation, Alert                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string. NGO, volunteer and victim rows reuse the user id.
//! - `New*`: what a form submits.
//! - `*Patch`: optional fields; `None` leaves the column unchanged.
//! - `*View`: read-only join used by listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::status::*;

// =============================================================================
// Accounts
// =============================================================================

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserAccount {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Login email, unique across accounts.
    pub email: String,

    pub phone: Option<String>,

    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: Role,

    /// Free-text home location.
    pub location: Option<String>,

    /// Preferred UI language code.
    pub language: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration form for any account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Plain text; hashed before it is stored.
    pub password: String,
    pub location: Option<String>,
    pub language: Option<String>,
}

/// Profile edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
}

// =============================================================================
// NGOs
// =============================================================================

/// Relief organization details, keyed by the NGO account's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Ngo {
    pub id: String,
    pub org_name: String,

    /// Reference to the uploaded registration document.
    /// Required before resource permissions can be granted.
    pub registration_doc: Option<String>,

    pub region: Option<String>,
    pub contact_person: Option<String>,
    pub verified: bool,
    pub can_manage_resources: bool,
    pub created_at: DateTime<Utc>,
}

/// NGO joined with its account, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NgoSummary {
    pub id: String,
    pub org_name: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub contact_person: Option<String>,
    pub registration_doc: Option<String>,
    pub verified: bool,
    pub can_manage_resources: bool,
}

/// NGO-specific registration fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNgo {
    pub org_name: String,
    pub registration_doc: Option<String>,
    pub region: Option<String>,
    pub contact_person: Option<String>,
}

// =============================================================================
// Volunteers & Victims
// =============================================================================

/// Volunteer details, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Volunteer {
    pub id: String,
    /// Comma separated skills / roles the volunteer offers.
    pub skills: Option<String>,
    pub verified: bool,
    pub status: VolunteerStatus,
    pub last_active: Option<DateTime<Utc>>,
}

/// Volunteer joined with its account, for the assignment screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VolunteerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Option<String>,
    pub verified: bool,
    pub status: VolunteerStatus,
    pub last_active: Option<DateTime<Utc>>,
}

/// Volunteer-specific registration fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVolunteer {
    pub skills: Option<String>,
}

/// Victim details, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Victim {
    pub id: String,
    pub verified_contact: bool,
    pub vulnerability_notes: Option<String>,
}

/// Victim-specific registration fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVictim {
    pub vulnerability_notes: Option<String>,
}

// =============================================================================
// SOS Requests
// =============================================================================

/// Emergency request submitted by a victim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SosRequest {
    pub id: String,
    pub victim_id: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// What is needed: food, water, medical, rescue...
    pub type_of_need: String,
    pub description: String,
    pub urgency: UrgencyLevel,
    pub status: SosStatus,
    /// Derived from urgency; higher sorts first.
    pub priority_score: i64,
    pub assigned_volunteer_id: Option<String>,
    pub assigned_ngo_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SOS form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSosRequest {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub type_of_need: String,
    pub description: String,
    /// Defaults to low.
    pub urgency: Option<UrgencyLevel>,
}

/// Request joined with the names of everyone involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SosRequestView {
    pub id: String,
    pub victim_id: String,
    pub victim_name: String,
    pub location: String,
    pub type_of_need: String,
    pub description: String,
    pub urgency: UrgencyLevel,
    pub status: SosStatus,
    pub priority_score: i64,
    pub volunteer_name: Option<String>,
    pub ngo_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Resources
// =============================================================================

/// Catalogue entry: water, food kit, tent...
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResourceType {
    pub id: String,
    pub name: String,
    /// Counting unit: litre, box, piece.
    pub unit: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewResourceType {
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// Units of one resource type held at one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResourceStock {
    pub id: String,
    pub resource_type_id: String,
    /// NGO holding the stock; `None` for central depots.
    pub owner_ngo_id: Option<String>,
    pub quantity: i64,
    pub location: Option<String>,
    pub status: ResourceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewResourceStock {
    pub resource_type_id: String,
    pub owner_ngo_id: Option<String>,
    pub quantity: i64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceStockPatch {
    pub quantity: Option<i64>,
    pub location: Option<String>,
    pub status: Option<ResourceStatus>,
}

/// Stock joined with its type and owner, for the tracking screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResourceStockView {
    pub id: String,
    pub resource_type_id: String,
    pub type_name: String,
    pub unit: String,
    pub owner_ngo_id: Option<String>,
    pub owner_name: Option<String>,
    pub quantity: i64,
    pub location: Option<String>,
    pub status: ResourceStatus,
    pub updated_at: DateTime<Utc>,
}

/// Units moved out of a stock record toward another owner or place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResourceTransfer {
    pub id: String,
    pub stock_id: String,
    pub from_ngo_id: Option<String>,
    pub to_ngo_id: Option<String>,
    pub to_location: Option<String>,
    pub quantity: i64,
    pub status: TransferStatus,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Transfer form. At least one destination is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTransfer {
    pub stock_id: String,
    pub to_ngo_id: Option<String>,
    pub to_location: Option<String>,
    pub quantity: i64,
    pub requested_by: Option<String>,
}

/// Units handed out of a stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResourceAllocation {
    pub id: String,
    pub stock_id: String,
    pub request_id: Option<String>,
    pub target_type: AllocationTarget,
    pub target_id: String,
    pub quantity: i64,
    pub status: AllocationStatus,
    pub allocated_by: Option<String>,
    pub allocated_at: DateTime<Utc>,
}

/// Allocation form.
///
/// When `request_id` is set and no target is given, the request's victim
/// receives the units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAllocation {
    pub stock_id: String,
    pub request_id: Option<String>,
    pub target_type: Option<AllocationTarget>,
    pub target_id: Option<String>,
    pub quantity: i64,
    pub allocated_by: Option<String>,
}

// =============================================================================
// Tasks
// =============================================================================

/// A unit of field work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub related_request_id: Option<String>,
    pub assigned_volunteer_id: Option<String>,
    pub created_by: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub related_request_id: Option<String>,
    pub location: Option<String>,
    pub created_by: Option<String>,
}

/// Unassigned task with the urgency of its request (medium when unlinked).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AvailableTask {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub location: Option<String>,
    pub related_request_id: Option<String>,
    pub urgency: UrgencyLevel,
    pub created_at: DateTime<Utc>,
}

/// One status change of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TaskHistory {
    pub id: String,
    pub task_id: String,
    pub previous_status: Option<TaskStatus>,
    pub new_status: TaskStatus,
    pub changed_by: Option<String>,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Notifications, Feedback, Audit, Reports
// =============================================================================

/// A message to one user, or to every user of a role when
/// `recipient_user_id` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: String,
    pub recipient_user_id: Option<String>,
    pub recipient_role: Option<Role>,
    pub channel: NotificationChannel,
    pub message: String,
    pub status: NotificationStatus,
    /// Free-form JSON.
    pub meta: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_user_id: Option<String>,
    pub recipient_role: Option<Role>,
    pub channel: NotificationChannel,
    pub message: String,
    pub meta: Option<serde_json::Value>,
}

/// Victim's rating of how a request was handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Feedback {
    pub id: String,
    pub request_id: String,
    pub victim_id: String,
    /// 1 to 5.
    pub rating: i64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFeedback {
    pub request_id: String,
    pub rating: i64,
    pub comments: Option<String>,
}

/// Record of a privileged action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: String,
    pub actor_user_id: Option<String>,
    pub action: String,
    pub target_table: String,
    pub target_id: Option<String>,
    /// JSON details.
    pub details: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// A generated export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Report {
    pub id: String,
    pub report_type: ReportKind,
    /// JSON parameters the report was generated with.
    pub parameters: Option<String>,
    pub generated_by: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
    pub report_type: ReportKind,
    pub parameters: Option<serde_json::Value>,
    pub generated_by: Option<String>,
    pub file_path: Option<String>,
}

// =============================================================================
// Shelters
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shelter {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity: i64,
    pub current_occupancy: i64,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shelter {
    /// Beds still free.
    pub fn free_places(&self) -> i64 {
        (self.capacity - self.current_occupancy).max(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewShelter {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity: i64,
    pub current_occupancy: i64,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelterPatch {
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub current_occupancy: Option<i64>,
    pub contact: Option<String>,
}

// =============================================================================
// Field Operations
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Disaster {
    pub id: String,
    pub name: String,
    pub disaster_type: Option<String>,
    pub location: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Used both to create (name required) and to patch a disaster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisasterFields {
    pub name: Option<String>,
    pub disaster_type: Option<String>,
    pub location: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AffectedPerson {
    pub id: String,
    pub disaster_id: Option<String>,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub injury_status: Option<String>,
    pub aid_required: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectedPersonFields {
    pub disaster_id: Option<String>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub injury_status: Option<String>,
    pub aid_required: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReliefCamp {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub capacity: i64,
    pub incharge_name: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReliefCampFields {
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<i64>,
    pub incharge_name: Option<String>,
    pub contact: Option<String>,
}

/// Supplies held at a relief camp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: String,
    pub camp_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryItemFields {
    pub camp_id: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Donation {
    pub id: String,
    pub donor_name: String,
    /// Minor units (cents).
    pub amount_cents: i64,
    pub donation_type: Option<String>,
    pub note: Option<String>,
    pub donated_at: DateTime<Utc>,
}

impl Donation {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonationFields {
    pub donor_name: Option<String>,
    pub amount: Option<Money>,
    pub donation_type: Option<String>,
    pub note: Option<String>,
}

/// Public warning broadcast for an area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Alert {
    pub id: String,
    pub message: String,
    pub severity: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFields {
    pub message: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Counters shown on the coordination dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DashboardStats {
    pub total_volunteers: i64,
    pub available_volunteers: i64,
    pub total_tasks: i64,
    pub unassigned_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub tasks_completed_today: i64,
    /// Requests assigned or in process.
    pub active_sos: i64,
    pub pending_sos: i64,
    /// Units in stock records that are available or low.
    pub available_stock_units: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = UserAccount {
            id: "u1".to_string(),
            name: "Amina".to_string(),
            email: "amina@example.org".to_string(),
            phone: None,
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Victim,
            location: None,
            language: "en".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"victim\""));
    }

    #[test]
    fn test_shelter_free_places() {
        let shelter = Shelter {
            id: "s1".to_string(),
            name: "School gym".to_string(),
            latitude: None,
            longitude: None,
            capacity: 120,
            current_occupancy: 95,
            contact: None,
            created_at: Utc::now(),
        };
        assert_eq!(shelter.free_places(), 25);
    }
}
