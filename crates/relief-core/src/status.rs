//! # Status Enums
//!
//! Every enumerated column in the schema, stored as lowercase snake_case TEXT.
//!
//! ## Lifecycles
//! ```text
//! SOS request:
//!   pending ──► assigned ──► in_process ──► delivered ──► completed
//!      │            │             │              │
//!      └────────────┴─────────────┴──────────────┴──────► cancelled
//!
//! Task:
//!   unassigned ──assign──► assigned ──accept──► in_progress ──► completed
//!        ▲                    │                      │
//!        └─────decline────────┘                      │
//!   (any non-terminal) ─────────────────────────────────────► cancelled
//! ```
//!
//! Parsing is forgiving: `"In Process"`, `"in-process"` and `"IN_PROCESS"` all
//! read as [`SosStatus::InProcess`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Declares a text-backed enum with `as_str`, `ALL`, `Display` and `FromStr`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s
                    .trim()
                    .to_ascii_lowercase()
                    .replace(|c: char| c == ' ' || c == '-', "_");
                match normalized.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $name::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Roles
// =============================================================================

text_enum! {
    /// Account role; decides which commands a session may run.
    pub enum Role as "role" {
        Admin => "admin",
        Ngo => "ngo",
        Volunteer => "volunteer",
        Victim => "victim",
    }
}

impl Role {
    /// Admins and NGOs coordinate; volunteers and victims act on their own records.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Ngo)
    }
}

// =============================================================================
// Urgency
// =============================================================================

text_enum! {
    /// How urgent an SOS request is.
    pub enum UrgencyLevel as "urgency" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

impl UrgencyLevel {
    /// Sort position: critical 1, high 2, medium 3, low 4.
    ///
    /// Mirrors the SQL `CASE` used by the pending-request and available-task
    /// queries, so in-memory and database ordering agree.
    pub fn rank(&self) -> u8 {
        match self {
            UrgencyLevel::Critical => 1,
            UrgencyLevel::High => 2,
            UrgencyLevel::Medium => 3,
            UrgencyLevel::Low => 4,
        }
    }

    /// Stored `priority_score`; higher is more urgent.
    pub fn priority_score(&self) -> i64 {
        match self {
            UrgencyLevel::Critical => 100,
            UrgencyLevel::High => 75,
            UrgencyLevel::Medium => 50,
            UrgencyLevel::Low => 25,
        }
    }
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        UrgencyLevel::Low
    }
}

// =============================================================================
// SOS Status
// =============================================================================

text_enum! {
    /// Where an SOS request is in its lifecycle.
    pub enum SosStatus as "status" {
        Pending => "pending",
        Assigned => "assigned",
        InProcess => "in_process",
        Delivered => "delivered",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl SosStatus {
    fn stage(&self) -> u8 {
        match self {
            SosStatus::Pending => 0,
            SosStatus::Assigned => 1,
            SosStatus::InProcess => 2,
            SosStatus::Delivered => 3,
            SosStatus::Completed => 4,
            SosStatus::Cancelled => 5,
        }
    }

    /// Completed and cancelled requests are closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SosStatus::Completed | SosStatus::Cancelled)
    }

    /// Someone is working on it.
    pub fn is_active(&self) -> bool {
        matches!(self, SosStatus::Assigned | SosStatus::InProcess)
    }

    /// Requests in these states can receive feedback from their victim.
    pub fn accepts_feedback(&self) -> bool {
        matches!(
            self,
            SosStatus::Assigned | SosStatus::InProcess | SosStatus::Delivered | SosStatus::Completed
        )
    }

    /// Forward-only; stages may be skipped; cancel from anywhere open.
    pub fn can_transition_to(&self, next: SosStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == SosStatus::Cancelled {
            return true;
        }
        next.stage() > self.stage()
    }
}

impl Default for SosStatus {
    fn default() -> Self {
        SosStatus::Pending
    }
}

// =============================================================================
// Tasks
// =============================================================================

text_enum! {
    /// Kind of field work.
    pub enum TaskType as "task_type" {
        Delivery => "delivery",
        Rescue => "rescue",
        Medical => "medical",
        Assessment => "assessment",
        Other => "other",
    }
}

text_enum! {
    /// Task lifecycle state.
    pub enum TaskStatus as "status" {
        Unassigned => "unassigned",
        Assigned => "assigned",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// Completed and cancelled tasks never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Allowed moves; see the module diagram.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Unassigned, Assigned)
                | (Unassigned, Cancelled)
                | (Assigned, InProgress)
                | (Assigned, Unassigned)
                | (Assigned, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    /// Leaving the volunteer's hands: they become available again.
    pub fn releases_volunteer(&self) -> bool {
        matches!(
            self,
            TaskStatus::Unassigned | TaskStatus::Completed | TaskStatus::Cancelled
        )
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Unassigned
    }
}

// =============================================================================
// Volunteers
// =============================================================================

text_enum! {
    /// Volunteer availability.
    pub enum VolunteerStatus as "status" {
        Available => "available",
        Busy => "busy",
        Inactive => "inactive",
    }
}

impl Default for VolunteerStatus {
    fn default() -> Self {
        VolunteerStatus::Available
    }
}

// =============================================================================
// Resources
// =============================================================================

text_enum! {
    /// Stock record condition.
    pub enum ResourceStatus as "status" {
        Available => "available",
        Reserved => "reserved",
        Low => "low",
        OutOfStock => "out_of_stock",
    }
}

impl ResourceStatus {
    /// Status implied by a quantity.
    ///
    /// ```rust
    /// use relief_core::ResourceStatus;
    ///
    /// assert_eq!(ResourceStatus::for_quantity(0, 10), ResourceStatus::OutOfStock);
    /// assert_eq!(ResourceStatus::for_quantity(10, 10), ResourceStatus::Low);
    /// assert_eq!(ResourceStatus::for_quantity(11, 10), ResourceStatus::Available);
    /// ```
    pub fn for_quantity(quantity: i64, low_threshold: i64) -> Self {
        if quantity <= 0 {
            ResourceStatus::OutOfStock
        } else if quantity <= low_threshold {
            ResourceStatus::Low
        } else {
            ResourceStatus::Available
        }
    }

    /// Status after the quantity changed. Reserved stock stays reserved
    /// until it runs out.
    pub fn after_change(self, quantity: i64, low_threshold: i64) -> Self {
        match self {
            ResourceStatus::Reserved if quantity > 0 => ResourceStatus::Reserved,
            _ => ResourceStatus::for_quantity(quantity, low_threshold),
        }
    }

    /// Units in this state count toward "available stock" totals.
    pub fn is_usable(&self) -> bool {
        matches!(self, ResourceStatus::Available | ResourceStatus::Low)
    }
}

text_enum! {
    /// State of a stock transfer between owners or locations.
    pub enum TransferStatus as "status" {
        Pending => "pending",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// State of units handed out from stock.
    pub enum AllocationStatus as "status" {
        Pending => "pending",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Who receives an allocation.
    pub enum AllocationTarget as "target_type" {
        Victim => "victim",
        Ngo => "ngo",
        Volunteer => "volunteer",
        Shelter => "shelter",
    }
}

// =============================================================================
// Notifications & Reports
// =============================================================================

text_enum! {
    /// Delivery channel of a notification.
    pub enum NotificationChannel as "channel" {
        InApp => "in_app",
        Email => "email",
        Sms => "sms",
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        NotificationChannel::InApp
    }
}

text_enum! {
    /// Delivery state of a notification.
    pub enum NotificationStatus as "status" {
        Pending => "pending",
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
        Failed => "failed",
    }
}

text_enum! {
    /// Which listing a report exports.
    pub enum ReportKind as "report_type" {
        Volunteers => "volunteers",
        Ngos => "ngos",
        Victims => "victims",
        Resources => "resources",
        Requests => "requests",
    }
}

impl ReportKind {
    /// Role whose accounts a user-listing report exports.
    pub fn user_role(&self) -> Option<Role> {
        match self {
            ReportKind::Volunteers => Some(Role::Volunteer),
            ReportKind::Ngos => Some(Role::Ngo),
            ReportKind::Victims => Some(Role::Victim),
            ReportKind::Resources | ReportKind::Requests => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_forgiving() {
        assert_eq!("NGO".parse::<Role>().unwrap(), Role::Ngo);
        assert_eq!("Volunteer".parse::<Role>().unwrap(), Role::Volunteer);
        assert_eq!("In Process".parse::<SosStatus>().unwrap(), SosStatus::InProcess);
        assert_eq!("out-of-stock".parse::<ResourceStatus>().unwrap(), ResourceStatus::OutOfStock);
        assert_eq!(" in_app ".parse::<NotificationChannel>().unwrap(), NotificationChannel::InApp);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "urgent".parse::<UrgencyLevel>().unwrap_err();
        match err {
            ValidationError::NotAllowed { field, allowed } => {
                assert_eq!(field, "urgency");
                assert_eq!(allowed, vec!["low", "medium", "high", "critical"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_matches_serde() {
        for status in SosStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_urgency_rank_order() {
        let mut levels = UrgencyLevel::ALL.to_vec();
        levels.sort_by_key(|l| l.rank());
        assert_eq!(
            levels,
            vec![
                UrgencyLevel::Critical,
                UrgencyLevel::High,
                UrgencyLevel::Medium,
                UrgencyLevel::Low
            ]
        );
        assert!(UrgencyLevel::Critical.priority_score() > UrgencyLevel::High.priority_score());
        assert_eq!(UrgencyLevel::default(), UrgencyLevel::Low);
    }

    #[test]
    fn test_sos_transitions() {
        assert!(SosStatus::Pending.can_transition_to(SosStatus::Assigned));
        assert!(SosStatus::Pending.can_transition_to(SosStatus::Delivered));
        assert!(SosStatus::InProcess.can_transition_to(SosStatus::Cancelled));
        assert!(!SosStatus::Delivered.can_transition_to(SosStatus::Assigned));
        assert!(!SosStatus::Completed.can_transition_to(SosStatus::Cancelled));
        assert!(!SosStatus::Cancelled.can_transition_to(SosStatus::Pending));
        assert!(!SosStatus::Pending.can_transition_to(SosStatus::Pending));
    }

    #[test]
    fn test_task_transitions() {
        use TaskStatus::*;
        assert!(Unassigned.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Unassigned));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Unassigned.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Assigned));
        assert!(!InProgress.can_transition_to(Assigned));
    }

    #[test]
    fn test_resource_status_after_change() {
        assert_eq!(
            ResourceStatus::Reserved.after_change(5, 10),
            ResourceStatus::Reserved
        );
        assert_eq!(
            ResourceStatus::Reserved.after_change(0, 10),
            ResourceStatus::OutOfStock
        );
        assert_eq!(
            ResourceStatus::Low.after_change(50, 10),
            ResourceStatus::Available
        );
    }
}
