//! # relief-core: Domain Logic for Relief Operations
//!
//! Pure types and rules shared by the database layer and the command line.
//! Nothing in here touches a database, file or socket.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relief Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    relief CLI (apps/cli)                         │   │
//! │  │    login ──► sos send ──► task assign ──► resource allocate     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ relief-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  status  │ │  types   │ │  rules   │ │ validation       │  │   │
//! │  │   │ Urgency  │ │ SosReq   │ │ stock    │ │ forms, ranges    │  │   │
//! │  │   │ Task     │ │ Task     │ │ alerts   │ │                  │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    relief-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`status`] - Lifecycle enums (urgency, SOS, task, stock...) and their ordering
//! - [`types`] - Persisted records, form inputs and patches
//! - [`validation`] - Form-level checks (required fields, ranges)
//! - [`rules`] - Stock and availability checks, alert text
//! - [`session`] - Authenticated user and permission checks
//! - [`password`] - Argon2 password hashing
//! - [`money`] - Integer minor-unit amounts for donations
//! - [`error`] - Domain error types
//!
//! ## Example
//!
//! ```rust
//! use relief_core::status::UrgencyLevel;
//!
//! let mut levels = vec![UrgencyLevel::Low, UrgencyLevel::Critical, UrgencyLevel::Medium];
//! levels.sort_by_key(|l| l.rank());
//! assert_eq!(levels[0], UrgencyLevel::Critical);
//! ```

pub mod error;
pub mod money;
pub mod password;
pub mod rules;
pub mod session;
pub mod status;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use session::Session;
pub use status::*;
pub use types::*;

/// Stock at or below this many units is flagged `low`.
///
/// ## Business Reason
/// Gives coordinators a chance to reorder before a depot runs dry.
/// Overridable with `RELIEF_LOW_STOCK_THRESHOLD`.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Language stored for accounts that don't pick one.
pub const DEFAULT_LANGUAGE: &str = "en";
