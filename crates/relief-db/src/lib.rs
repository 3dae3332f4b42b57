//! # relief-db: Database Layer for Relief Operations
//!
//! SQLite storage through sqlx. Repositories are thin: they validate the
//! form, run the SQL and, where several rows must change together
//! (allocating stock, assigning a task, submitting an SOS), do it in one
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  relief CLI command (sos send, task assign, resource allocate ...)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     relief-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ users, sos,   │    │ 001_initial  │  │   │
//! │  │   │               │    │ resources,    │    │ 002_field_   │  │   │
//! │  │   │ SqlitePool    │    │ tasks, ...    │    │   operations │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir, or RELIEF_DB_PATH)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relief_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("relief.db")).await?;
//! let pending = db.sos().list_pending_by_priority().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::*;
