//! # Command State
//!
//! What every command handler receives:
//!
//! ```text
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐
//! │    Database      │ │    Session       │ │    AppConfig         │
//! │                  │ │                  │ │                      │
//! │  • Pool          │ │  • User id/role  │ │  • Low stock level   │
//! │  • Repositories  │ │  • NGO flags     │ │  • Report directory  │
//! └──────────────────┘ └──────────────────┘ └──────────────────────┘
//!              all bundled in AppContext, plus the Output mode
//! ```

pub mod config;
pub mod context;

pub use config::AppConfig;
pub use context::AppContext;
