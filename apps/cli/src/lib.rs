//! # Relief CLI Library
//!
//! Everything behind the `relief` binary: argument parsing, startup, the
//! session and the command handlers.
//!
//! ## Module Organization
//! ```text
//! relief_cli/
//! ├── lib.rs          ◄─── Cli definition, startup sequence
//! ├── state/
//! │   ├── config.rs   ◄─── RELIEF_* environment settings
//! │   └── context.rs  ◄─── Database + session + output for handlers
//! ├── commands/       ◄─── One module per workflow area
//! ├── output.rs       ◄─── Table / JSON rendering
//! └── error.rs        ◄─── ApiError with stable codes
//! ```
//!
//! ## Sessions
//! There is no long-lived login. Every invocation authenticates from
//! `--user` / `--password` (or `RELIEF_USER` / `RELIEF_PASSWORD`) and the
//! session lives for that one command.

pub mod commands;
pub mod error;
pub mod output;
pub mod state;

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use relief_db::{Database, DbConfig};

use crate::commands::{account, Commands};
use crate::error::{ApiError, ApiResult};
use crate::output::Output;
use crate::state::{AppConfig, AppContext};

/// Disaster relief coordination from the command line.
#[derive(Debug, Parser)]
#[command(name = "relief", version, about)]
pub struct Cli {
    /// Database file (overrides RELIEF_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Email to log in with
    #[arg(long, global = true, env = "RELIEF_USER")]
    pub user: Option<String>,

    #[arg(long, global = true, env = "RELIEF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging for the relief crates
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Runs one command.
///
/// ## Startup Sequence
/// ```text
/// 1. Load RELIEF_* settings, apply --db
/// 2. Resolve the database file (platform data dir by default)
/// 3. Connect and run migrations
/// 4. Authenticate when credentials are given
/// 5. Dispatch the subcommand
/// ```
pub async fn run(cli: Cli) -> ApiResult<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    let db_path = get_database_path(&config)?;
    debug!(?db_path, "Database path determined");

    let db = Database::new(
        DbConfig::new(db_path).low_stock_threshold(config.low_stock_threshold),
    )
    .await?;

    let mut ctx = AppContext::new(db, config, Output::new(cli.json));

    let credentials = account::credentials(cli.user.as_deref(), cli.password.as_deref())?;
    if let Some((email, password)) = credentials {
        ctx.login(email, password).await?;
    }

    commands::dispatch(&ctx, cli.command).await
}

/// Initializes the tracing subscriber. Logs go to stderr so command output
/// stays pipeable.
///
/// `RUST_LOG` overrides the defaults.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,relief_cli=debug,relief_db=debug,relief_core=debug,sqlx=warn"
    } else {
        "warn,relief_cli=info,relief_db=info,relief_core=info,sqlx=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The configured database file, or `relief.db` in the platform data
/// directory.
///
/// - **Linux**: `~/.local/share/drms/relief.db`
/// - **macOS**: `~/Library/Application Support/org.relief.drms/relief.db`
/// - **Windows**: `%APPDATA%\relief\drms\data\relief.db`
pub fn get_database_path(config: &AppConfig) -> ApiResult<PathBuf> {
    if let Some(path) = &config.db_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(path.clone());
    }

    let dirs = ProjectDirs::from("org", "relief", "drms")
        .ok_or_else(|| ApiError::internal("Could not determine the data directory"))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("relief.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sos::SosCommand;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "relief",
            "sos",
            "pending",
            "--user",
            "admin@relief.test",
            "--password",
            "secret-1",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.user.as_deref(), Some("admin@relief.test"));
        assert!(matches!(
            cli.command,
            Commands::Sos(commands::sos::SosArgs {
                command: SosCommand::Pending
            })
        ));
    }

    #[test]
    fn test_enum_arguments_parse_forgivingly() {
        let cli = Cli::try_parse_from(["relief", "sos", "prioritize", "r1", "CRITICAL"]).unwrap();
        match cli.command {
            Commands::Sos(args) => assert!(matches!(
                args.command,
                SosCommand::Prioritize {
                    urgency: relief_core::UrgencyLevel::Critical,
                    ..
                }
            )),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["relief", "sos", "prioritize", "r1", "urgent"]).is_err());
    }

    #[test]
    fn test_configured_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            db_path: Some(dir.path().join("data").join("relief.db")),
            ..AppConfig::default()
        };

        let path = get_database_path(&config).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_run_registers_and_logs_in() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relief.db");
        let db_arg = db.to_str().unwrap();

        let register = Cli::try_parse_from([
            "relief",
            "--db",
            db_arg,
            "register",
            "admin",
            "--name",
            "Head Office",
            "--email",
            "head@relief.test",
            "--account-password",
            "secret-1",
        ])
        .unwrap();
        run(register).await.unwrap();

        let login = Cli::try_parse_from([
            "relief",
            "--db",
            db_arg,
            "--user",
            "head@relief.test",
            "--password",
            "wrong-pass",
            "login",
        ])
        .unwrap();
        let err = run(login).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthenticated);
    }
}
