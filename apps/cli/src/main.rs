//! # Relief Command Line
//!
//! ```text
//! relief --user admin@relief.test --password ... sos pending
//!        └──────────── session ──────────────┘   └─ command ─┘
//! ```
//!
//! Setup lives in `lib.rs` so the whole flow can be tested without
//! spawning the binary.

use std::process::ExitCode;

use clap::Parser;

use relief_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                match serde_json::to_string_pretty(&err) {
                    Ok(body) => eprintln!("{}", body),
                    Err(_) => eprintln!("{}", err.render()),
                }
            } else {
                eprintln!("{}", err.render());
            }
            ExitCode::FAILURE
        }
    }
}
