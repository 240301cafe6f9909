//! `helpdesk` -- command-line front end for the ticket lifecycle engine.
//!
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default                                | Description                 |
//! |---------------------|----------|----------------------------------------|-----------------------------|
//! | `RUST_LOG`          | no       | `helpdesk_core=info,helpdesk_cli=info` | Tracing filter              |
//! | `HELPDESK_ACTOR_ID` | no       | --                                     | Fallback for `--actor-id`   |
//! | `HELPDESK_ROLE`     | no       | --                                     | Fallback for `--role`       |
//! | `SLA_*_MINS`        | no       | see `EngineConfig::from_env`           | SLA policy windows          |

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_cli::commands::{self, Cli};
use helpdesk_cli::config::{EngineConfig, DEFAULT_LOG_FILTER};
use helpdesk_core::CoreError;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = EngineConfig::from_env()
        .and_then(|config| commands::run(&cli.command, &config, chrono::Utc::now()));

    match result {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err
                .downcast_ref::<CoreError>()
                .map(CoreError::code)
                .unwrap_or("ERROR");
            tracing::error!(command = cli.command.name(), code, error = %err, "Command failed");
            println!(
                "{:#}",
                serde_json::json!({ "error": format!("{err:#}"), "code": code })
            );
            ExitCode::FAILURE
        }
    }
}
