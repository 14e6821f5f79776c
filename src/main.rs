#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
mod arg_parse;
mod common;
mod config;
mod error;
mod feeds;
mod relay;
mod sender;
mod storage;

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{arg_parse::CmdArgs, config::AppConfig, error::ArgsError, relay::Relay};

const EXIT_CONFIG: u8 = 2;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_relay=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match CmdArgs::parse(std::env::args().collect()) {
        Ok(args) => args,
        Err(ArgsError::Help) => return ExitCode::SUCCESS,
        Err(ArgsError::Invalid) => return ExitCode::from(EXIT_CONFIG),
    };

    // load before the subscriber so RUST_LOG may come from the env file
    let env_file = dotenvy::from_filename(&args.env_file);
    init_tracing();
    match env_file {
        Ok(path) => info!(path = %path.display(), "loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(file = %args.env_file, error = %e, "could not load env file"),
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mode = args.get_mode();
    info!(feed = %config.feed_url, ?mode, "starting feed relay");
    let mut relay = Relay::new(&config, config.get_store(), config.get_sender(mode), mode);

    match relay.run().await {
        Ok(report) => {
            info!(
                fetched = report.fetched,
                new = report.new,
                delivered = report.delivered(),
                attempted = report.results.len(),
                "completed"
            );
            for result in report.results.iter().filter(|r| !r.delivered) {
                warn!(link = %result.identifier, "not delivered");
            }
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                error!("every delivery attempt failed");
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}
