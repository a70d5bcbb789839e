//! `tessera` binary: replays a scene file and prints the resulting visual models.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};
use miette::GraphicalReportHandler;

use tessera_cli::{Args, CliError, error_adapter::ErrorAdapter};

/// Exit code of a replay whose actions failed under `--strict`.
const EXIT_ACTIONS_FAILED: u8 = 2;

fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(args.log_level)
        .init();
    debug!(args:?; "Parsed arguments");

    match tessera_cli::run(&args) {
        Ok(()) => {
            info!(input_path = args.input; "Scene replayed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let mut rendered = String::new();
            if GraphicalReportHandler::new()
                .render_report(&mut rendered, &ErrorAdapter(&err))
                .is_err()
            {
                rendered = err.to_string();
            }
            error!("{rendered}");

            match err {
                CliError::ActionsFailed(_) => ExitCode::from(EXIT_ACTIONS_FAILED),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
