use clap::Parser;
use seatwatch::app::App;
use seatwatch::cli::Args;
use seatwatch::config::Config;
use seatwatch::logging::setup_logging;
use seatwatch::{prompt, signals};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logging depends on config, so config errors can only go to stderr
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "starting seatwatch"
    );

    let (credentials, targets) = match prompt::collect_inputs(args) {
        Ok(inputs) => inputs,
        Err(e) => {
            error!(error = ?e, "Invalid input");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    signals::spawn_shutdown_listener(cancel.clone());

    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to create HTTP session");
            return ExitCode::FAILURE;
        }
    };

    match app.run(&credentials, targets, &cancel).await {
        Ok(summary) => {
            info!(
                cycles = summary.cycles,
                failures = summary.failures,
                "Watch finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "{e}");
            ExitCode::FAILURE
        }
    }
}
