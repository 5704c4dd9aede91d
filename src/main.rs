//! EIP-7702 authorization reproduction harness
//!
//! Runs the diagnostic checklist against scripted or local collaborators
//! and prints a color-coded step log.

use clap::Parser;
use repro::cli;
use repro::commands::Commands;
use repro::common::config::Config;
use repro::common::logging;

#[derive(Parser)]
#[command(name = "repro", about = "EIP-7702 authorization signing reproduction harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config.with_env(),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_guard = logging::init_cli(&config.logging);
    if let Some(path) = &log_guard.file_path {
        eprintln!("Log file: {}", path.display());
    }

    let result = cli::dispatch(cli.command, config).await;
    // Flush the file writer before exiting
    drop(log_guard);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
