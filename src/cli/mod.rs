//! CLI command handling
//!
//! Builds collaborators, drives the runner and formats output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use crate::capability::{parse_address, AccountAbstraction, Wallet};
use crate::commands::Commands;
use crate::common::config::{Config, Settings};
use crate::common::{Error, Result};
use crate::diagnose::{
    address_candidates, classify, extract_delegate, DiagnosticRunner, RunOutcome, RunReport,
    RunSettings, Variant,
};
use crate::local::LocalWallet;
use crate::runlog::{LogEntry, LogLevel, RunLog};
use crate::scenario::Scenario;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run {
            variant,
            scenario,
            local_key_env,
            local_chains,
            delegate,
            chain,
            fee_asset,
            account_type,
            nonce,
            json,
        } => {
            let settings = config.validate()?;

            let mut run_settings = RunSettings::from_defaults(&settings.run)?;
            if let Some(delegate) = delegate {
                run_settings.delegate = Some(parse_address(&delegate)?);
            }
            if let Some(chain) = chain {
                run_settings.chain_id = chain;
            }
            if let Some(fee_asset) = fee_asset {
                run_settings.fee_asset = fee_asset;
            }
            if account_type.is_some() {
                run_settings.account_type = account_type;
            }
            run_settings.nonce = nonce;

            let source = match (scenario, local_key_env) {
                (Some(path), _) => WalletSource::Scenario(path),
                (None, Some(var)) => WalletSource::LocalKey {
                    var,
                    chains: if local_chains.is_empty() {
                        vec![run_settings.chain_id]
                    } else {
                        local_chains
                    },
                    nonce: nonce.unwrap_or(0),
                },
                (None, None) => return Err(Error::NoWalletSource),
            };

            let report = run(variant, source, run_settings, &settings, json).await?;
            finish(&report)
        }

        Commands::Classify { message } => {
            let found = classify(&message);
            println!("Signatures: {}", found);
            if found.confirms_account_type_bug() {
                println!("{}", "Matches the signAuthorizations account-type bug".red());
            }
            if found.confirms_missing_primitive() {
                println!("{}", "Matches a missing connector signing primitive".red());
            }
            Ok(())
        }

        Commands::Extract { path, sender } => {
            let dump = std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, &e))?;
            match sender {
                Some(sender) => {
                    let sender = parse_address(&sender)?;
                    match extract_delegate(&dump, sender) {
                        Some(delegate) => println!("Delegate candidate: {delegate}"),
                        None => println!("No delegate candidate found"),
                    }
                }
                None => {
                    let candidates = address_candidates(&dump);
                    if candidates.is_empty() {
                        println!("No address-shaped tokens found");
                    } else {
                        println!("Address candidates (first seen first):");
                        for candidate in candidates {
                            println!("  {candidate}");
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Config => {
            let settings = config.validate()?;
            print_settings(&settings);
            Ok(())
        }
    }
}

/// Where the wallet for a run comes from
enum WalletSource {
    Scenario(PathBuf),
    LocalKey {
        var: String,
        chains: Vec<u64>,
        nonce: u64,
    },
}

type Collaborators = (
    Option<Arc<dyn Wallet>>,
    Option<Arc<dyn AccountAbstraction>>,
);

fn build_collaborators(source: &WalletSource, quiet: bool) -> Result<Collaborators> {
    match source {
        WalletSource::Scenario(path) => {
            let scenario = load_scenario(path)?;
            if !quiet {
                println!(
                    "{} {}",
                    "Scenario:".blue().bold(),
                    scenario.name.white().bold()
                );
                if let Some(desc) = &scenario.description {
                    println!("  {}", desc.dimmed());
                }
            }
            let built = scenario.build()?;
            Ok((built.wallet, built.account_abstraction))
        }
        WalletSource::LocalKey { var, chains, nonce } => {
            let key = std::env::var(var)
                .map_err(|_| Error::Config(format!("Environment variable {var} is not set")))?;
            let wallet = LocalWallet::from_private_key(&key, chains.clone(), *nonce)?;
            Ok((Some(Arc::new(wallet) as Arc<dyn Wallet>), None))
        }
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Scenario::load(&path)
}

async fn run(
    variant: Variant,
    source: WalletSource,
    run_settings: RunSettings,
    settings: &Settings,
    json: bool,
) -> Result<RunReport> {
    let (wallet, account_abstraction) = build_collaborators(&source, json)?;

    tracing::debug!(
        environment = %settings.wallet_environment_id,
        api_key = %settings.redacted_api_key(),
        "Collaborator settings"
    );

    let log = if json {
        RunLog::new()
    } else {
        println!(
            "\n{} {:?} on chain {}\n",
            "Running:".cyan(),
            variant,
            run_settings.chain_id
        );
        RunLog::with_observer(Box::new(print_entry))
    };

    let mut runner = DiagnosticRunner::new(run_settings).with_log(log);
    if let Some(wallet) = wallet {
        runner = runner.with_wallet(wallet);
    }
    if let Some(client) = account_abstraction {
        runner = runner.with_account_abstraction(client);
    }

    let report = runner.run(variant).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_authorization(&report);
    }
    Ok(report)
}

fn finish(report: &RunReport) -> Result<()> {
    match report.outcome {
        RunOutcome::Completed if report.errors == 0 => Ok(()),
        RunOutcome::Completed => Err(Error::RunFailed(format!(
            "completed with {} error(s)",
            report.errors
        ))),
        RunOutcome::Stopped { step } => Err(Error::RunFailed(format!("stopped at step {step}"))),
        RunOutcome::Unexpected => Err(Error::RunFailed("ended with an unexpected error".to_string())),
    }
}

fn print_entry(entry: &LogEntry) {
    let time = entry.timestamp.format("%H:%M:%S%.3f").to_string();
    match entry.level {
        LogLevel::Info => println!("  {} {} {}", time.dimmed(), "•".blue(), entry.message),
        LogLevel::Success => println!(
            "  {} {} {}",
            time.dimmed(),
            "✓".green(),
            entry.message.green()
        ),
        LogLevel::Error => println!(
            "  {} {} {}",
            time.dimmed(),
            "✗".red(),
            entry.message.red()
        ),
    }
}

fn print_authorization(report: &RunReport) {
    let Some(tuple) = &report.authorization else {
        return;
    };
    println!("\n{}", "Last authorization:".cyan().bold());
    match serde_json::to_string_pretty(tuple) {
        Ok(text) => {
            for line in text.lines() {
                println!("  {line}");
            }
        }
        Err(e) => println!("  {}", format!("unprintable: {e}").red()),
    }
}

fn print_settings(settings: &Settings) {
    println!("{}", "Configuration:".cyan().bold());
    println!("  aa_api_key            = {}", settings.redacted_api_key());
    println!("  wallet_environment_id = {}", settings.wallet_environment_id);
    println!("{}", "Run defaults:".cyan().bold());
    println!(
        "  delegate_address = {}",
        settings
            .run
            .delegate_address
            .as_deref()
            .unwrap_or("(none)")
    );
    println!("  chain_id         = {}", settings.run.chain_id);
    println!("  fee_asset        = {}", settings.run.fee_asset);
    println!(
        "  account_type     = {}",
        settings.run.account_type.as_deref().unwrap_or("(default)")
    );
    println!("{}", "Logging:".cyan().bold());
    println!("  filter = {}", settings.logging.filter);
    println!("  file   = {}", settings.logging.file);
}
