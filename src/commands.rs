//! CLI command definitions
//!
//! Defines the clap commands for the reproduction harness.

use clap::Subcommand;
use std::path::PathBuf;

use crate::diagnose::Variant;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the diagnostic checklist once
    Run {
        /// Checklist variant
        #[arg(long, value_enum, default_value = "sdk")]
        variant: Variant,

        /// YAML scenario describing the wallet and account-abstraction client
        #[arg(long, conflicts_with = "local_key_env")]
        scenario: Option<PathBuf>,

        /// Environment variable holding a private key for a local wallet
        #[arg(long)]
        local_key_env: Option<String>,

        /// Chains the local wallet declares (default: the target chain)
        #[arg(long, value_delimiter = ',', requires = "local_key_env")]
        local_chains: Vec<u64>,

        /// Delegate contract to authorize (overrides run.delegate_address)
        #[arg(long)]
        delegate: Option<String>,

        /// Target chain id (overrides run.chain_id)
        #[arg(long)]
        chain: Option<u64>,

        /// Fee asset passed to prepareTransaction (overrides run.fee_asset)
        #[arg(long)]
        fee_asset: Option<String>,

        /// Account type requested from the account-abstraction client
        #[arg(long)]
        account_type: Option<String>,

        /// Authorization nonce; the signer decides when omitted
        #[arg(long)]
        nonce: Option<u64>,

        /// Print the run report as JSON instead of the live log
        #[arg(long)]
        json: bool,
    },

    /// Classify a collaborator error message against known bug signatures
    Classify {
        /// Error message text
        message: String,
    },

    /// Scan a JSON dump for delegate address candidates
    Extract {
        /// File containing the serialized transaction messages
        path: PathBuf,

        /// Sender address to exclude
        #[arg(long)]
        sender: Option<String>,
    },

    /// Show the resolved configuration (secrets redacted)
    Config,
}
