//! EIP-7702 authorization reproduction harness
//!
//! Drives a wallet connector and an account-abstraction client through a
//! scripted checklist, logging every step, to locate where EIP-7702
//! authorization signing fails and to try bypasses.

pub mod capability;
pub mod cli;
pub mod commands;
pub mod common;
pub mod diagnose;
pub mod local;
pub mod runlog;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use diagnose::{DiagnosticRunner, RunOutcome, RunReport, RunSettings, Variant};
