//! Diagnostic run: the checklist runner and its pure helpers

pub mod classify;
pub mod extract;
mod runner;

pub use classify::{classify, Classification, ErrorSignature};
pub use extract::{address_candidates, extract_delegate};
pub use runner::{DiagnosticRunner, RunOutcome, RunReport, RunSettings, Variant};
