//! Common utilities: configuration, errors, logging, paths

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
