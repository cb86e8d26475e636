//! `pgprobe` - PostgreSQL connectivity checks
//!
//! Builds a connection descriptor, opens one connection, runs
//! `SELECT version();` and reports the server version or the failure.

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/// Command line interface
pub mod cli;
/// Command handlers
pub mod commands;
/// Configuration management for pgprobe
pub mod config;
pub mod descriptor;
/// Error types
pub mod error;
pub mod probe;

pub use config::Config;
pub use descriptor::ConnectionDescriptor;
pub use error::{ProbeError, ProbeErrorKind};
pub use probe::{PostgresConnector, ProbeOutcome, Prober, DIAGNOSTIC_QUERY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
