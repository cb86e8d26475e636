use anyhow::Context;
use pgprobe::cli::Cli;
use pgprobe::commands::probe;
use pgprobe::{ProbeError, ProbeOutcome};
use tracing_subscriber::EnvFilter;

// Allow println in main CLI binary
#[allow(clippy::disallowed_methods)]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("pgprobe CLI initialized");

    // Both outcomes print one line and exit normally.
    let outcome = match build_runtime() {
        Ok(rt) => rt.block_on(probe::handle_probe(cli.config.as_deref(), cli.connection)),
        Err(e) => ProbeOutcome::Failed {
            error: ProbeError::Runtime {
                details: format!("{e:#}"),
            },
        },
    };

    println!("{outcome}");
}

/// Single-threaded runtime; the probe is one linear sequence
fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Initialize logging on stderr so stdout carries only the outcome line
fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "pgprobe=warn,warn",
        1 => "pgprobe=info,warn",
        _ => "pgprobe=debug,info",
    };
    // RUST_LOG overrides the verbosity flag
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
