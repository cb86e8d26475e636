//! The probe command: resolve the target, probe it, report the outcome

use crate::cli::ConnectionArgs;
use crate::config::{Config, DatabaseConfig};
use crate::descriptor::ConnectionDescriptor;
use crate::error::ProbeError;
use crate::probe::{PostgresConnector, ProbeOutcome, Prober};
use std::path::Path;
use tracing::{debug, info};

/// Resolve the connection target from file, environment and flags
pub fn resolve_descriptor(
    config_path: Option<&Path>,
    args: ConnectionArgs,
) -> Result<ConnectionDescriptor, ProbeError> {
    let file = Config::load(config_path)?.database;
    let env = DatabaseConfig::from_env()?;
    let flags = DatabaseConfig::from(args);

    let merged = flags.layered_over(env.layered_over(file));
    debug!("Merged connection settings: url={}", merged.url.is_some());
    Ok(merged.resolve()?)
}

/// Handle the probe command
///
/// Every failure, including configuration errors, ends up as
/// [`ProbeOutcome::Failed`]; nothing is propagated past this point.
pub async fn handle_probe(config_path: Option<&Path>, args: ConnectionArgs) -> ProbeOutcome {
    let descriptor = match resolve_descriptor(config_path, args) {
        Ok(descriptor) => descriptor,
        Err(error) => return ProbeOutcome::Failed { error },
    };

    info!("Probing {}", descriptor);
    Prober::new(PostgresConnector).run(&descriptor).await
}
