//! Connectivity probing
//!
//! A probe acquires one scoped connection, issues [`DIAGNOSTIC_QUERY`],
//! releases the connection and only then reports what happened.
//!
//! Acquisition and the session are behind the [`Connector`] and [`Session`]
//! traits. [`PostgresConnector`] is the `tokio-postgres` implementation.

use crate::descriptor::ConnectionDescriptor;
use crate::error::{ProbeError, Result};
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

/// The only statement a probe ever issues
pub const DIAGNOSTIC_QUERY: &str = "SELECT version();";

/// Acquires sessions for a descriptor
pub trait Connector {
    /// Session type produced by this connector
    type Session: Session;

    /// Open a session to the endpoint described by `descriptor`
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A live database session
///
/// `close` consumes the session, so a session is released at most once.
/// Implementations must also release on drop when `close` was never called.
pub trait Session: Send {
    /// Run `sql` and return the first column of its single row as text
    fn query_scalar(&mut self, sql: &str) -> impl Future<Output = Result<String>> + Send;

    /// Release the session and wait until the underlying connection is gone
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Result of a probe as shown to the user
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The server answered the diagnostic statement
    Connected {
        /// Value returned by `version()`
        server_version: String,
    },
    /// Something went wrong before a version could be read
    Failed {
        /// What went wrong
        error: ProbeError,
    },
}

impl ProbeOutcome {
    /// Whether the probe reached the server and read its version
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl From<Result<String>> for ProbeOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(server_version) => Self::Connected { server_version },
            Err(error) => Self::Failed { error },
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { server_version } => write!(f, "Connected to: {server_version}"),
            Self::Failed { error } => write!(f, "Connection failed: {error}"),
        }
    }
}

/// Runs the diagnostic statement through a [`Connector`]
#[derive(Debug, Clone, Default)]
pub struct Prober<C> {
    connector: C,
}

impl<C: Connector> Prober<C> {
    /// Create a prober over `connector`
    pub const fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Connect, query the server version, release, then report
    ///
    /// The session is closed before the query result is inspected, so it is
    /// released exactly once whether the query succeeded or not.
    pub async fn probe(&self, descriptor: &ConnectionDescriptor) -> Result<String> {
        let started = Instant::now();
        debug!("Connecting to {}", descriptor);

        let mut session = self.connector.connect(descriptor).await?;
        debug!("Connection acquired, issuing diagnostic statement");

        let result = session.query_scalar(DIAGNOSTIC_QUERY).await;
        session.close().await;
        debug!("Connection released");

        let version = result?;
        if version.trim().is_empty() {
            return Err(ProbeError::UnexpectedResult {
                details: "server returned an empty version string".to_string(),
            });
        }

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            endpoint = %descriptor.endpoint(),
            latency_ms,
            "Probe succeeded"
        );
        Ok(version)
    }

    /// Probe and fold the result into a [`ProbeOutcome`]
    pub async fn run(&self, descriptor: &ConnectionDescriptor) -> ProbeOutcome {
        let outcome = ProbeOutcome::from(self.probe(descriptor).await);
        if let ProbeOutcome::Failed { error } = &outcome {
            warn!(
                endpoint = %descriptor.endpoint(),
                kind = ?error.kind(),
                "Probe failed: {}",
                error
            );
        }
        outcome
    }
}

/// [`Connector`] backed by `tokio-postgres` without TLS
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl Connector for PostgresConnector {
    type Session = PgSession;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<PgSession> {
        let (client, connection) = descriptor
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| ProbeError::connect(descriptor.endpoint(), e))?;

        // The connection object drives the socket; it finishes once the
        // client is dropped and the terminate message has been sent.
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Connection driver ended with error: {}", e);
            }
        });

        Ok(PgSession {
            client: Some(client),
            driver: Some(driver),
        })
    }
}

/// Session over one `tokio-postgres` connection
pub struct PgSession {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

impl Session for PgSession {
    async fn query_scalar(&mut self, sql: &str) -> Result<String> {
        let client = self.client.as_ref().ok_or(ProbeError::SessionClosed)?;
        let row = client.query_one(sql, &[]).await.map_err(ProbeError::query)?;
        row.try_get::<_, String>(0).map_err(|e| ProbeError::UnexpectedResult {
            details: e.to_string(),
        })
    }

    async fn close(mut self) {
        drop(self.client.take());
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!("Connection driver task did not finish cleanly: {}", e);
            }
        }
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        // Only reached with a live driver if close() never ran.
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl fmt::Debug for PgSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSession")
            .field("open", &self.client.is_some())
            .finish()
    }
}
