use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use thiserror::Error;

/// Boxed driver or transport error
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can make a probe fail
///
/// The console treats every variant as one "connection failed" outcome;
/// [`ProbeError::kind`] keeps the distinction available to callers.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(ConfigError),

    /// The connection descriptor is not valid
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The connection could not be established
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        /// Redacted `host:port/database`
        endpoint: String,
        /// Underlying driver error
        source: BoxError,
    },

    /// The diagnostic statement failed
    #[error("diagnostic query failed: {source}")]
    Query {
        /// Underlying driver error
        source: BoxError,
    },

    /// The diagnostic statement returned something other than one text scalar
    #[error("unexpected diagnostic result: {details}")]
    UnexpectedResult {
        /// What was wrong with the result
        details: String,
    },

    /// The session was used after it had been released
    #[error("session already closed")]
    SessionClosed,

    /// The async runtime could not be started
    #[error("async runtime unavailable: {details}")]
    Runtime {
        /// Startup failure, with context
        details: String,
    },
}

/// Coarse classification of a [`ProbeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeErrorKind {
    /// Bad configuration or descriptor; nothing was attempted on the network
    Configuration,
    /// Connection acquisition failed
    Connection,
    /// Connected, but the diagnostic statement failed
    Query,
}

impl ProbeError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ProbeErrorKind {
        match self {
            Self::Config(_) | Self::Descriptor(_) => ProbeErrorKind::Configuration,
            Self::Connect { .. } | Self::Runtime { .. } => ProbeErrorKind::Connection,
            Self::Query { .. } | Self::UnexpectedResult { .. } | Self::SessionClosed => {
                ProbeErrorKind::Query
            }
        }
    }

    /// Build a [`ProbeError::Connect`] from any error
    pub fn connect(endpoint: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Build a [`ProbeError::Query`] from any error
    pub fn query(source: impl Into<BoxError>) -> Self {
        Self::Query {
            source: source.into(),
        }
    }
}

impl From<ConfigError> for ProbeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Descriptor(inner) => Self::Descriptor(inner),
            other => Self::Config(other),
        }
    }
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
