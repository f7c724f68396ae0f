//! Error types for sampleref.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (unknown sample, malformed record)
//! - I^B materialized: Infrastructure failures (network, timeout, 5xx)
//! - K_i violated: Internal invariant violations (bugs)

use std::time::Duration;
use thiserror::Error;

/// User-facing message for a sample that is unknown to the submission
/// registry or cannot be referenced by the submitting account.
pub fn sample_validation_message(sample_id: &str) -> String {
    format!(
        "Unknown sample {sample_id} or the sample cannot be referenced by your submission account. \
         Samples must be submitted before they can be referenced in the submission."
    )
}

/// Coarse error classification used to decide whether a failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 5xx response
    ServerError,
    /// Connection could not be established or was dropped
    Connection,
    /// Request exceeded the client timeout
    Timeout,
    /// 4xx response other than the ones mapped to a domain outcome
    ClientError,
    /// User-facing validation failure
    Validation,
    /// Response could not be decoded
    Parse,
    /// Bad configuration
    Config,
    /// Transient failure that outlived the retry budget
    System,
    /// Bug
    Internal,
}

/// Error kinds that indicate a transport-level failure worth retrying.
pub const TRANSPORT_ERRORS: &[ErrorKind] = &[
    ErrorKind::ServerError,
    ErrorKind::Connection,
    ErrorKind::Timeout,
];

/// Top-level error type for sampleref.
#[derive(Debug, Error)]
pub enum ResolverError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED: Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    /// Stable, user-readable message. Never retried.
    #[error("{0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED: Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("HTTP {status} from {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("{context}: {source}")]
    System {
        context: String,
        #[source]
        source: Box<ResolverError>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED: Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolverError {
    /// Validation error for a sample that cannot be referenced.
    pub fn sample_not_referenceable(sample_id: &str) -> Self {
        Self::Validation(sample_validation_message(sample_id))
    }

    /// Wrap a failure that exhausted the retry budget.
    pub fn system(context: impl Into<String>, source: ResolverError) -> Self {
        Self::System {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Classify this error for retry decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Api { status, .. } if *status >= 500 => ErrorKind::ServerError,
            Self::Api { .. } => ErrorKind::ClientError,
            Self::Network(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Network(e) if e.is_status() => match e.status() {
                Some(status) if status.is_server_error() => ErrorKind::ServerError,
                _ => ErrorKind::ClientError,
            },
            // Includes bodies cut off mid-transfer, which reqwest reports as
            // decode errors. Payloads are parsed from complete bodies into `Parse`.
            Self::Network(_) => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::System { .. } => ErrorKind::System,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        TRANSPORT_ERRORS.contains(&self.kind())
    }

    /// Check if this error should be shown to the submitter as-is.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type alias for sampleref.
pub type Result<T> = std::result::Result<T, ResolverError>;
