//! Client for the monitoring server's administrative HTTP API
//!
//! Every call carries the optional basic-auth pair and the configured
//! timeout. Any non-2xx answer becomes [`RemoteError::Status`] with the
//! response body attached.

pub mod client;
pub mod types;

pub use client::{BasicAuth, ClientSettings, PrometheusClient};
pub use types::{AlertInstance, QueryData};

/// Monitoring-server call failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Prometheus returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Prometheus request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Prometheus API error ({error_type}): {error}")]
    Api { error_type: String, error: String },
}

impl RemoteError {
    /// HTTP status returned by the server, if it answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
