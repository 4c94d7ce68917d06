use thiserror::Error;

/// Errors returned by [`crate::ApiClient`] and [`crate::SeoulOpenApi`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response: DNS, connect, TLS, timeout, reset.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Upstream answered 2xx but its envelope carried an error code.
    #[error("upstream error {code}: {message}")]
    Upstream { code: String, message: String },

    /// The response body could not be parsed as JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid row range {start}..={end}: rows are 1-based and end must not precede start")]
    InvalidRange { start: u32, end: u32 },

    #[error("connection pool is closed")]
    PoolClosed,
}

impl ClientError {
    /// HTTP-equivalent status for this error.
    ///
    /// Remote errors keep the upstream status; everything that never reached
    /// a well-formed upstream answer maps to 500, and malformed answers to 502.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ClientError::Remote { status, .. } => *status,
            ClientError::Upstream { .. } | ClientError::Deserialize { .. } => 502,
            ClientError::InvalidRange { .. } => 400,
            ClientError::Transport(_) | ClientError::InvalidUrl { .. } | ClientError::PoolClosed => {
                500
            }
        }
    }
}
