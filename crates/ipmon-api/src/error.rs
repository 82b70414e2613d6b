use thiserror::Error;

/// Top-level error type for the `ipmon-api` crate.
///
/// Covers every failure mode of the backend surface: transport, URL
/// construction, HTTP status errors, and response decoding.
/// `ipmon-core` maps these into user-facing status messages.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend API ─────────────────────────────────────────────────
    /// Non-success HTTP status. `message` carries whatever the backend put
    /// in its `message` or `error` key, if anything.
    #[error("API error (HTTP {status}){}", suffix(.message.as_deref()))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// `204 No Content` from the segment status endpoint: the segment has
    /// not been scanned yet.
    #[error("Segment {segment} has not been scanned yet (HTTP 204)")]
    NoContent { segment: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// An unscanned segment counts: the backend fills it in on its next
    /// background sweep.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::NoContent { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if the backend could not be reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    /// The message the backend attached to a failed request, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NoContent { .. } => Some(204),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
