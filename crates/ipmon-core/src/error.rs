// ── Core error types ──
//
// User-facing errors from ipmon-core. The `From<ipmon_api::Error>` impl
// translates transport-layer errors into variants the front ends can turn
// straight into status messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::form::FormError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the IP monitor at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to the IP monitor timed out")]
    Timeout,

    // ── Backend errors ───────────────────────────────────────────────
    #[error("{message}")]
    Api {
        message: String,
        /// What the backend itself said, if anything.
        server_message: Option<String>,
        status: Option<u16>,
    },

    #[error("Segment {segment} has not been scanned yet")]
    NotScanned { segment: String },

    // ── Form errors ──────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(#[from] FormError),

    // ── Local storage errors ─────────────────────────────────────────
    #[error("Draft storage error: {message}")]
    Draft { message: String },

    #[error("Cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {message}")]
    InvalidFile { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The backend's own explanation of a failed request, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { server_message, .. } => server_message.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for failures a later retry may resolve.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout | Self::NotScanned { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ipmon_api::Error> for CoreError {
    fn from(err: ipmon_api::Error) -> Self {
        match err {
            ipmon_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        server_message: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ipmon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ipmon_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ipmon_api::Error::Api { status, message } => CoreError::Api {
                message: message
                    .clone()
                    .unwrap_or_else(|| format!("HTTP {status}")),
                server_message: message,
                status: Some(status),
            },
            ipmon_api::Error::NoContent { segment } => CoreError::NotScanned { segment },
            ipmon_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Unexpected response: {message}"),
                server_message: None,
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_server_message() {
        let err: CoreError = ipmon_api::Error::Api {
            status: 400,
            message: Some("Intervalo inválido".into()),
        }
        .into();
        assert_eq!(err.server_message(), Some("Intervalo inválido"));
        assert_eq!(err.to_string(), "Intervalo inválido");
        assert!(!err.is_transient());
    }

    #[test]
    fn bare_api_error_has_no_server_message() {
        let err: CoreError = ipmon_api::Error::Api {
            status: 502,
            message: None,
        }
        .into();
        assert_eq!(err.server_message(), None);
        assert_eq!(err.to_string(), "HTTP 502");
        assert!(err.is_transient());
    }

    #[test]
    fn no_content_maps_to_not_scanned() {
        let err: CoreError = ipmon_api::Error::NoContent {
            segment: "86".into(),
        }
        .into();
        assert!(matches!(err, CoreError::NotScanned { ref segment } if segment == "86"));
    }
}
