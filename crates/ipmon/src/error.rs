//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use ipmon_config::ConfigError;
use ipmon_core::{CoreError, FormError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the IP monitor at {url}")]
    #[diagnostic(
        code(ipmon::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}\n\
             Try: ipmon --server http://<host>:<port> status"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(ipmon::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(ipmon::operation_failed))]
    OperationFailed { message: String },

    #[error("Segment {segment} has no status yet")]
    #[diagnostic(
        code(ipmon::not_scanned),
        help("The server has not scanned this segment. Try again shortly.")
    )]
    NotScanned { segment: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ipmon::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown field '{path}'")]
    #[diagnostic(
        code(ipmon::unknown_field),
        help("Run: ipmon config show to list the form fields")
    )]
    UnknownField { path: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ipmon::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ipmon profile init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No IP monitor server configured")]
    #[diagnostic(
        code(ipmon::no_config),
        help(
            "Pass --server <URL>, set IPMON_SERVER, or create a profile with: ipmon profile init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ipmon::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ipmon::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(ipmon::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<FormError> for CliError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::UnknownField { path } => Self::UnknownField { path },
            other => Self::Validation {
                field: other.path().to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotScanned { .. } | Self::ProfileNotFound { .. } | Self::UnknownField { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl CliError {
    /// Translate a core error, filling in the timeout the request ran
    /// with.
    pub fn from_core(err: CoreError, timeout_secs: u64) -> Self {
        match err {
            CoreError::Timeout => CliError::Timeout {
                seconds: timeout_secs,
            },
            other => other.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Timeout => CliError::Timeout { seconds: 0 },

            CoreError::NotScanned { segment } => CliError::NotScanned { segment },

            CoreError::Validation(form) => form.into(),

            CoreError::Api { .. } => CliError::OperationFailed {
                message: err.to_string(),
            },

            CoreError::InvalidFile { message } => CliError::Validation {
                field: "file".into(),
                reason: message,
            },

            CoreError::Io { path, source } => CliError::Io(std::io::Error::new(
                source.kind(),
                format!("{}: {source}", path.display()),
            )),

            CoreError::Draft { message } | CoreError::Config { message } => {
                CliError::OperationFailed { message }
            }
        }
    }
}
