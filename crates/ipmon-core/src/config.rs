// ── Runtime connection configuration ──
//
// Describes how to reach the backend and how the poller paces itself.
// The CLI/TUI builds a `MonitorConfig` from a profile and hands it in;
// core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use ipmon_api::{IpmonClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Host substring that marks the production deployment.
pub const DEFAULT_PRODUCTION_HOST: &str = "tce.go.gov.br";

/// Segment selected when the status view starts.
pub const DEFAULT_SEGMENT: &str = "85";

/// VLAN segments the backend sweeps.
pub const KNOWN_SEGMENTS: [&str; 6] = ["70", "80", "85", "86", "200", "204"];

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed internal servers).
    DangerAcceptInvalid,
}

/// Everything needed to talk to one IP monitor server.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Server root (e.g. `http://10.0.0.5:5000`).
    pub url: Url,
    /// Host substring that switches on the `/ipmonitor` path prefix.
    pub production_host: String,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Period of the automatic status refresh.
    pub poll_interval: Duration,
    /// Delay before retrying a failed status refresh.
    pub retry_delay: Duration,
    /// Segment forced into the selector when polling starts.
    pub default_segment: String,
    /// Where the local draft lives. `None` keeps drafts in memory.
    pub draft_path: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            production_host: DEFAULT_PRODUCTION_HOST.into(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            default_segment: DEFAULT_SEGMENT.into(),
            draft_path: None,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    /// Build the HTTP client for this server.
    pub fn client(&self) -> Result<IpmonClient, CoreError> {
        let client = IpmonClient::new(self.url.clone(), &self.production_host, &self.transport())?;
        Ok(client)
    }
}
