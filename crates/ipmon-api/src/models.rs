// Wire types for the IP monitor backend.
//
// The backend mixes Portuguese and English keys; field names here are
// English with serde renames carrying the wire spelling.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// JSON reply from the configuration endpoints.
///
/// Success replies carry `success` and `message`; failures (HTTP 4xx/5xx)
/// carry only `error`. Every field is optional so either shape decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiReply {
    /// The human-readable text of the reply: `message`, then `error`.
    pub fn server_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.trim().is_empty())
    }

    /// Whether the backend explicitly flagged the request as failed.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }

    /// Decode the `details` block of a dry-run test reply. A block of an
    /// unexpected shape is logged and treated as absent.
    pub fn test_details(&self) -> Option<TestDetails> {
        let details = self.details.clone()?;
        match serde_json::from_value(details) {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(error = %e, "unexpected test details shape");
                None
            }
        }
    }
}

/// `details` block returned by `POST /api/config/test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDetails {
    /// Number of ping intervals the backend checked.
    #[serde(default)]
    pub ping_tests: Option<u64>,
    #[serde(default)]
    pub network_connectivity: Option<bool>,
    #[serde(default)]
    pub config_validity: Option<bool>,
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_owned()
}

impl TestDetails {
    /// `(label, value)` pairs for display, skipping absent entries.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        [
            ("Ping tests", self.ping_tests.map(|n| n.to_string())),
            ("Network connectivity", self.network_connectivity.map(yes_no)),
            ("Config validity", self.config_validity.map(yes_no)),
        ]
        .into_iter()
        .filter_map(|(label, v)| v.map(|v| (label, v)))
        .collect()
    }
}

/// One device entry from `GET api/start-check/{segment}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(default)]
    pub ip: String,
    /// Reachability as reported by the backend sweep (`on`, `off`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Device type label.
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
