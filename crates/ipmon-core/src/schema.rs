// ── Form schema ──
//
// Declares every field of the settings form: its dotted path, how raw
// input is typed, and the constraints checked on input and blur.

use serde::Serialize;
use strum::{Display, EnumString};

use crate::tree::ConfigTree;
use crate::value::Scalar;

/// Checkbox gating [`REFRESH_RATE`].
pub const AUTO_REFRESH: &str = "ui_settings.auto_refresh";
/// Refresh-rate input, disabled while auto refresh is off.
pub const REFRESH_RATE: &str = "ui_settings.refresh_rate";
/// Value forced into [`REFRESH_RATE`] when auto refresh is switched off.
pub const REFRESH_RATE_FALLBACK: f64 = 5.0;

/// How a field's raw input is typed and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Boolean,
    Integer,
    Number,
    Text,
    Choice,
    Email,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

/// One declared form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub required: bool,
    /// Allowed values for [`FieldKind::Choice`].
    pub choices: &'static [&'static str],
    pub default: Scalar,
}

impl FieldSpec {
    fn number(path: &'static str, label: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            path,
            label,
            kind: FieldKind::Number,
            min: Some(min),
            max: Some(max),
            required: true,
            choices: &[],
            default: Scalar::Number(default),
        }
    }

    fn integer(path: &'static str, label: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::number(path, label, min, max, default)
        }
    }

    fn boolean(path: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            path,
            label,
            kind: FieldKind::Boolean,
            min: None,
            max: None,
            required: false,
            choices: &[],
            default: Scalar::Bool(default),
        }
    }

    fn choice(
        path: &'static str,
        label: &'static str,
        choices: &'static [&'static str],
        default: &str,
    ) -> Self {
        Self {
            path,
            label,
            kind: FieldKind::Choice,
            min: None,
            max: None,
            required: true,
            choices,
            default: Scalar::Text(default.into()),
        }
    }

    fn email(path: &'static str, label: &'static str) -> Self {
        Self {
            path,
            label,
            kind: FieldKind::Email,
            min: None,
            max: None,
            required: false,
            choices: &[],
            default: Scalar::Text(String::new()),
        }
    }

    /// Top-level group the field belongs to (`network_settings`, ...).
    pub fn section(&self) -> &'static str {
        self.path.split_once('.').map_or(self.path, |(head, _)| head)
    }

    /// Last path segment.
    pub fn key(&self) -> &'static str {
        self.path.rsplit_once('.').map_or(self.path, |(_, tail)| tail)
    }
}

/// Ordered set of declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// The IP monitor settings form, with the backend's defaults and limits.
    pub fn ipmonitor() -> Self {
        const THEMES: &[&str] = &["default", "dark", "light"];
        const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR"];

        let fields = vec![
            FieldSpec::number("ping_intervals.vlan_70", "VLAN 70 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("ping_intervals.vlan_80", "VLAN 80 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("ping_intervals.vlan_85", "VLAN 85 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("ping_intervals.vlan_86", "VLAN 86 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("ping_intervals.vlan_200", "VLAN 200 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("ping_intervals.vlan_204", "VLAN 204 ping interval (s)", 5.0, 300.0, 60.0),
            FieldSpec::number("network_settings.ping_timeout", "Ping timeout (s)", 1.0, 10.0, 2.0),
            FieldSpec::integer(
                "network_settings.max_concurrent_pings",
                "Max concurrent pings",
                1.0,
                10.0,
                3.0,
            ),
            FieldSpec::integer("network_settings.retry_attempts", "Retry attempts", 0.0, 5.0, 2.0),
            FieldSpec::boolean(AUTO_REFRESH, "Auto refresh", true),
            FieldSpec::integer(REFRESH_RATE, "Refresh rate (s)", 1.0, 60.0, REFRESH_RATE_FALLBACK),
            FieldSpec::boolean("ui_settings.show_offline_devices", "Show offline devices", true),
            FieldSpec::choice("ui_settings.theme", "Theme", THEMES, "default"),
            FieldSpec::boolean("monitoring.enable_logging", "Enable logging", true),
            FieldSpec::choice("monitoring.log_level", "Log level", LOG_LEVELS, "INFO"),
            FieldSpec::integer(
                "monitoring.max_log_entries",
                "Max log entries",
                100.0,
                10_000.0,
                1000.0,
            ),
            FieldSpec::boolean("monitoring.alert_on_device_down", "Alert on device down", false),
            FieldSpec::email("system_info.admin_contact", "Admin contact"),
        ];
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Tree holding every field's default value.
    pub fn defaults_tree(&self) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for field in &self.fields {
            tree.set(field.path, &field.default);
        }
        tree
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::ipmonitor()
    }
}

/// Loose e-mail shape check: one `@`, no whitespace, and a dot inside the
/// domain with text on both sides.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipmonitor_schema_declares_dependent_fields() {
        let schema = Schema::ipmonitor();
        let auto = schema.field(AUTO_REFRESH).map(|f| f.kind);
        let rate = schema.field(REFRESH_RATE).map(|f| f.kind);
        assert_eq!(auto, Some(FieldKind::Boolean));
        assert_eq!(rate, Some(FieldKind::Integer));
    }

    #[test]
    fn field_sections_and_keys() {
        let schema = Schema::ipmonitor();
        let timeout = schema.field("network_settings.ping_timeout");
        assert_eq!(timeout.map(FieldSpec::section), Some("network_settings"));
        assert_eq!(timeout.map(FieldSpec::key), Some("ping_timeout"));
    }

    #[test]
    fn defaults_tree_uses_integers_on_the_wire() {
        let tree = Schema::ipmonitor().defaults_tree();
        assert_eq!(
            tree.get("network_settings.max_concurrent_pings"),
            Some(&serde_json::json!(3))
        );
        assert_eq!(
            tree.get("monitoring.log_level"),
            Some(&serde_json::json!("INFO"))
        );
    }

    #[test]
    fn email_shape() {
        assert!(is_email("noc@tce.go.gov.br"));
        assert!(is_email("a@b.c"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a@.b"));
        assert!(!is_email("a@b."));
        assert!(!is_email("@b.c"));
        assert!(!is_email("a b@c.d"));
        assert!(!is_email("a@b@c.d"));
    }
}
