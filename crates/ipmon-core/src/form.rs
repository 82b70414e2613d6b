// ── Settings form state ──
//
// Holds the raw text of every declared field the way an input widget
// would, plus its enabled flag and inline error. Input, blur and change
// handling all go through here so the CLI and TUI behave the same.

use thiserror::Error;
use tracing::debug;

use crate::message::StatusMessage;
use crate::schema::{
    AUTO_REFRESH, FieldKind, FieldSpec, REFRESH_RATE, REFRESH_RATE_FALLBACK, Schema, is_email,
};
use crate::tree::ConfigTree;
use crate::value::{Scalar, format_number, parse_number};

/// Why a form operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Unknown field: {path}")]
    UnknownField { path: String },

    #[error("{label} is disabled")]
    Disabled { path: String, label: &'static str },

    #[error("{label}: {message}")]
    Invalid {
        path: String,
        label: &'static str,
        message: String,
    },
}

impl FormError {
    /// Dotted path of the field the error is about.
    pub fn path(&self) -> &str {
        match self {
            Self::UnknownField { path } | Self::Disabled { path, .. } | Self::Invalid { path, .. } => {
                path
            }
        }
    }
}

/// One input of the settings form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    spec: FieldSpec,
    raw: String,
    enabled: bool,
    error: Option<String>,
}

impl FormField {
    fn new(spec: FieldSpec) -> Self {
        let raw = spec.default.to_raw();
        Self {
            spec,
            raw,
            enabled: true,
            error: None,
        }
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn path(&self) -> &'static str {
        self.spec.path
    }

    pub fn label(&self) -> &'static str {
        self.spec.label
    }

    pub fn kind(&self) -> FieldKind {
        self.spec.kind
    }

    /// Current input text. Checkboxes hold `"true"` or `"false"`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Inline validation message from the last check, if the field is
    /// invalid.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_checked(&self) -> bool {
        self.raw == "true"
    }

    /// Constraint check. Disabled fields are exempt, as in an HTML form.
    fn check(&self) -> Option<String> {
        if !self.enabled || self.spec.kind == FieldKind::Boolean {
            return None;
        }
        let raw = self.raw.trim();
        if raw.is_empty() {
            return self
                .spec
                .required
                .then(|| "Please fill out this field.".to_owned());
        }

        match self.spec.kind {
            FieldKind::Integer | FieldKind::Number => {
                let value = match Scalar::parse(self.spec.kind, raw) {
                    Ok(Scalar::Number(n)) => n,
                    Ok(_) => return None,
                    Err(message) => return Some(message),
                };
                if let Some(min) = self.spec.min.filter(|min| value < *min) {
                    return Some(format!(
                        "Value must be greater than or equal to {}.",
                        format_number(min)
                    ));
                }
                if let Some(max) = self.spec.max.filter(|max| value > *max) {
                    return Some(format!(
                        "Value must be less than or equal to {}.",
                        format_number(max)
                    ));
                }
                None
            }
            FieldKind::Choice if !self.spec.choices.contains(&raw) => Some(format!(
                "Please select one of: {}.",
                self.spec.choices.join(", ")
            )),
            FieldKind::Email if !is_email(raw) => Some("Please enter an email address.".into()),
            _ => None,
        }
    }

    fn invalid(&self, message: String) -> FormError {
        FormError::Invalid {
            path: self.spec.path.to_owned(),
            label: self.spec.label,
            message,
        }
    }

    /// The value this field contributes to a submitted tree, or `None`
    /// when it is left out (disabled, or an empty optional number).
    fn submitted(&self) -> Result<Option<Scalar>, FormError> {
        if self.spec.kind == FieldKind::Boolean {
            return Ok(Some(Scalar::Bool(self.is_checked())));
        }
        if !self.enabled {
            return Ok(None);
        }
        if self.raw.trim().is_empty() && self.spec.kind.is_numeric() && !self.spec.required {
            return Ok(None);
        }
        Scalar::parse(self.spec.kind, &self.raw)
            .map(Some)
            .map_err(|message| self.invalid(message))
    }
}

/// Outcome of [`ConfigForm::populate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Leaves copied into fields.
    pub applied: usize,
    /// Leaves with no matching field, by dotted path.
    pub ignored: Vec<String>,
}

/// The settings form.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigForm {
    fields: Vec<FormField>,
}

impl ConfigForm {
    /// A form showing the schema defaults.
    pub fn new(schema: &Schema) -> Self {
        let mut form = Self {
            fields: schema.fields().iter().cloned().map(FormField::new).collect(),
        };
        form.apply_auto_refresh_rule();
        form
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.spec.path == path)
    }

    fn field_mut(&mut self, path: &str) -> Result<&mut FormField, FormError> {
        self.fields
            .iter_mut()
            .find(|f| f.spec.path == path)
            .ok_or_else(|| FormError::UnknownField {
                path: path.to_owned(),
            })
    }

    /// Input event: replace a field's text and re-check it.
    ///
    /// Returns whether the field is valid afterwards. Checkbox paths accept
    /// `"true"`/`"false"` and behave like [`set_checked`](Self::set_checked).
    pub fn set_value(&mut self, path: &str, raw: &str) -> Result<bool, FormError> {
        let field = self.field_mut(path)?;
        if field.spec.kind == FieldKind::Boolean {
            let checked = match Scalar::parse(FieldKind::Boolean, raw.trim()) {
                Ok(Scalar::Bool(b)) => b,
                Ok(_) | Err(_) => {
                    return Err(field.invalid("Expected true or false".into()));
                }
            };
            self.set_checked(path, checked)?;
            return Ok(true);
        }
        if !field.enabled {
            return Err(FormError::Disabled {
                path: path.to_owned(),
                label: field.spec.label,
            });
        }
        field.raw = raw.to_owned();
        field.error = field.check();
        Ok(field.error.is_none())
    }

    /// Change event on a checkbox.
    pub fn set_checked(&mut self, path: &str, checked: bool) -> Result<(), FormError> {
        let field = self.field_mut(path)?;
        if field.spec.kind != FieldKind::Boolean {
            return Err(field.invalid("Not a checkbox".into()));
        }
        field.raw = checked.to_string();
        if path == AUTO_REFRESH {
            self.apply_auto_refresh_rule();
        }
        Ok(())
    }

    /// Flip a checkbox, returning its new state.
    pub fn toggle(&mut self, path: &str) -> Result<bool, FormError> {
        let checked = !self
            .field(path)
            .ok_or_else(|| FormError::UnknownField {
                path: path.to_owned(),
            })?
            .is_checked();
        self.set_checked(path, checked)?;
        Ok(checked)
    }

    /// Re-check one field and record its inline error.
    pub fn validate_field(&mut self, path: &str) -> Result<bool, FormError> {
        let field = self.field_mut(path)?;
        field.error = field.check();
        Ok(field.error.is_none())
    }

    /// Re-check every field. Returns `true` when the whole form is valid.
    pub fn validate_all(&mut self) -> bool {
        let mut valid = true;
        for field in &mut self.fields {
            field.error = field.check();
            valid &= field.error.is_none();
        }
        valid
    }

    /// Fields currently carrying an inline error.
    pub fn errors(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.error.as_deref().map(|e| (f.spec.path, e)))
    }

    /// Blur event: clamp an out-of-range number into `[min, max]`.
    ///
    /// Returns the notice to show when a value was corrected. Input that
    /// does not parse as a number is left for validation to report.
    pub fn blur(&mut self, path: &str) -> Option<StatusMessage> {
        let field = self.field_mut(path).ok()?;
        if !field.enabled || !field.spec.kind.is_numeric() {
            return None;
        }
        let value = parse_number(&field.raw)?;

        let notice = if let Some(min) = field.spec.min.filter(|min| value < *min) {
            field.raw = format_number(min);
            format!("Value adjusted to the minimum allowed: {}", format_number(min))
        } else if let Some(max) = field.spec.max.filter(|max| value > *max) {
            field.raw = format_number(max);
            format!("Value adjusted to the maximum allowed: {}", format_number(max))
        } else {
            return None;
        };

        debug!(path, raw = %field.raw, "clamped on blur");
        field.error = field.check();
        Some(StatusMessage::info(notice))
    }

    /// Auto refresh gates the refresh-rate input; switching it off also
    /// puts the rate back to its fallback.
    fn apply_auto_refresh_rule(&mut self) {
        let Some(auto) = self.field(AUTO_REFRESH).map(FormField::is_checked) else {
            return;
        };
        if let Ok(rate) = self.field_mut(REFRESH_RATE) {
            rate.enabled = auto;
            if !auto {
                rate.raw = format_number(REFRESH_RATE_FALLBACK);
                rate.error = None;
            }
        }
    }

    /// Serialize for sending: every checkbox, every enabled field typed by
    /// its declared kind. Fails on input that does not fit its kind.
    pub fn to_tree(&self) -> Result<ConfigTree, FormError> {
        let mut tree = ConfigTree::new();
        for field in &self.fields {
            if let Some(value) = field.submitted()? {
                tree.set(field.spec.path, &value);
            }
        }
        Ok(tree)
    }

    /// Validate everything, then serialize. A form with any inline error is
    /// not submitted.
    pub fn submission(&mut self) -> Result<ConfigTree, FormError> {
        self.validate_all();
        if let Some(field) = self.fields.iter().find(|f| f.error.is_some()) {
            let message = field.error.clone().unwrap_or_default();
            return Err(field.invalid(message));
        }
        self.to_tree()
    }

    /// Best-effort serialization that never fails: input that does not fit
    /// its kind is kept with inferred typing. Used for drafts and export.
    pub fn snapshot(&self) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for field in &self.fields {
            let value = match field.submitted() {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(_) => Scalar::parse_lenient(field.spec.kind, &field.raw),
            };
            tree.set(field.spec.path, &value);
        }
        tree
    }

    /// Copy a tree's leaves into matching fields, then re-apply the
    /// dependent-field rule and re-check everything.
    pub fn populate(&mut self, tree: &ConfigTree) -> PopulateReport {
        let mut report = PopulateReport::default();
        for (path, value) in tree.leaves() {
            let scalar = Scalar::from_json(&value);
            match (self.field_mut(&path), scalar) {
                (Ok(field), Some(scalar)) => {
                    field.raw = scalar.to_raw();
                    report.applied += 1;
                }
                _ => report.ignored.push(path),
            }
        }
        self.apply_auto_refresh_rule();
        self.validate_all();
        report
    }

    /// Back to schema defaults.
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.raw = field.spec.default.to_raw();
            field.enabled = true;
            field.error = None;
        }
        self.apply_auto_refresh_rule();
    }
}
