// Scalar leaf values of a configuration tree.

use serde_json::{Number, Value};
use tracing::warn;

use crate::schema::FieldKind;

/// A configuration leaf: boolean, number or string.
///
/// Numbers are held as `f64`. Integral values go out on the wire as JSON
/// integers because the backend type-checks several fields as `int`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Largest integral `f64` that still has an exact `i64` representation.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

impl Scalar {
    /// Heuristic typing for values whose path no schema declares.
    ///
    /// `"true"`/`"false"` become booleans, non-empty numeric strings become
    /// numbers, everything else stays a string.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => parse_number(raw).map_or_else(|| Self::Text(raw.to_owned()), Self::Number),
        }
    }

    /// Parse raw input according to a declared field kind.
    ///
    /// Returns a message fit for inline display when the input does not
    /// fit the kind. Range and required checks live in the form.
    pub fn parse(kind: FieldKind, raw: &str) -> Result<Self, String> {
        match kind {
            FieldKind::Boolean => match raw {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(format!("Expected true or false, got {raw:?}")),
            },
            FieldKind::Number => parse_number(raw)
                .map(Self::Number)
                .ok_or_else(|| "Please enter a number".to_owned()),
            FieldKind::Integer => match parse_number(raw) {
                Some(n) if is_integral(n) => Ok(Self::Number(n)),
                Some(_) => Err("Please enter a whole number".to_owned()),
                None => Err("Please enter a number".to_owned()),
            },
            FieldKind::Text | FieldKind::Choice | FieldKind::Email => Ok(Self::Text(raw.to_owned())),
        }
    }

    /// Parse by kind, falling back to [`Scalar::infer`] for input the kind
    /// rejects. Used where partial input must still be kept (drafts).
    pub fn parse_lenient(kind: FieldKind, raw: &str) -> Self {
        Self::parse(kind, raw).unwrap_or_else(|_| Self::infer(raw))
    }

    /// Convert a JSON leaf back into a scalar. Objects, arrays and nulls
    /// are not leaves.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// The text a form input would show for this value.
    pub fn to_raw(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_raw())
    }
}

pub(crate) fn is_integral(n: f64) -> bool {
    n.fract().abs() < f64::EPSILON
}

/// Parse a finite decimal number, ignoring surrounding whitespace.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn number_to_json(n: f64) -> Value {
    if is_integral(n) && n.abs() < EXACT_INT_LIMIT {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or_else(
            || {
                warn!(value = n, "non-finite number dropped to null");
                Value::Null
            },
            Value::Number,
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub(crate) fn format_number(n: f64) -> String {
    if is_integral(n) && n.abs() < EXACT_INT_LIMIT {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn infer_booleans_numbers_and_text() {
        assert_eq!(Scalar::infer("true"), Scalar::Bool(true));
        assert_eq!(Scalar::infer("false"), Scalar::Bool(false));
        assert_eq!(Scalar::infer("15"), Scalar::Number(15.0));
        assert_eq!(Scalar::infer("2.5"), Scalar::Number(2.5));
        assert_eq!(Scalar::infer(""), Scalar::Text(String::new()));
        assert_eq!(Scalar::infer("   "), Scalar::Text("   ".into()));
        assert_eq!(Scalar::infer("12abc"), Scalar::Text("12abc".into()));
        assert_eq!(Scalar::infer("inf"), Scalar::Text("inf".into()));
        assert_eq!(Scalar::infer("True"), Scalar::Text("True".into()));
    }

    #[test]
    fn parse_follows_declared_kind() {
        assert_eq!(
            Scalar::parse(FieldKind::Text, "60"),
            Ok(Scalar::Text("60".into()))
        );
        assert_eq!(
            Scalar::parse(FieldKind::Integer, "3"),
            Ok(Scalar::Number(3.0))
        );
        assert!(Scalar::parse(FieldKind::Integer, "3.5").is_err());
        assert!(Scalar::parse(FieldKind::Number, "abc").is_err());
        assert!(Scalar::parse(FieldKind::Boolean, "yes").is_err());
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(Scalar::Number(60.0).to_json(), json!(60));
        assert_eq!(Scalar::Number(2.5).to_json(), json!(2.5));
        assert_eq!(Scalar::Number(60.0).to_raw(), "60");
        assert_eq!(Scalar::Number(0.5).to_raw(), "0.5");
    }

    #[test]
    fn json_leaves_round_trip() {
        for v in [json!(true), json!(5), json!(1.5), json!("INFO")] {
            let scalar = Scalar::from_json(&v).unwrap_or(Scalar::Bool(false));
            assert_eq!(scalar.to_json(), v);
        }
        assert_eq!(Scalar::from_json(&json!({})), None);
    }
}
