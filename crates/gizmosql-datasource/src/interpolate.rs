//! Formatting of template variable values as SQL literals.
//!
//! Values that look like numbers are substituted verbatim so that they can be
//! compared against numeric columns; everything else becomes a single-quoted
//! string literal with embedded quotes doubled.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The current value of a template variable.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// A single selected value.
    Single(String),
    /// Several selected values, in selection order.
    Multi(Vec<String>),
    /// Anything else Grafana may hand us (numbers, booleans, ...).
    Other(Value),
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl<S: Into<String>> FromIterator<S> for VariableValue {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::Multi(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for VariableValue {
    /// The plain, unquoted form of the value; multiple values are joined with `,`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(s) => f.write_str(s),
            Self::Multi(values) => f.write_str(&values.join(",")),
            Self::Other(Value::String(s)) => f.write_str(s),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

/// What Grafana tells us about the variable being interpolated.
///
/// Neither flag changes how values are formatted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMeta {
    /// The variable allows selecting several values.
    #[serde(default)]
    pub multi: bool,
    /// The variable has an "All" option.
    #[serde(default)]
    pub include_all: bool,
}

/// Format a template variable value for direct substitution into SQL.
///
/// A single value is passed through [`quote_literal`]; several values are each
/// quoted and joined with `,` (no surrounding brackets), ready for use inside
/// `IN (...)`. Any other kind of value is substituted in its plain string form.
pub fn interpolate_variable(value: &VariableValue, _meta: VariableMeta) -> String {
    match value {
        VariableValue::Single(s) => quote_literal(s),
        VariableValue::Multi(values) => values
            .iter()
            .map(|v| quote_literal(v))
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Quote a single value as a SQL literal.
///
/// Numeric values are returned unchanged; anything else is wrapped in single
/// quotes with every `'` doubled.
pub fn quote_literal(value: &str) -> String {
    if is_numeric(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "''"))
}

/// Whether `value` reads as a number once surrounding whitespace is ignored.
///
/// Blank input counts as a number, as do decimal numbers (with optional sign,
/// fraction and exponent, including ones too large for `f64`), a signed
/// `Infinity`, and `0x`/`0o`/`0b` prefixed integers.
fn is_numeric(value: &str) -> bool {
    let s = value.trim();
    if s.is_empty() {
        return true;
    }
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    if unsigned == "Infinity" {
        return true;
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        // `f64` parsing also takes `inf` and `nan` spellings, which are not numbers here.
        _ => {
            return !unsigned.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
                && s.parse::<f64>().is_ok()
        }
    };
    let digits = &s[2..];
    !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_are_not_quoted() {
        for s in ["0", "42", "-7", "+3", "3.14", ".5", "1e3", "2.5E-4", "0x1F", "0b101", " 12 "] {
            assert_eq!(quote_literal(s), s, "{s}");
        }
    }

    #[test]
    fn blank_and_unbounded_values_are_numbers() {
        for s in ["", "   ", "Infinity", "-Infinity", "+Infinity", "1e400", "-1e400"] {
            assert_eq!(quote_literal(s), s, "{s:?}");
        }
    }

    #[test]
    fn strings_are_quoted() {
        assert_eq!(quote_literal("abc"), "'abc'");
        assert_eq!(quote_literal("db1.example.com"), "'db1.example.com'");
        assert_eq!(quote_literal("2024-01-01"), "'2024-01-01'");
    }

    #[test]
    fn not_quite_numbers_are_quoted() {
        for s in ["NaN", "nan", "inf", "-inf", "infinity", "1e", "0x", "0xZZ", "-0x1F", "1,000", "12abc", "1_000"] {
            assert_eq!(quote_literal(s), format!("'{s}'"), "{s:?}");
        }
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(
            quote_literal("x' OR '1'='1"),
            "'x'' OR ''1''=''1'"
        );
        assert_eq!(quote_literal("''"), "''''''");
    }

    #[test]
    fn single_value() {
        let meta = VariableMeta::default();
        assert_eq!(interpolate_variable(&"eu-west".into(), meta), "'eu-west'");
        assert_eq!(interpolate_variable(&"10".into(), meta), "10");
    }

    #[test]
    fn multiple_values_are_joined() {
        let meta = VariableMeta {
            multi: true,
            include_all: false,
        };
        let value: VariableValue = ["a", "b"].into_iter().collect();
        assert_eq!(
            interpolate_variable(&value, meta),
            format!("{},{}", quote_literal("a"), quote_literal("b"))
        );
        let value: VariableValue = ["1", "it's", "3"].into_iter().collect();
        assert_eq!(interpolate_variable(&value, meta), "1,'it''s',3");
    }

    #[test]
    fn empty_list_is_empty() {
        let value = VariableValue::Multi(vec![]);
        assert_eq!(interpolate_variable(&value, VariableMeta::default()), "");
    }

    #[test]
    fn flags_do_not_change_output() {
        let value: VariableValue = ["x", "5"].into_iter().collect();
        let plain = interpolate_variable(&value, VariableMeta::default());
        let all = interpolate_variable(
            &value,
            VariableMeta {
                multi: true,
                include_all: true,
            },
        );
        assert_eq!(plain, all);
    }

    #[test]
    fn other_values_are_stringified() {
        let meta = VariableMeta::default();
        assert_eq!(
            interpolate_variable(&VariableValue::Other(json!(12.5)), meta),
            "12.5"
        );
        assert_eq!(
            interpolate_variable(&VariableValue::Other(json!(true)), meta),
            "true"
        );
        assert_eq!(
            interpolate_variable(&VariableValue::Other(Value::Null), meta),
            "null"
        );
    }

    #[test]
    fn deserializes_untagged() {
        let single: VariableValue = serde_json::from_value(json!("a")).unwrap();
        assert_eq!(single, VariableValue::Single("a".to_string()));
        let multi: VariableValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(
            multi,
            VariableValue::Multi(vec!["a".to_string(), "b".to_string()])
        );
        let other: VariableValue = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(other, VariableValue::Other(json!(3)));
    }
}
