//! Substitution of template variables in SQL text.
//!
//! Recognizes `$name`, `${name}`, `${name:format}`, `[[name]]` and
//! `[[name:format]]`. References to variables that are not in scope,
//! such as the `$__timeFrom` family of macros, are left exactly as written
//! so that later stages can expand them.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interpolate::{VariableMeta, VariableValue};

/// A variable available for substitution.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ScopedVar {
    /// Display text of the current selection.
    #[serde(default)]
    pub text: String,
    /// The current value.
    pub value: VariableValue,
    /// Selection flags of the variable definition.
    #[serde(default)]
    pub meta: VariableMeta,
}

impl ScopedVar {
    /// A variable whose text is its plain value.
    pub fn new(value: impl Into<VariableValue>) -> Self {
        let value = value.into();
        Self {
            text: value.to_string(),
            value,
            meta: VariableMeta::default(),
        }
    }

    /// A multi-value variable.
    pub fn multi<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            meta: VariableMeta {
                multi: true,
                include_all: false,
            },
            ..Self::new(values.into_iter().collect::<VariableValue>())
        }
    }
}

/// Variables in scope for a single substitution, keyed by name.
pub type ScopedVars = HashMap<String, ScopedVar>;

/// An explicit format requested with `${name:format}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VariableFormat {
    Raw,
    Csv,
    SingleQuote,
    DoubleQuote,
    SqlString,
}

impl VariableFormat {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "raw" => Self::Raw,
            "csv" => Self::Csv,
            "singlequote" => Self::SingleQuote,
            "doublequote" => Self::DoubleQuote,
            "sqlstring" => Self::SqlString,
            _ => return None,
        })
    }

    fn apply(self, value: &VariableValue) -> String {
        let values: Vec<String> = match value {
            VariableValue::Multi(values) => values.clone(),
            other => vec![other.to_string()],
        };
        let quoted: Vec<String> = match self {
            Self::Raw | Self::Csv => values,
            Self::SingleQuote => values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "\\'")))
                .collect(),
            Self::DoubleQuote => values
                .iter()
                .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                .collect(),
            Self::SqlString => values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect(),
        };
        quoted.join(",")
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Reference<'a> {
    name: &'a str,
    format: Option<&'a str>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_inner(inner: &str) -> Option<Reference<'_>> {
    let (name, format) = match inner.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (inner, None),
    };
    (!name.is_empty() && name.chars().all(is_name_char)).then_some(Reference { name, format })
}

/// Parse a variable reference at the start of `s`, returning it along with
/// the number of bytes it spans.
fn parse_reference(s: &str) -> Option<(Reference<'_>, usize)> {
    if let Some(rest) = s.strip_prefix("${") {
        let end = rest.find('}')?;
        return parse_inner(&rest[..end]).map(|r| (r, end + 3));
    }
    if let Some(rest) = s.strip_prefix("[[") {
        let end = rest.find("]]")?;
        return parse_inner(&rest[..end]).map(|r| (r, end + 4));
    }
    let rest = s.strip_prefix('$')?;
    let len = rest.find(|c| !is_name_char(c)).unwrap_or(rest.len());
    (len > 0).then(|| {
        (
            Reference {
                name: &rest[..len],
                format: None,
            },
            len + 1,
        )
    })
}

/// Replace every in-scope variable reference in `target`.
///
/// `formatter` renders values for references without an explicit format, and
/// for references whose format is not one of `raw`, `csv`, `singlequote`,
/// `doublequote` or `sqlstring`.
pub fn replace<F>(target: &str, scoped_vars: &ScopedVars, mut formatter: F) -> String
where
    F: FnMut(&VariableValue, VariableMeta) -> String,
{
    let mut out = String::with_capacity(target.len());
    let mut rest = target;
    while let Some(pos) = rest.find(['$', '[']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some((reference, len)) = parse_reference(tail) else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
            continue;
        };
        match scoped_vars.get(reference.name) {
            Some(var) => {
                let rendered = match reference.format.and_then(VariableFormat::parse) {
                    Some(format) => format.apply(&var.value),
                    None => formatter(&var.value, var.meta),
                };
                out.push_str(&rendered);
            }
            None => out.push_str(&tail[..len]),
        }
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}
