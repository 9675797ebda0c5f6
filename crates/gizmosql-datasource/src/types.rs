//! The data shapes shared between Grafana, the editors and the backend.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The Flight SQL port GizmoSQL listens on by default.
pub const DEFAULT_PORT: u16 = 31337;

/// The username sent during the basic-auth handshake when none is configured.
pub const DEFAULT_USERNAME: &str = "gizmosql";

/// The SQL used for new panels.
pub const DEFAULT_SQL: &str = "SELECT 1";

/// How query results should be shaped before being handed back to Grafana.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Return the result set as-is.
    #[default]
    Table,
    /// Move the time column to the front so Grafana can plot the frame.
    TimeSeries,
}

impl Format {
    /// Every format, in the order the query editor offers them.
    pub const ALL: [Format; 2] = [Format::Table, Format::TimeSeries];

    /// The wire value of this format.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::TimeSeries => "time_series",
        }
    }

    /// The label shown in the query editor.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::TimeSeries => "Time Series",
        }
    }

    /// The description shown under the label in the query editor.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Table => "Return results as a table",
            Self::TimeSeries => "Return results as time series (requires a time column)",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query as stored in a panel and sent to the backend.
///
/// Fields owned by Grafana itself (`refId`, `datasource`, `hide`, ...) are
/// kept in `other` so that a query survives a round trip through the
/// editors untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GizmoSqlQuery {
    /// The SQL text, possibly containing template variables and macros.
    #[serde(default)]
    pub raw_sql: String,
    /// How the results should be shaped.
    #[serde(default)]
    pub format: Format,
    /// Host-owned fields.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl GizmoSqlQuery {
    /// Create a query with the given SQL and format.
    pub fn new(raw_sql: impl Into<String>, format: Format) -> Self {
        Self {
            raw_sql: raw_sql.into(),
            format,
            other: Map::new(),
        }
    }

    /// The query used for new panels: `SELECT 1` as a table.
    pub fn default_query() -> Self {
        Self::new(DEFAULT_SQL, Format::Table)
    }

    /// Return a copy of this query with the SQL replaced.
    #[must_use]
    pub fn with_raw_sql(&self, raw_sql: impl Into<String>) -> Self {
        Self {
            raw_sql: raw_sql.into(),
            ..self.clone()
        }
    }

    /// Return a copy of this query with the format replaced.
    #[must_use]
    pub fn with_format(&self, format: Format) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}

/// Non-secret connection settings, stored by Grafana as the datasource's `jsonData`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsonData {
    /// Hostname or IP address of the GizmoSQL server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Flight SQL port. Stored as a plain integer; see [`JsonData::port`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Username for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Whether to connect over TLS.
    #[serde(default, rename = "useTLS", skip_serializing_if = "Option::is_none")]
    pub use_tls: Option<bool>,
    /// Whether to skip verification of the server certificate.
    #[serde(
        default,
        rename = "skipTLSVerify",
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_tls_verify: Option<bool>,
}

impl JsonData {
    /// The configured host, or the empty string.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or_default()
    }

    /// The configured port, falling back to [`DEFAULT_PORT`] when missing or
    /// not a valid TCP port.
    pub fn port(&self) -> u16 {
        self.port
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PORT)
    }

    /// The configured username, or the empty string.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Whether TLS is enabled.
    pub fn use_tls(&self) -> bool {
        self.use_tls.unwrap_or(false)
    }

    /// Whether certificate verification should be skipped.
    ///
    /// The stored value is returned as-is; it only has an effect while
    /// [`JsonData::use_tls`] is true.
    pub fn skip_tls_verify(&self) -> bool {
        self.skip_tls_verify.unwrap_or(false)
    }
}

/// Parse the text of the port input.
///
/// The leading run of digits is read and anything after it ignored, so
/// `"8080abc"` is 8080 and `"12.5"` is 12. Input with no leading digits, or
/// that is not a valid non-zero TCP port, resolves to [`DEFAULT_PORT`].
pub fn parse_port(input: &str) -> u16 {
    let s = input.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end]
        .parse::<u16>()
        .ok()
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_PORT)
}

/// Secrets, stored encrypted by Grafana as the datasource's `secureJsonData`.
///
/// Grafana only ever sends these to the backend, decrypted; the editor can
/// write them but never reads them back.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecureJsonData {
    /// Password for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Bearer token, used when no password is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SecureJsonData {
    /// The password, if one is set and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|s| !s.is_empty())
    }

    /// The token, if one is set and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for SecureJsonData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SecureJsonData")
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Which secrets Grafana reports as already stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecureJsonFields {
    /// A password has been saved.
    #[serde(default)]
    pub password: bool,
    /// A token has been saved.
    #[serde(default)]
    pub token: bool,
}

/// The datasource settings object Grafana passes to the config editor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSettings {
    /// The datasource name.
    #[serde(default)]
    pub name: String,
    /// Non-secret settings.
    #[serde(default)]
    pub json_data: JsonData,
    /// Secrets entered in this editing session, not yet saved.
    #[serde(default)]
    pub secure_json_data: SecureJsonData,
    /// Which secrets are already saved.
    #[serde(default)]
    pub secure_json_fields: SecureJsonFields,
}
