//! A small Arrow Flight SQL client for running one statement against GizmoSQL.
use std::{fmt, sync::Arc, time::Duration};

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use arrow_flight::sql::client::FlightSqlServiceClient;
use futures_util::TryStreamExt;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::{
    error::FlightSqlError,
    tls,
    types::{JsonData, SecureJsonData, DEFAULT_USERNAME},
};

/// How long to wait for a connection to be established.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How to authenticate with the server.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// No credentials.
    Anonymous,
    /// Flight SQL basic-auth handshake; the server's bearer token is used afterwards.
    Basic {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },
    /// A bearer token sent with every call.
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Everything needed to reach and authenticate with a GizmoSQL server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Server hostname or IP address.
    pub host: String,
    /// Flight SQL port.
    pub port: u16,
    /// Whether to connect over TLS.
    pub use_tls: bool,
    /// Whether to accept any server certificate.
    pub skip_tls_verify: bool,
    /// Credentials.
    pub auth: Auth,
}

impl ConnectionSettings {
    /// Resolve the datasource's stored settings.
    ///
    /// A password takes precedence over a token, and basic auth without a
    /// username uses [`DEFAULT_USERNAME`].
    pub fn new(json_data: &JsonData, secure_json_data: &SecureJsonData) -> Self {
        let auth = match (secure_json_data.password(), secure_json_data.token()) {
            (Some(password), _) => Auth::Basic {
                username: match json_data.username() {
                    "" => DEFAULT_USERNAME.to_string(),
                    username => username.to_string(),
                },
                password: password.to_string(),
            },
            (None, Some(token)) => Auth::Bearer(token.to_string()),
            (None, None) => Auth::Anonymous,
        };
        Self {
            host: json_data.host().trim().to_string(),
            port: json_data.port(),
            use_tls: json_data.use_tls(),
            skip_tls_verify: json_data.skip_tls_verify(),
            auth,
        }
    }

    /// The URI of the gRPC channel.
    ///
    /// This is always `http`, since TLS is layered on by our own connector.
    pub fn uri(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// The results of a statement.
#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    /// The result schema, when the server reported one or returned any batches.
    pub schema: Option<SchemaRef>,
    /// All record batches from all endpoints, in endpoint order.
    pub batches: Vec<RecordBatch>,
}

/// An authenticated Flight SQL connection.
pub struct Connection {
    client: FlightSqlServiceClient<Channel>,
}

impl Connection {
    /// Connect and authenticate.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, FlightSqlError> {
        if settings.host.is_empty() {
            return Err(FlightSqlError::MissingHost);
        }
        let uri = settings.uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|source| FlightSqlError::InvalidEndpoint {
                endpoint: uri.clone(),
                source,
            })?
            .connect_timeout(CONNECT_TIMEOUT);

        debug!(endpoint = %uri, tls = settings.use_tls, "Connecting to GizmoSQL");
        let connect = async {
            if settings.use_tls {
                tls::connect(
                    &endpoint,
                    &settings.host,
                    settings.port,
                    settings.skip_tls_verify,
                )
                .await
            } else {
                endpoint
                    .connect()
                    .await
                    .map_err(|source| FlightSqlError::Connect {
                        endpoint: uri.clone(),
                        source,
                    })
            }
        };
        let channel = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| FlightSqlError::Timeout {
                endpoint: uri.clone(),
            })??;

        let mut client = FlightSqlServiceClient::new(channel);
        match &settings.auth {
            Auth::Anonymous => {}
            Auth::Basic { username, password } => {
                client
                    .handshake(username, password)
                    .await
                    .map_err(FlightSqlError::Authentication)?;
            }
            Auth::Bearer(token) => client.set_token(token.clone()),
        }
        Ok(Self { client })
    }

    /// Execute `sql` and read every result endpoint.
    ///
    /// A statement with no endpoints yields an empty result without a schema.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult, FlightSqlError> {
        let mut info = self
            .client
            .execute(sql.to_string(), None)
            .await
            .map_err(FlightSqlError::Execute)?;
        let endpoints = std::mem::take(&mut info.endpoint);
        if endpoints.is_empty() {
            debug!("Query returned no endpoints");
            return Ok(QueryResult::default());
        }
        let mut schema = if info.schema.is_empty() {
            None
        } else {
            Some(Arc::new(
                info.try_decode_schema().map_err(FlightSqlError::Schema)?,
            ))
        };

        let mut batches = Vec::new();
        for endpoint in endpoints {
            let ticket = endpoint.ticket.ok_or(FlightSqlError::MissingTicket)?;
            let stream = self
                .client
                .do_get(ticket)
                .await
                .map_err(FlightSqlError::Fetch)?;
            let mut received: Vec<RecordBatch> = stream
                .try_collect()
                .await
                .map_err(FlightSqlError::Read)?;
            batches.append(&mut received);
        }
        if schema.is_none() {
            schema = batches.first().map(RecordBatch::schema);
        }
        debug!(batches = batches.len(), "Read query results");
        Ok(QueryResult { schema, batches })
    }
}

/// Open a connection with `settings`, run `sql` and close the connection again.
pub async fn execute(settings: &ConnectionSettings, sql: &str) -> Result<QueryResult, FlightSqlError> {
    let mut connection = Connection::connect(settings).await?;
    connection.query(sql).await
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn json(host: &str) -> JsonData {
        JsonData {
            host: Some(host.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn password_wins_over_token() {
        let secrets = SecureJsonData {
            password: Some("pw".to_string()),
            token: Some("tok".to_string()),
        };
        let settings = ConnectionSettings::new(&json("db"), &secrets);
        assert_eq!(
            settings.auth,
            Auth::Basic {
                username: "gizmosql".to_string(),
                password: "pw".to_string(),
            }
        );
        assert_eq!(settings.port, 31337);
    }

    #[test]
    fn empty_password_falls_back_to_token() {
        let secrets = SecureJsonData {
            password: Some(String::new()),
            token: Some("tok".to_string()),
        };
        let settings = ConnectionSettings::new(&json("db"), &secrets);
        assert_eq!(settings.auth, Auth::Bearer("tok".to_string()));

        let anonymous = ConnectionSettings::new(&json("db"), &SecureJsonData::default());
        assert_eq!(anonymous.auth, Auth::Anonymous);
    }

    #[test]
    fn configured_username_is_used() {
        let json_data = JsonData {
            username: Some("alice".to_string()),
            ..json("db")
        };
        let secrets = SecureJsonData {
            password: Some("pw".to_string()),
            token: None,
        };
        let settings = ConnectionSettings::new(&json_data, &secrets);
        assert!(matches!(settings.auth, Auth::Basic { username, .. } if username == "alice"));
    }

    #[test]
    fn uri() {
        let mut settings = ConnectionSettings::new(
            &JsonData {
                port: Some(9000),
                use_tls: Some(true),
                ..json("gizmo.example.com")
            },
            &SecureJsonData::default(),
        );
        assert_eq!(settings.uri(), "http://gizmo.example.com:9000");
        settings.host = "::1".to_string();
        assert_eq!(settings.uri(), "http://[::1]:9000");
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let secrets = SecureJsonData {
            password: Some("hunter2".to_string()),
            token: None,
        };
        let settings = ConnectionSettings::new(&json("db"), &secrets);
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("gizmosql"));
        assert!(!format!("{:?}", Auth::Bearer("t0k".to_string())).contains("t0k"));
    }

    #[tokio::test]
    async fn missing_host() {
        let settings = ConnectionSettings::new(&json("  "), &SecureJsonData::default());
        let err = execute(&settings, "SELECT 1").await.unwrap_err();
        assert!(matches!(err, FlightSqlError::MissingHost));
    }

    #[tokio::test]
    async fn invalid_endpoint() {
        let settings = ConnectionSettings::new(&json("bad host"), &SecureJsonData::default());
        let err = execute(&settings, "SELECT 1").await.unwrap_err();
        assert!(matches!(err, FlightSqlError::InvalidEndpoint { .. }));
    }
}
