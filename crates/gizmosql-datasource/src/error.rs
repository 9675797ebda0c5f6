//! Error types returned by the backend.
use arrow::error::ArrowError;
use grafana_plugin_sdk::{backend, data};
use thiserror::Error;

/// Errors talking to GizmoSQL over Flight SQL.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlightSqlError {
    /// The datasource has no host configured.
    #[error("no host configured")]
    MissingHost,

    /// The host and port do not form a valid URI.
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// The endpoint that was rejected.
        endpoint: String,
        /// The underlying error.
        source: tonic::transport::Error,
    },

    /// The host is not a valid TLS server name.
    #[error("invalid TLS server name {host}: {source}")]
    ServerName {
        /// The configured host.
        host: String,
        /// The underlying error.
        source: tokio_rustls::rustls::pki_types::InvalidDnsNameError,
    },

    /// The TLS client could not be configured.
    #[error("failed to configure TLS: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// The connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// The endpoint we tried to reach.
        endpoint: String,
        /// The underlying error.
        source: tonic::transport::Error,
    },

    /// The connection was not established within the connect timeout.
    #[error("timed out connecting to {endpoint}")]
    Timeout {
        /// The endpoint we tried to reach.
        endpoint: String,
    },

    /// The basic-auth handshake failed.
    #[error("authentication failed: {0}")]
    Authentication(#[source] ArrowError),

    /// The server rejected the statement.
    #[error("failed to execute query: {0}")]
    Execute(#[source] ArrowError),

    /// A result endpoint did not carry a ticket.
    #[error("flight endpoint has no ticket")]
    MissingTicket,

    /// The results could not be requested.
    #[error("failed to get query results: {0}")]
    Fetch(#[source] ArrowError),

    /// The result stream failed part way through.
    #[error("error reading records: {0}")]
    Read(#[source] arrow_flight::error::FlightError),

    /// The result schema could not be decoded.
    #[error("invalid result schema: {0}")]
    Schema(#[source] ArrowError),
}

/// Errors converting Arrow results into Grafana fields.
#[derive(Debug, Error)]
#[error("unable to convert column {column}: {source}")]
pub struct ConvertError {
    /// Name of the offending column.
    pub column: String,
    /// The underlying error.
    pub source: ArrowError,
}

/// An error answering a single query.
///
/// Carries the query's `ref_id` so that Grafana can line it up with the request.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request did not carry datasource instance settings.
    #[error("missing datasource instance settings")]
    MissingInstanceSettings {
        /// The query's ref id.
        ref_id: String,
    },

    /// The query had no SQL.
    #[error("query is empty")]
    EmptyQuery {
        /// The query's ref id.
        ref_id: String,
    },

    /// Running the SQL against GizmoSQL failed.
    #[error("query execution failed: {source}")]
    Execution {
        /// The query's ref id.
        ref_id: String,
        /// The underlying error.
        source: FlightSqlError,
    },

    /// The results could not be turned into a frame.
    #[error("{source}")]
    Conversion {
        /// The query's ref id.
        ref_id: String,
        /// The underlying error.
        source: ConvertError,
    },

    /// The frame built from the results was rejected by the SDK.
    #[error("invalid frame: {source}")]
    InvalidFrame {
        /// The query's ref id.
        ref_id: String,
        /// The underlying error.
        source: data::Error,
    },
}

impl backend::DataQueryError for QueryError {
    fn ref_id(self) -> String {
        match self {
            Self::MissingInstanceSettings { ref_id }
            | Self::EmptyQuery { ref_id }
            | Self::Execution { ref_id, .. }
            | Self::Conversion { ref_id, .. }
            | Self::InvalidFrame { ref_id, .. } => ref_id,
        }
    }

    fn status(&self) -> backend::DataQueryStatus {
        match self {
            Self::EmptyQuery { .. } => backend::DataQueryStatus::BadRequest,
            _ => backend::DataQueryStatus::Internal,
        }
    }
}

#[cfg(test)]
mod test {
    use grafana_plugin_sdk::backend::DataQueryError;

    use super::*;

    #[test]
    fn ref_id_is_preserved() {
        let err = QueryError::Execution {
            ref_id: "A".to_string(),
            source: FlightSqlError::MissingHost,
        };
        assert_eq!(err.to_string(), "query execution failed: no host configured");
        assert!(matches!(err.status(), backend::DataQueryStatus::Internal));
        assert_eq!(err.ref_id(), "A");
    }

    #[test]
    fn empty_query_is_a_bad_request() {
        let err = QueryError::EmptyQuery {
            ref_id: "B".to_string(),
        };
        assert_eq!(err.to_string(), "query is empty");
        assert!(matches!(
            err.status(),
            backend::DataQueryStatus::BadRequest
        ));
    }
}
