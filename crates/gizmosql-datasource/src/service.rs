//! The backend plugin: query and health check services.
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use futures_util::stream::FuturesOrdered;
use grafana_plugin_sdk::{backend, data, prelude::*};
use tracing::{debug, info, warn};

use crate::{
    convert,
    error::{ConvertError, QueryError},
    flight::{self, ConnectionSettings, QueryResult},
    macros::expand_macros,
    types::{Format, GizmoSqlQuery, JsonData, SecureJsonData, DEFAULT_SQL},
};

/// The GizmoSQL datasource backend.
#[derive(Clone, Debug, Default, GrafanaPlugin)]
#[grafana_plugin(
    plugin_type = "datasource",
    json_data = "JsonData",
    secure_json_data = "SecureJsonData"
)]
pub struct GizmoSqlPlugin;

impl GizmoSqlPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }
}

/// Check the query has SQL and expand the time macros against `from..=to`.
pub fn prepare_sql(
    ref_id: &str,
    query: &GizmoSqlQuery,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<String, QueryError> {
    if query.raw_sql.trim().is_empty() {
        return Err(QueryError::EmptyQuery {
            ref_id: ref_id.to_string(),
        });
    }
    Ok(expand_macros(&query.raw_sql, from, to))
}

/// Turn query results into a frame named after the query.
///
/// Results without a schema give a frame with no fields.
pub fn result_frame(
    ref_id: &str,
    format: Format,
    result: &QueryResult,
) -> Result<data::Frame, ConvertError> {
    let mut columns = match &result.schema {
        Some(schema) => convert::columns(schema, &result.batches)?,
        None => Vec::new(),
    };
    if format == Format::TimeSeries {
        convert::to_time_series(&mut columns);
    }
    Ok(convert::to_frame(ref_id, columns))
}

async fn run_query(
    settings: &ConnectionSettings,
    query: backend::DataQuery<GizmoSqlQuery>,
) -> Result<backend::DataResponse, QueryError> {
    let ref_id = query.ref_id;
    let sql = prepare_sql(
        &ref_id,
        &query.query,
        &query.time_range.from,
        &query.time_range.to,
    )?;
    debug!(%ref_id, %sql, format = %query.query.format, "Running query");

    let result = match flight::execute(settings, &sql).await {
        Ok(result) => result,
        Err(source) => {
            warn!(%ref_id, error = %source, "Query failed");
            return Err(QueryError::Execution { ref_id, source });
        }
    };
    let frame = match result_frame(&ref_id, query.query.format, &result) {
        Ok(frame) => frame,
        Err(source) => return Err(QueryError::Conversion { ref_id, source }),
    };
    let checked = match frame.check() {
        Ok(checked) => checked,
        Err(source) => return Err(QueryError::InvalidFrame { ref_id, source }),
    };
    Ok(backend::DataResponse::new(ref_id.clone(), vec![checked]))
}

#[backend::async_trait]
impl backend::DataService for GizmoSqlPlugin {
    type Query = GizmoSqlQuery;
    type QueryError = QueryError;
    type Stream = backend::BoxDataResponseStream<Self::QueryError>;

    async fn query_data(
        &self,
        request: backend::QueryDataRequest<Self::Query, Self>,
    ) -> Self::Stream {
        let settings = request
            .plugin_context
            .instance_settings
            .map(|s| ConnectionSettings::new(&s.json_data, &s.decrypted_secure_json_data));
        debug!(queries = request.queries.len(), "Got query request");
        Box::pin(
            request
                .queries
                .into_iter()
                .map(|query| {
                    let settings = settings.clone();
                    async move {
                        let settings =
                            settings.ok_or_else(|| QueryError::MissingInstanceSettings {
                                ref_id: query.ref_id.clone(),
                            })?;
                        run_query(&settings, query).await
                    }
                })
                .collect::<FuturesOrdered<_>>(),
        )
    }
}

#[backend::async_trait]
impl backend::DiagnosticsService for GizmoSqlPlugin {
    type CheckHealthError = Infallible;

    async fn check_health(
        &self,
        request: backend::CheckHealthRequest<Self>,
    ) -> Result<backend::CheckHealthResponse, Self::CheckHealthError> {
        let Some(instance) = request.plugin_context.instance_settings else {
            return Ok(backend::CheckHealthResponse::error(
                "Failed to connect to GizmoSQL: missing datasource instance settings".to_string(),
            ));
        };
        let settings =
            ConnectionSettings::new(&instance.json_data, &instance.decrypted_secure_json_data);
        Ok(match flight::execute(&settings, DEFAULT_SQL).await {
            Ok(_) => {
                info!(host = %settings.host, port = settings.port, "Health check succeeded");
                backend::CheckHealthResponse::ok("Successfully connected to GizmoSQL".to_string())
            }
            Err(e) => {
                warn!(host = %settings.host, port = settings.port, error = %e, "Health check failed");
                backend::CheckHealthResponse::error(format!("Failed to connect to GizmoSQL: {e}"))
            }
        })
    }

    type CollectMetricsError = Infallible;

    async fn collect_metrics(
        &self,
        _request: backend::CollectMetricsRequest<Self>,
    ) -> Result<backend::CollectMetricsResponse, Self::CollectMetricsError> {
        Ok(backend::CollectMetricsResponse::new(None))
    }
}
