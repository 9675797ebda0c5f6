//! The datasource object Grafana calls before dispatching a query.
use crate::{
    interpolate::{self, VariableMeta, VariableValue},
    template::{self, ScopedVars},
    types::{DataSourceSettings, GizmoSqlQuery},
};

/// Host-facing datasource for GizmoSQL.
///
/// Holds the instance settings it was created with; execution itself is
/// dispatched by Grafana to the backend plugin.
#[derive(Clone, Debug, Default)]
pub struct DataSource {
    settings: DataSourceSettings,
}

impl DataSource {
    /// Create a datasource for the given instance settings.
    pub fn new(settings: DataSourceSettings) -> Self {
        Self { settings }
    }

    /// The instance settings this datasource was created with.
    pub fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    /// The query used for new panels.
    pub fn get_default_query(&self) -> GizmoSqlQuery {
        GizmoSqlQuery::default_query()
    }

    /// Resolve template variables in the query's SQL.
    ///
    /// Returns a new query; only `raw_sql` differs from `query`.
    pub fn apply_template_variables(
        &self,
        query: &GizmoSqlQuery,
        scoped_vars: &ScopedVars,
    ) -> GizmoSqlQuery {
        query.with_raw_sql(template::replace(
            &query.raw_sql,
            scoped_vars,
            Self::interpolate_variable,
        ))
    }

    /// Format a variable value for substitution into SQL.
    pub fn interpolate_variable(value: &VariableValue, meta: VariableMeta) -> String {
        interpolate::interpolate_variable(value, meta)
    }

    /// Whether the query should be executed at all.
    ///
    /// Queries with empty or whitespace-only SQL are skipped.
    pub fn filter_query(&self, query: &GizmoSqlQuery) -> bool {
        !query.raw_sql.trim().is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{template::ScopedVar, types::Format};

    #[test]
    fn default_query() {
        let ds = DataSource::default();
        assert_eq!(
            ds.get_default_query(),
            GizmoSqlQuery::new("SELECT 1", Format::Table)
        );
    }

    #[test]
    fn filter_query() {
        let ds = DataSource::default();
        assert!(!ds.filter_query(&GizmoSqlQuery::new("", Format::Table)));
        assert!(!ds.filter_query(&GizmoSqlQuery::new("   \n\t", Format::Table)));
        assert!(ds.filter_query(&GizmoSqlQuery::new("SELECT 1", Format::Table)));
    }

    #[test]
    fn apply_template_variables_returns_a_copy() {
        let ds = DataSource::default();
        let mut query = GizmoSqlQuery::new(
            "SELECT * FROM m WHERE host IN ($host) AND ts > $__timeFrom",
            Format::TimeSeries,
        );
        query.other.insert("refId".to_string(), json!("A"));
        let original = query.clone();
        let vars = ScopedVars::from([("host".to_string(), ScopedVar::multi(["web1", "web2"]))]);

        let applied = ds.apply_template_variables(&query, &vars);

        assert_eq!(query, original);
        assert_eq!(
            applied.raw_sql,
            "SELECT * FROM m WHERE host IN ('web1','web2') AND ts > $__timeFrom"
        );
        assert_eq!(applied.format, query.format);
        assert_eq!(applied.other, query.other);
    }

    #[test]
    fn apply_without_variables_is_identity() {
        let ds = DataSource::default();
        let query = GizmoSqlQuery::default_query();
        assert_eq!(ds.apply_template_variables(&query, &ScopedVars::new()), query);
    }
}
