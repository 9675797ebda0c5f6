//! Registration of the datasource with Grafana.
use crate::{
    datasource::DataSource,
    editor::{config, query, ConfigView, QueryView},
    types::{DataSourceSettings, GizmoSqlQuery},
};

/// Name of the backend executable, as referenced from `plugin.json`.
pub const EXECUTABLE: &str = "gpx_gizmosql_datasource";

/// Renders the config editor for a set of options.
pub type ConfigEditor = fn(&DataSourceSettings) -> ConfigView;

/// Renders the query editor for a query.
pub type QueryEditor = fn(&GizmoSqlQuery) -> QueryView;

/// The shape Grafana expects a datasource plugin to register.
///
/// Grafana constructs one datasource per configured instance using the
/// constructor, and draws the editors on demand.
pub struct DataSourcePlugin<D> {
    ctor: fn(DataSourceSettings) -> D,
    config_editor: Option<ConfigEditor>,
    query_editor: Option<QueryEditor>,
}

impl<D> DataSourcePlugin<D> {
    /// Register a datasource constructor with no editors.
    pub fn new(ctor: fn(DataSourceSettings) -> D) -> Self {
        Self {
            ctor,
            config_editor: None,
            query_editor: None,
        }
    }

    /// Set the config editor.
    #[must_use]
    pub fn set_config_editor(mut self, editor: ConfigEditor) -> Self {
        self.config_editor = Some(editor);
        self
    }

    /// Set the query editor.
    #[must_use]
    pub fn set_query_editor(mut self, editor: QueryEditor) -> Self {
        self.query_editor = Some(editor);
        self
    }

    /// Construct a datasource for one configured instance.
    pub fn create_datasource(&self, settings: DataSourceSettings) -> D {
        (self.ctor)(settings)
    }

    /// The registered config editor.
    pub fn config_editor(&self) -> Option<ConfigEditor> {
        self.config_editor
    }

    /// The registered query editor.
    pub fn query_editor(&self) -> Option<QueryEditor> {
        self.query_editor
    }
}

/// The GizmoSQL datasource plugin.
pub fn plugin() -> DataSourcePlugin<DataSource> {
    DataSourcePlugin::new(DataSource::new)
        .set_config_editor(config::render)
        .set_query_editor(query::render)
}
