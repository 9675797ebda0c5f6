use gizmosql_datasource::GizmoSqlPlugin;

#[grafana_plugin_sdk::main(services(data, diagnostics), init_subscriber = true)]
async fn plugin() -> GizmoSqlPlugin {
    GizmoSqlPlugin::new()
}
