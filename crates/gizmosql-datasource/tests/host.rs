use gizmosql_datasource::{
    editor::{config, ConfigEditorProps, ConfigEvent, QueryEditorProps, QueryEvent},
    interpolate::{quote_literal, VariableMeta, VariableValue},
    template::{ScopedVar, ScopedVars},
    types::SecureJsonFields,
    DataSource, DataSourceSettings, Format, GizmoSqlQuery, JsonData,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn numbers_are_not_quoted() {
    for s in ["0", "42", "-1.5", "1e3", " 7 "] {
        assert_eq!(quote_literal(s), s);
    }
}

#[test]
fn strings_are_quoted_with_doubled_quotes() {
    for s in ["abc", "O'Brien", "''", "it's 'quoted'"] {
        let quoted = quote_literal(s);
        assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        assert_eq!(&quoted[1..quoted.len() - 1], s.replace('\'', "''"));
    }
}

#[test]
fn multi_values_join_their_quoted_parts() {
    let value: VariableValue = ["a", "b'c", "3"].into_iter().collect();
    assert_eq!(
        DataSource::interpolate_variable(&value, VariableMeta::default()),
        format!("{},{},{}", quote_literal("a"), quote_literal("b'c"), quote_literal("3"))
    );
}

#[test]
fn filter_query() {
    let ds = DataSource::default();
    assert!(!ds.filter_query(&GizmoSqlQuery::new("", Format::Table)));
    assert!(!ds.filter_query(&GizmoSqlQuery::new("   ", Format::Table)));
    assert!(ds.filter_query(&GizmoSqlQuery::new("SELECT 1", Format::Table)));
}

#[test]
fn apply_template_variables_leaves_input_alone() {
    let ds = DataSource::default();
    let query: GizmoSqlQuery = serde_json::from_value(json!({
        "refId": "A",
        "rawSql": "SELECT * FROM t WHERE host = $host AND ts > $__timeFrom",
        "format": "time_series",
        "hide": false,
    }))
    .unwrap();
    let before = query.clone();
    let mut vars = ScopedVars::new();
    vars.insert("host".to_string(), ScopedVar::new("db'1"));

    let applied = ds.apply_template_variables(&query, &vars);

    assert_eq!(query, before);
    assert_eq!(
        applied.raw_sql,
        "SELECT * FROM t WHERE host = 'db''1' AND ts > $__timeFrom"
    );
    assert_eq!(applied.format, query.format);
    assert_eq!(applied.other, query.other);
}

#[test]
fn port_input_resolution() {
    let options = DataSourceSettings::default();
    let mut reported = Vec::new();
    let mut props = ConfigEditorProps::new(&options, |o: DataSourceSettings| reported.push(o));
    props.handle(ConfigEvent::PortChanged("abc".to_string()));
    props.handle(ConfigEvent::PortChanged("8080".to_string()));
    drop(props);

    assert_eq!(reported[0].json_data.port(), 31337);
    assert_eq!(reported[1].json_data.port(), 8080);
}

#[test]
fn skip_tls_verify_visibility_scenario() {
    let mut options = DataSourceSettings::default();
    for event in [
        ConfigEvent::HostChanged("db1".to_string()),
        ConfigEvent::PortChanged("9000".to_string()),
    ] {
        options = config::apply(&options, event);
    }
    assert!(config::render(&options).field("Skip TLS Verify").is_none());

    options = config::apply(&options, ConfigEvent::UseTlsChanged(true));
    assert!(config::render(&options).field("Skip TLS Verify").is_some());
    options = config::apply(&options, ConfigEvent::SkipTlsVerifyChanged(true));

    options = config::apply(&options, ConfigEvent::UseTlsChanged(false));
    assert!(config::render(&options).field("Skip TLS Verify").is_none());
    assert!(options.json_data.skip_tls_verify());
    assert_eq!(options.json_data.host(), "db1");
    assert_eq!(options.json_data.port(), 9000);
}

#[test]
fn configured_secret_reset_scenario() {
    let options = DataSourceSettings {
        secure_json_fields: SecureJsonFields {
            password: true,
            token: false,
        },
        ..Default::default()
    };
    let view = config::render(&options);
    assert!(view.field("Password").unwrap().control.is_masked());

    let reset = config::apply(&options, ConfigEvent::PasswordReset);
    assert!(!reset.secure_json_fields.password);
    assert_eq!(reset.secure_json_data.password.as_deref(), Some(""));
}

#[test]
fn query_editor_runs_on_format_change_and_blur() {
    let query = GizmoSqlQuery::default_query();
    let mut changes = Vec::new();
    let mut runs = 0;
    let mut props = QueryEditorProps::new(
        &query,
        |q: GizmoSqlQuery| changes.push(q),
        || runs += 1,
    );
    props.handle(QueryEvent::SqlChanged("SELECT 2".to_string()));
    props.handle(QueryEvent::FormatChanged(Format::TimeSeries));
    props.handle(QueryEvent::Blur);
    drop(props);

    assert_eq!(runs, 2);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].raw_sql, "SELECT 2");
    assert_eq!(changes[1].format, Format::TimeSeries);
}

#[test]
fn stored_settings_round_trip_with_grafana_keys() {
    let stored = json!({
        "host": "gizmo",
        "port": 0,
        "username": "alice",
        "useTLS": true,
        "skipTLSVerify": false,
    });
    let json_data: JsonData = serde_json::from_value(stored.clone()).unwrap();
    assert_eq!(json_data.port(), 31337);
    assert!(json_data.use_tls());
    assert_eq!(serde_json::to_value(&json_data).unwrap(), stored);
}

#[test]
fn query_without_format_is_a_table() {
    let query: GizmoSqlQuery = serde_json::from_value(json!({ "rawSql": "SELECT 1" })).unwrap();
    assert_eq!(query.format, Format::Table);
    assert_eq!(query.raw_sql, "SELECT 1");
}
