//! The query editor: SQL text and result format.
use serde::Serialize;

use super::{Control, InlineField, SelectOption};
use crate::types::{Format, GizmoSqlQuery, DEFAULT_SQL};

/// Help text shown under the SQL editor.
pub const MACRO_HELP: &str = "Macros: Use $__timeFrom, $__timeTo for time range filters. \
    For time series, include a time column and a value column.";

/// A user interaction with the query editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryEvent {
    /// A different result format was selected.
    FormatChanged(Format),
    /// The SQL text was edited.
    SqlChanged(String),
    /// The SQL editor lost focus.
    Blur,
    /// The user saved from within the SQL editor.
    Save,
}

/// What the query editor shows for a given query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryView {
    /// The result format selector.
    pub format: InlineField,
    /// The SQL editor.
    pub editor: Control,
    /// Help text about macros.
    pub help: &'static str,
}

/// Describe the editor for `query`.
///
/// Empty SQL is shown as the default query's SQL.
pub fn render(query: &GizmoSqlQuery) -> QueryView {
    let sql = if query.raw_sql.is_empty() {
        DEFAULT_SQL
    } else {
        query.raw_sql.as_str()
    };
    QueryView {
        format: InlineField {
            label: "Format",
            label_width: 10,
            tooltip: "Choose how to format the query results",
            control: Control::Select {
                options: Format::ALL
                    .iter()
                    .map(|f| SelectOption {
                        label: f.label(),
                        value: f.as_str(),
                        description: f.description(),
                    })
                    .collect(),
                value: query.format.as_str(),
                width: 20,
            },
        },
        editor: Control::CodeEditor {
            value: sql.to_string(),
            language: "sql",
            height: "200px",
            show_mini_map: false,
            show_line_numbers: true,
        },
        help: MACRO_HELP,
    }
}

/// The props Grafana passes to the query editor.
pub struct QueryEditorProps<'a, C, R>
where
    C: FnMut(GizmoSqlQuery),
    R: FnMut(),
{
    /// The current query.
    pub query: &'a GizmoSqlQuery,
    /// Called with the new query after every change.
    pub on_change: C,
    /// Asks Grafana to execute the query.
    pub on_run_query: R,
}

impl<'a, C, R> QueryEditorProps<'a, C, R>
where
    C: FnMut(GizmoSqlQuery),
    R: FnMut(),
{
    /// Bundle the current query with the editor callbacks.
    pub fn new(query: &'a GizmoSqlQuery, on_change: C, on_run_query: R) -> Self {
        Self {
            query,
            on_change,
            on_run_query,
        }
    }

    /// Describe the editor for the current query.
    pub fn render(&self) -> QueryView {
        render(self.query)
    }

    /// React to `event`.
    ///
    /// Changing the format updates the query and re-runs it straight away.
    /// SQL edits only update the query; it is re-run once editing finishes,
    /// on blur or save.
    pub fn handle(&mut self, event: QueryEvent) {
        match event {
            QueryEvent::FormatChanged(format) => {
                (self.on_change)(self.query.with_format(format));
                (self.on_run_query)();
            }
            QueryEvent::SqlChanged(sql) => (self.on_change)(self.query.with_raw_sql(sql)),
            QueryEvent::Blur | QueryEvent::Save => (self.on_run_query)(),
        }
    }
}
