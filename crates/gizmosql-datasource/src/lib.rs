/*! A Grafana datasource plugin for [GizmoSQL], an Arrow Flight SQL server.

The crate has two halves.

The host-facing half describes what Grafana's frontend needs from a datasource:

- [`types`] holds the query and settings shapes Grafana persists.
- [`datasource`] is the object Grafana consults before dispatching a query; it
  resolves template variables (see [`template`]) and formats their values as
  SQL literals (see [`interpolate`]).
- [`editor`] describes the config and query editors as pure render functions
  plus event handlers that report new values straight back to Grafana.
- [`plugin`] ties these together into the registration Grafana expects.

The backend half is a regular backend plugin built on [`grafana_plugin_sdk`]:

- [`service`] implements the SDK's data and diagnostics services.
- [`macros`] expands the time-range macros in incoming SQL.
- [`flight`] and [`tls`] talk to GizmoSQL over Flight SQL.
- [`convert`] turns Arrow record batches into Grafana frames.

[GizmoSQL]: https://github.com/gizmodata/gizmosql
*/
#![deny(missing_docs)]

pub mod convert;
pub mod datasource;
pub mod editor;
pub mod error;
pub mod flight;
pub mod interpolate;
pub mod macros;
pub mod plugin;
pub mod service;
pub mod template;
pub mod tls;
pub mod types;

pub use datasource::DataSource;
pub use error::{ConvertError, FlightSqlError, QueryError};
pub use plugin::{plugin, DataSourcePlugin};
pub use service::GizmoSqlPlugin;
pub use types::{DataSourceSettings, Format, GizmoSqlQuery, JsonData, SecureJsonData};
