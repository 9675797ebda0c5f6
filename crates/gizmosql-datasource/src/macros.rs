//! Expansion of Grafana time-range macros in SQL.
use chrono::{DateTime, SecondsFormat, Utc};

/// Start of the panel's time range, as a quoted timestamp.
pub const TIME_FROM: &str = "$__timeFrom";
/// End of the panel's time range, as a quoted timestamp.
pub const TIME_TO: &str = "$__timeTo";
/// A `time >= from AND time <= to` condition on a column named `time`.
pub const TIME_FILTER: &str = "$__timeFilter";

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Replace the time macros in `sql` with literals for the range `from..=to`.
///
/// Timestamps are rendered in UTC as RFC 3339 with second precision.
pub fn expand_macros(sql: &str, from: &DateTime<Utc>, to: &DateTime<Utc>) -> String {
    let from = format_time(from);
    let to = format_time(to);
    sql.replace(TIME_FROM, &format!("'{from}'"))
        .replace(TIME_TO, &format!("'{to}'"))
        .replace(
            TIME_FILTER,
            &format!("time >= '{from}' AND time <= '{to}'"),
        )
}
