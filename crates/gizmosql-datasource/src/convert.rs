/*! Conversion of Flight SQL results into Grafana data frames.

Each Arrow column becomes one nullable Grafana field:

- integer, float, boolean and string columns keep their type (large and view
  strings become plain strings, half floats become `f32`)
- timestamps and dates become UTC times; dates are midnight
- decimals become `f64`
- anything else is rendered with Arrow's display formatting

Nulls stay null.
*/
use arrow::{
    array::{new_empty_array, Array, AsArray},
    compute::{cast, concat},
    datatypes::{
        ArrowPrimitiveType, DataType, Date32Type, Date64Type, Float32Type, Float64Type,
        Int16Type, Int32Type, Int64Type, Int8Type, SchemaRef, TimeUnit,
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
    },
    error::ArrowError,
    record_batch::RecordBatch,
    util::display::{ArrayFormatter, FormatOptions},
};
use chrono::{DateTime, Utc};
use grafana_plugin_sdk::{data, prelude::*};

use crate::error::ConvertError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Column names recognised as the time column of a time series, compared
/// case-insensitively.
pub const TIME_COLUMN_NAMES: [&str; 4] = ["time", "timestamp", "ts", "datetime"];

/// The values of one converted column.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Values {
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    UInt8(Vec<Option<u8>>),
    UInt16(Vec<Option<u16>>),
    UInt32(Vec<Option<u32>>),
    UInt64(Vec<Option<u64>>),
    Float32(Vec<Option<f32>>),
    /// Also holds decimals.
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    /// Also holds the display form of types Grafana has no field type for.
    String(Vec<Option<String>>),
    /// Timestamps and dates, in UTC.
    Time(Vec<Option<DateTime<Utc>>>),
}

impl Values {
    /// Whether these are time values.
    pub fn is_time(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    /// Convert an Arrow array.
    pub fn from_array(array: &dyn Array) -> Result<Self, ArrowError> {
        Ok(match array.data_type() {
            DataType::Int8 => Self::Int8(primitive::<Int8Type>(array)?),
            DataType::Int16 => Self::Int16(primitive::<Int16Type>(array)?),
            DataType::Int32 => Self::Int32(primitive::<Int32Type>(array)?),
            DataType::Int64 => Self::Int64(primitive::<Int64Type>(array)?),
            DataType::UInt8 => Self::UInt8(primitive::<UInt8Type>(array)?),
            DataType::UInt16 => Self::UInt16(primitive::<UInt16Type>(array)?),
            DataType::UInt32 => Self::UInt32(primitive::<UInt32Type>(array)?),
            DataType::UInt64 => Self::UInt64(primitive::<UInt64Type>(array)?),
            DataType::Float16 => {
                let array = cast(array, &DataType::Float32)?;
                Self::Float32(primitive::<Float32Type>(array.as_ref())?)
            }
            DataType::Float32 => Self::Float32(primitive::<Float32Type>(array)?),
            DataType::Float64 => Self::Float64(primitive::<Float64Type>(array)?),
            DataType::Decimal128(..) | DataType::Decimal256(..) => {
                let array = cast(array, &DataType::Float64)?;
                Self::Float64(primitive::<Float64Type>(array.as_ref())?)
            }
            DataType::Boolean => Self::Bool(
                array
                    .as_boolean_opt()
                    .ok_or_else(|| mismatch("boolean", array))?
                    .iter()
                    .collect(),
            ),
            DataType::Utf8 => Self::String(owned(
                array
                    .as_string_opt::<i32>()
                    .ok_or_else(|| mismatch("string", array))?
                    .iter(),
            )),
            DataType::LargeUtf8 => Self::String(owned(
                array
                    .as_string_opt::<i64>()
                    .ok_or_else(|| mismatch("large string", array))?
                    .iter(),
            )),
            DataType::Utf8View => Self::String(owned(
                array
                    .as_string_view_opt()
                    .ok_or_else(|| mismatch("string view", array))?
                    .iter(),
            )),
            // Timestamp values are UTC epoch offsets whatever the zone annotation says.
            DataType::Timestamp(TimeUnit::Second, _) => Self::Time(times(
                primitive::<TimestampSecondType>(array)?,
                |s| DateTime::from_timestamp(s, 0),
            )),
            DataType::Timestamp(TimeUnit::Millisecond, _) => Self::Time(times(
                primitive::<TimestampMillisecondType>(array)?,
                DateTime::from_timestamp_millis,
            )),
            DataType::Timestamp(TimeUnit::Microsecond, _) => Self::Time(times(
                primitive::<TimestampMicrosecondType>(array)?,
                DateTime::from_timestamp_micros,
            )),
            DataType::Timestamp(TimeUnit::Nanosecond, _) => Self::Time(times(
                primitive::<TimestampNanosecondType>(array)?,
                |ns| Some(DateTime::from_timestamp_nanos(ns)),
            )),
            DataType::Date32 => Self::Time(times(primitive::<Date32Type>(array)?, |days| {
                DateTime::from_timestamp(i64::from(days) * SECONDS_PER_DAY, 0)
            })),
            DataType::Date64 => Self::Time(times(
                primitive::<Date64Type>(array)?,
                DateTime::from_timestamp_millis,
            )),
            DataType::Null => Self::String(vec![None; array.len()]),
            _ => Self::String(display(array)?),
        })
    }
}

fn mismatch(expected: &str, array: &dyn Array) -> ArrowError {
    ArrowError::CastError(format!(
        "expected {expected} array for type {}",
        array.data_type()
    ))
}

fn primitive<T: ArrowPrimitiveType>(
    array: &dyn Array,
) -> Result<Vec<Option<T::Native>>, ArrowError> {
    Ok(array
        .as_primitive_opt::<T>()
        .ok_or_else(|| mismatch(&T::DATA_TYPE.to_string(), array))?
        .iter()
        .collect())
}

fn owned<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<Option<String>> {
    values.map(|v| v.map(str::to_string)).collect()
}

fn times<T>(
    values: Vec<Option<T>>,
    f: impl Fn(T) -> Option<DateTime<Utc>>,
) -> Vec<Option<DateTime<Utc>>> {
    values.into_iter().map(|v| v.and_then(&f)).collect()
}

fn display(array: &dyn Array) -> Result<Vec<Option<String>>, ArrowError> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    let nulls = array.logical_nulls();
    Ok((0..array.len())
        .map(|i| {
            if nulls.as_ref().is_some_and(|n| n.is_null(i)) {
                None
            } else {
                Some(formatter.value(i).to_string())
            }
        })
        .collect())
}

/// A named, converted column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// The column name from the result schema.
    pub name: String,
    /// The values from every batch, in order.
    pub values: Values,
}

impl Column {
    /// Whether this looks like the time column of a time series.
    fn is_time_column(&self) -> bool {
        TIME_COLUMN_NAMES
            .iter()
            .any(|n| self.name.eq_ignore_ascii_case(n))
            || self.values.is_time()
    }

    /// Convert into a nullable Grafana field.
    pub fn into_field(self) -> data::Field {
        let name = self.name;
        match self.values {
            Values::Int8(v) => v.into_opt_field(name),
            Values::Int16(v) => v.into_opt_field(name),
            Values::Int32(v) => v.into_opt_field(name),
            Values::Int64(v) => v.into_opt_field(name),
            Values::UInt8(v) => v.into_opt_field(name),
            Values::UInt16(v) => v.into_opt_field(name),
            Values::UInt32(v) => v.into_opt_field(name),
            Values::UInt64(v) => v.into_opt_field(name),
            Values::Float32(v) => v.into_opt_field(name),
            Values::Float64(v) => v.into_opt_field(name),
            Values::Bool(v) => v.into_opt_field(name),
            Values::String(v) => v.into_opt_field(name),
            Values::Time(v) => v.into_opt_field(name),
        }
    }
}

/// Convert every column of `schema`, concatenating the values of all `batches`.
pub fn columns(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Vec<Column>, ConvertError> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let error = |source| ConvertError {
                column: field.name().clone(),
                source,
            };
            let arrays = batches
                .iter()
                .map(|batch| {
                    batch.columns().get(i).map(|c| c.as_ref()).ok_or_else(|| {
                        ArrowError::SchemaError(format!("record batch has no column {i}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(error)?;
            let array = if arrays.is_empty() {
                new_empty_array(field.data_type())
            } else {
                concat(&arrays).map_err(error)?
            };
            Ok(Column {
                name: field.name().clone(),
                values: Values::from_array(array.as_ref()).map_err(error)?,
            })
        })
        .collect()
}

/// The index of the time column, if any: the first column with a
/// conventional time name or of time type.
pub fn time_column_index(columns: &[Column]) -> Option<usize> {
    columns.iter().position(Column::is_time_column)
}

/// Move the time column to the front, leaving the others in order.
///
/// Columns are left untouched when there is no time column.
pub fn to_time_series(columns: &mut [Column]) {
    if let Some(idx) = time_column_index(columns) {
        columns[..=idx].rotate_right(1);
    }
}

/// Build a frame named `name` from `columns`.
pub fn to_frame(name: impl Into<String>, columns: Vec<Column>) -> data::Frame {
    data::Frame::new(name).with_fields(columns.into_iter().map(Column::into_field))
}
