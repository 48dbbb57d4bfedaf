//! Reshaping arrow record batches into Snowflake statements.
//!
//! A dataset is staged in a temporary table and then copied over the target with
//! `CREATE OR REPLACE TABLE ... AS SELECT`, so the target ends up holding exactly the
//! dataset's rows.

use std::fmt::{Display, LowerExp};
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Date64Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow_array::{Array, ArrayRef, Float32Array, Float64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::NaiveDateTime;

use crate::{Error, Result};

/// Rows per `INSERT` statement.
pub(crate) const INSERT_BATCH_ROWS: usize = 1_000;

const STAGING_PREFIX: &str = "WAREHOUSE_CONNECTORS_STAGE_";

/// Upper-case every column name and turn `NaN` cells into nulls.
pub fn normalize_dataset(dataset: &RecordBatch) -> Result<RecordBatch> {
    let schema = dataset.schema();
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            field
                .as_ref()
                .clone()
                .with_name(field.name().to_uppercase())
                .with_nullable(true)
        })
        .collect::<Vec<Field>>();
    let columns = dataset
        .columns()
        .iter()
        .map(nan_to_null)
        .collect::<Vec<_>>();

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )?)
}

fn nan_to_null(column: &ArrayRef) -> ArrayRef {
    match column.data_type() {
        DataType::Float32 => Arc::new(
            column
                .as_primitive::<Float32Type>()
                .iter()
                .map(|value| value.filter(|value| !value.is_nan()))
                .collect::<Float32Array>(),
        ),
        DataType::Float64 => Arc::new(
            column
                .as_primitive::<Float64Type>()
                .iter()
                .map(|value| value.filter(|value| !value.is_nan()))
                .collect::<Float64Array>(),
        ),
        _ => Arc::clone(column),
    }
}

pub(crate) fn staging_table_name() -> String {
    format!(
        "{STAGING_PREFIX}{}",
        uuid::Uuid::new_v4().simple().to_string().to_uppercase()
    )
}

/// Every statement needed to replace `table` with the rows of `dataset`, in order.
///
/// Column types and values are checked while rendering, so an unsupported dataset is
/// rejected before any statement is sent.
pub(crate) fn overwrite_statements(
    dataset: &RecordBatch,
    table: &str,
    staging: &str,
) -> Result<Vec<String>> {
    validate_table_name(table)?;

    let schema = dataset.schema();
    let columns = schema
        .fields()
        .iter()
        .map(|field| -> Result<String> {
            let data_type = snowflake_type(field.data_type())?;
            Ok(format!("{} {data_type}", quote_identifier(field.name())))
        })
        .collect::<Result<Vec<_>>>()?;
    let column_names = schema
        .fields()
        .iter()
        .map(|field| quote_identifier(field.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut statements = vec![format!(
        "CREATE TEMPORARY TABLE {staging} ({})",
        columns.join(", ")
    )];

    let mut start = 0;
    while start < dataset.num_rows() {
        let end = (start + INSERT_BATCH_ROWS).min(dataset.num_rows());
        let rows = (start..end)
            .map(|row| -> Result<String> {
                let values = dataset
                    .columns()
                    .iter()
                    .map(|column| literal(column, row))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", values.join(", ")))
            })
            .collect::<Result<Vec<_>>>()?;
        statements.push(format!(
            "INSERT INTO {staging} ({column_names}) VALUES {}",
            rows.join(", ")
        ));
        start = end;
    }

    statements.push(format!(
        "CREATE OR REPLACE TABLE {table} AS SELECT * FROM {staging}"
    ));
    statements.push(format!("DROP TABLE IF EXISTS {staging}"));
    Ok(statements)
}

fn snowflake_type(data_type: &DataType) -> Result<&'static str> {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Ok("NUMBER(38, 0)"),
        DataType::Float32 | DataType::Float64 => Ok("FLOAT"),
        DataType::Boolean => Ok("BOOLEAN"),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Ok("VARCHAR"),
        DataType::Date32 | DataType::Date64 => Ok("DATE"),
        DataType::Timestamp(_, None) => Ok("TIMESTAMP_NTZ"),
        DataType::Timestamp(_, Some(_)) => Ok("TIMESTAMP_TZ"),
        other => Err(Error::UnsupportedDataType(other.to_string())),
    }
}

fn literal(column: &ArrayRef, row: usize) -> Result<String> {
    if column.is_null(row) {
        return Ok("NULL".to_string());
    }
    let literal = match column.data_type() {
        DataType::Null => "NULL".to_string(),
        DataType::Int8 => column.as_primitive::<Int8Type>().value(row).to_string(),
        DataType::Int16 => column.as_primitive::<Int16Type>().value(row).to_string(),
        DataType::Int32 => column.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => column.as_primitive::<Int64Type>().value(row).to_string(),
        DataType::UInt8 => column.as_primitive::<UInt8Type>().value(row).to_string(),
        DataType::UInt16 => column.as_primitive::<UInt16Type>().value(row).to_string(),
        DataType::UInt32 => column.as_primitive::<UInt32Type>().value(row).to_string(),
        DataType::UInt64 => column.as_primitive::<UInt64Type>().value(row).to_string(),
        DataType::Float32 => float(column.as_primitive::<Float32Type>().value(row)),
        DataType::Float64 => float(column.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => match column.as_boolean().value(row) {
            true => "TRUE".to_string(),
            false => "FALSE".to_string(),
        },
        DataType::Utf8 => string(column.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => string(column.as_string::<i64>().value(row)),
        DataType::Date32 => date(column.as_primitive::<Date32Type>().value_as_date(row))?,
        DataType::Date64 => date(column.as_primitive::<Date64Type>().value_as_date(row))?,
        DataType::Timestamp(unit, tz) => {
            let datetime = match unit {
                TimeUnit::Second => column
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                TimeUnit::Millisecond => column
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => column
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => column
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            timestamp(datetime, tz.is_some())?
        }
        other => return Err(Error::UnsupportedDataType(other.to_string())),
    };
    Ok(literal)
}

/// Shortest round-trip text of the value at its own width. Magnitudes outside
/// `[1e-5, 1e16)` are written in exponent form to keep the literal short.
fn float<T>(value: T) -> String
where
    T: Copy + Into<f64> + Display + LowerExp,
{
    let wide: f64 = value.into();
    if wide.is_nan() {
        "NULL".to_string()
    } else if wide.is_infinite() {
        match wide.is_sign_positive() {
            true => "'inf'".to_string(),
            false => "'-inf'".to_string(),
        }
    } else if wide == 0.0 || (1e-5..1e16).contains(&wide.abs()) {
        value.to_string()
    } else {
        format!("{value:e}")
    }
}

fn string(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\").replace('\'', "''"))
}

fn date(value: Option<chrono::NaiveDate>) -> Result<String> {
    value
        .map(|date| format!("'{}'", date.format("%Y-%m-%d")))
        .ok_or_else(|| Error::UnsupportedDataType("date out of range".to_string()))
}

// Zoned arrow timestamps hold UTC instants.
fn timestamp(value: Option<NaiveDateTime>, zoned: bool) -> Result<String> {
    let value =
        value.ok_or_else(|| Error::UnsupportedDataType("timestamp out of range".to_string()))?;
    let rendered = value.format("%Y-%m-%d %H:%M:%S%.f");
    Ok(match zoned {
        true => format!("'{rendered} +00:00'"),
        false => format!("'{rendered}'"),
    })
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Accepts `table`, `schema.table` or `database.schema.table`, each part either a
/// plain identifier or a double-quoted one.
fn validate_table_name(name: &str) -> Result<()> {
    let parts = split_table_name(name);
    let valid = (1..=3).contains(&parts.len())
        && parts.iter().all(|part| {
            let quoted = part.len() >= 2
                && part.starts_with('"')
                && part.ends_with('"')
                && !part[1..part.len() - 1].contains('"');
            let mut chars = part.chars();
            let plain = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
            quoted || plain
        });
    match valid {
        true => Ok(()),
        false => Err(Error::InvalidIdentifier(name.to_string())),
    }
}

/// Split on the dots that are not inside a double-quoted part.
fn split_table_name(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, c) in name.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '.' if !quoted => {
                parts.push(&name[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}
