// src/database/row.rs
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use sqlx::{
    postgres::{
        types::{Oid, PgInterval},
        PgRow, PgTypeKind, PgValueFormat, PgValueRef,
    },
    Column, Decode, Postgres, Row as _, TypeInfo, ValueRef,
};
use tracing::warn;
use uuid::Uuid;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// Value of a single column, tagged by its Postgres type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    /// `FLOAT4`, kept narrow so it serializes in its shortest form
    Float32(f32),
    Float(f64),
    /// Exact decimal, serialized as a string so no precision is lost
    Numeric(Decimal),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// `TIMESTAMP` without time zone
    LocalTimestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    Interval(PgInterval),
    /// `INET`/`CIDR` in Postgres text form, e.g. `10.0.0.0/8`
    Inet(String),
    /// One-dimensional array; `NULL` elements become [`ColumnValue::Null`]
    Array(Vec<ColumnValue>),
}

impl Serialize for ColumnValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ColumnValue::Null => serializer.serialize_none(),
            ColumnValue::Bool(value) => serializer.serialize_bool(*value),
            ColumnValue::Int(value) => serializer.serialize_i64(*value),
            ColumnValue::Float32(value) if value.is_finite() => serializer.serialize_f32(*value),
            ColumnValue::Float32(_) => serializer.serialize_none(),
            ColumnValue::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            ColumnValue::Float(_) => serializer.serialize_none(),
            ColumnValue::Numeric(value) => serializer.collect_str(value),
            ColumnValue::Text(value) => serializer.serialize_str(value),
            ColumnValue::Timestamp(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            ColumnValue::LocalTimestamp(value) => value.serialize(serializer),
            ColumnValue::Date(value) => value.serialize(serializer),
            ColumnValue::Time(value) => value.serialize(serializer),
            ColumnValue::Uuid(value) => serializer.collect_str(&value.hyphenated()),
            ColumnValue::Json(value) => value.serialize(serializer),
            ColumnValue::Bytes(value) => value.serialize(serializer),
            ColumnValue::Interval(value) => serialize_interval(value, serializer),
            ColumnValue::Inet(value) => serializer.serialize_str(value),
            ColumnValue::Array(values) => values.serialize(serializer),
        }
    }
}

/// Interval as an object of its non-zero parts:
/// `{"years", "months", "days", "hours", "minutes", "seconds", "milliseconds"}`
fn serialize_interval<S>(interval: &PgInterval, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let micros = interval.microseconds;
    let whole = [
        ("years", i64::from(interval.months / 12)),
        ("months", i64::from(interval.months % 12)),
        ("days", i64::from(interval.days)),
        ("hours", micros / MICROS_PER_HOUR),
        ("minutes", micros % MICROS_PER_HOUR / MICROS_PER_MINUTE),
        ("seconds", micros % MICROS_PER_MINUTE / MICROS_PER_SECOND),
    ];
    let millis = (micros % MICROS_PER_SECOND) as f64 / 1000.0;

    let mut map = serializer.serialize_map(None)?;
    for (name, value) in whole {
        if value != 0 {
            map.serialize_entry(name, &value)?;
        }
    }
    if millis != 0.0 {
        map.serialize_entry("milliseconds", &millis)?;
    }
    map.end()
}

/// One result row: column names mapped to values, in result-set column order.
///
/// Duplicate column names (e.g. from a join) are kept; when serialized the
/// last one wins, as it would in a JSON object built column by column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, ColumnValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.columns.push((name.into(), value));
    }

    /// Value of the first column called `name`
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl TryFrom<&PgRow> for Row {
    type Error = sqlx::Error;

    fn try_from(pg_row: &PgRow) -> Result<Self, Self::Error> {
        let mut row = Row::new();
        for column in pg_row.columns() {
            let value = decode_column(pg_row, column.ordinal(), column.name())?;
            row.push(column.name(), value);
        }
        Ok(row)
    }
}

fn decode_column(row: &PgRow, index: usize, name: &str) -> Result<ColumnValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(ColumnValue::Null);
    }
    let type_info = raw.type_info().into_owned();

    let value = match type_info.name() {
        "BOOL" => ColumnValue::Bool(row.try_get(index)?),
        "INT2" => ColumnValue::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" => ColumnValue::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" => ColumnValue::Int(row.try_get(index)?),
        "OID" => ColumnValue::Int(row.try_get::<Oid, _>(index)?.0.into()),
        "FLOAT4" => ColumnValue::Float32(row.try_get(index)?),
        "FLOAT8" => ColumnValue::Float(row.try_get(index)?),
        "NUMERIC" => ColumnValue::Numeric(row.try_get(index)?),
        // sqlx calls bpchar "CHAR"; the one-byte "char" type is "\"CHAR\""
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            ColumnValue::Text(row.try_get_unchecked(index)?)
        }
        "\"CHAR\"" => {
            let byte = row.try_get::<i8, _>(index)? as u8;
            ColumnValue::Text(char::from(byte).to_string())
        }
        "TIMESTAMPTZ" => ColumnValue::Timestamp(row.try_get(index)?),
        "TIMESTAMP" => ColumnValue::LocalTimestamp(row.try_get(index)?),
        "DATE" => ColumnValue::Date(row.try_get(index)?),
        "TIME" => ColumnValue::Time(row.try_get(index)?),
        "INTERVAL" => ColumnValue::Interval(row.try_get(index)?),
        "INET" | "CIDR" => ColumnValue::Inet(decode_inet(raw)?),
        "UUID" => ColumnValue::Uuid(row.try_get(index)?),
        "JSON" | "JSONB" => ColumnValue::Json(row.try_get(index)?),
        "BYTEA" => ColumnValue::Bytes(row.try_get(index)?),
        "BOOL[]" => decode_array(row, index, ColumnValue::Bool)?,
        "INT2[]" => decode_array(row, index, |v: i16| ColumnValue::Int(v.into()))?,
        "INT4[]" => decode_array(row, index, |v: i32| ColumnValue::Int(v.into()))?,
        "INT8[]" => decode_array(row, index, ColumnValue::Int)?,
        "FLOAT4[]" => decode_array(row, index, ColumnValue::Float32)?,
        "FLOAT8[]" => decode_array(row, index, ColumnValue::Float)?,
        "NUMERIC[]" => decode_array(row, index, ColumnValue::Numeric)?,
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => {
            decode_array(row, index, ColumnValue::Text)?
        }
        "TIMESTAMPTZ[]" => decode_array(row, index, ColumnValue::Timestamp)?,
        "TIMESTAMP[]" => decode_array(row, index, ColumnValue::LocalTimestamp)?,
        "DATE[]" => decode_array(row, index, ColumnValue::Date)?,
        "TIME[]" => decode_array(row, index, ColumnValue::Time)?,
        "UUID[]" => decode_array(row, index, ColumnValue::Uuid)?,
        "JSON[]" | "JSONB[]" => decode_array(row, index, ColumnValue::Json)?,
        // Enum labels travel as their text in both wire formats
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
            ColumnValue::Text(row.try_get_unchecked(index)?)
        }
        other => {
            warn!(column = name, column_type = other, "unsupported column type, returning null");
            ColumnValue::Null
        }
    };

    Ok(value)
}

fn decode_array<T>(
    row: &PgRow,
    index: usize,
    to_value: impl Fn(T) -> ColumnValue,
) -> Result<ColumnValue, sqlx::Error>
where
    T: for<'r> Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    let items: Vec<Option<T>> = row.try_get_unchecked(index)?;
    Ok(ColumnValue::Array(
        items
            .into_iter()
            .map(|item| item.map_or(ColumnValue::Null, &to_value))
            .collect(),
    ))
}

/// Render an `inet`/`cidr` value the way Postgres prints it.
///
/// Binary layout: family, prefix bits, is-cidr flag, address length, address.
fn decode_inet(raw: PgValueRef<'_>) -> Result<String, sqlx::Error> {
    if matches!(raw.format(), PgValueFormat::Text) {
        return Ok(raw.as_str().map_err(sqlx::Error::Decode)?.to_string());
    }

    let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
    let invalid = || sqlx::Error::Decode(format!("invalid inet value: {bytes:?}").into());
    if bytes.len() < 4 {
        return Err(invalid());
    }
    let (header, address) = bytes.split_at(4);
    let (bits, is_cidr) = (header[1], header[2] != 0);

    let (text, max_bits) = match address.len() {
        4 => {
            let octets: [u8; 4] = address.try_into().map_err(|_| invalid())?;
            (Ipv4Addr::from(octets).to_string(), 32)
        }
        16 => {
            let octets: [u8; 16] = address.try_into().map_err(|_| invalid())?;
            (Ipv6Addr::from(octets).to_string(), 128)
        }
        _ => return Err(invalid()),
    };

    if is_cidr || bits != max_bits {
        Ok(format!("{text}/{bits}"))
    } else {
        Ok(text)
    }
}
