//! Binding filter values to statement parameters
//!
//! Filter values are loosely typed (the dialog produces text, numbers, JSON
//! and lists). After preparing a statement we know the type PostgreSQL
//! inferred for every `$n`; each value is converted to the matching Rust type
//! so tokio-postgres can encode it. Types with no Rust counterpart (enums,
//! `inet`, `interval`, ranges, ...) are sent in text format and parsed by the
//! server's own input function.

use crate::error::{DbError, DbResult};
use crate::filter::FilterValue;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::{Format, IsNull};
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_postgres::types::{Kind, ToSql, Type};

/// An owned, encodable parameter
pub type Param = Box<dyn ToSql + Sync + Send>;

/// Convert `values` for a statement whose parameter types are `types`.
pub fn bind(values: &[FilterValue], types: &[Type]) -> DbResult<Vec<Param>> {
    if values.len() != types.len() {
        return Err(DbError::TypeConversion(format!(
            "statement expects {} parameters, got {}",
            types.len(),
            values.len()
        )));
    }
    values
        .iter()
        .zip(types)
        .map(|(value, ty)| to_param(value, ty))
        .collect()
}

/// Borrow a parameter list in the shape `Client::query` takes
pub fn as_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| &**p as &(dyn ToSql + Sync))
        .collect()
}

pub fn to_param(value: &FilterValue, ty: &Type) -> DbResult<Param> {
    if let Kind::Array(member) = ty.kind() {
        let items = match value {
            FilterValue::List(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        return array_param(items, member);
    }
    scalar_param(value, ty)
}

fn scalar_param(value: &FilterValue, ty: &Type) -> DbResult<Param> {
    let param: Param = match *ty {
        Type::INT2 => Box::new(to_i16(value)?),
        Type::INT4 => Box::new(to_i32(value)?),
        Type::INT8 => Box::new(to_i64(value)?),
        Type::FLOAT4 => Box::new(to_f64(value)? as f32),
        Type::FLOAT8 => Box::new(to_f64(value)?),
        Type::NUMERIC => Box::new(to_decimal(value)?),
        Type::BOOL => Box::new(to_bool(value)?),
        Type::JSON | Type::JSONB => Box::new(to_json(value)?),
        Type::UUID => Box::new(to_uuid(value)?),
        Type::DATE => Box::new(to_date(value)?),
        Type::TIME => Box::new(to_time(value)?),
        Type::TIMESTAMP => Box::new(to_timestamp(value)?),
        Type::TIMESTAMPTZ => Box::new(to_timestamptz(value)?),
        _ if <String as ToSql>::accepts(ty) => Box::new(to_text(value)?),
        _ => Box::new(TextParam(to_text(value)?)),
    };
    Ok(param)
}

fn array_param(items: &[FilterValue], member: &Type) -> DbResult<Param> {
    let param: Param = match *member {
        Type::INT2 => Box::new(collect(items, to_i16)?),
        Type::INT4 => Box::new(collect(items, to_i32)?),
        Type::INT8 => Box::new(collect(items, to_i64)?),
        Type::FLOAT4 => Box::new(collect(items, |v| to_f64(v).map(|f| f as f32))?),
        Type::FLOAT8 => Box::new(collect(items, to_f64)?),
        Type::NUMERIC => Box::new(collect(items, to_decimal)?),
        Type::BOOL => Box::new(collect(items, to_bool)?),
        Type::JSON | Type::JSONB => Box::new(collect(items, to_json)?),
        Type::UUID => Box::new(collect(items, to_uuid)?),
        Type::DATE => Box::new(collect(items, to_date)?),
        Type::TIMESTAMP => Box::new(collect(items, to_timestamp)?),
        Type::TIMESTAMPTZ => Box::new(collect(items, to_timestamptz)?),
        _ if <String as ToSql>::accepts(member) => Box::new(collect(items, to_text)?),
        _ => Box::new(TextParam(array_literal(&collect(items, to_text)?))),
    };
    Ok(param)
}

/// A value in PostgreSQL's text representation, valid for any type
#[derive(Debug)]
struct TextParam(String);

impl ToSql for TextParam {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    postgres_types::to_sql_checked!();
}

/// `{"a","b"}` with every element quoted
fn array_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", quoted.join(","))
}

fn collect<T>(
    items: &[FilterValue],
    convert: impl Fn(&FilterValue) -> DbResult<T>,
) -> DbResult<Vec<T>> {
    items.iter().map(convert).collect()
}

fn mismatch(value: &FilterValue, target: &str) -> DbError {
    DbError::TypeConversion(format!("cannot use '{}' as {}", value, target))
}

fn require(value: &FilterValue) -> DbResult<&FilterValue> {
    match value {
        FilterValue::Null => Err(DbError::TypeConversion("missing value".into())),
        other => Ok(other),
    }
}

fn to_i64(value: &FilterValue) -> DbResult<i64> {
    match require(value)? {
        FilterValue::Int(i) => Ok(*i),
        FilterValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        FilterValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, "integer")),
        _ => Err(mismatch(value, "integer")),
    }
}

fn to_i32(value: &FilterValue) -> DbResult<i32> {
    i32::try_from(to_i64(value)?).map_err(|_| mismatch(value, "integer"))
}

fn to_i16(value: &FilterValue) -> DbResult<i16> {
    i16::try_from(to_i64(value)?).map_err(|_| mismatch(value, "smallint"))
}

fn to_f64(value: &FilterValue) -> DbResult<f64> {
    match require(value)? {
        FilterValue::Int(i) => Ok(*i as f64),
        FilterValue::Float(f) => Ok(*f),
        FilterValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, "number")),
        _ => Err(mismatch(value, "number")),
    }
}

fn to_decimal(value: &FilterValue) -> DbResult<Decimal> {
    match require(value)? {
        FilterValue::Int(i) => Ok(Decimal::from(*i)),
        FilterValue::Float(f) => Decimal::try_from(*f).map_err(|_| mismatch(value, "numeric")),
        FilterValue::Text(s) => Decimal::from_str(s.trim()).map_err(|_| mismatch(value, "numeric")),
        _ => Err(mismatch(value, "numeric")),
    }
}

fn to_bool(value: &FilterValue) -> DbResult<bool> {
    match require(value)? {
        FilterValue::Bool(b) => Ok(*b),
        FilterValue::Int(0) => Ok(false),
        FilterValue::Int(1) => Ok(true),
        FilterValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" => Ok(true),
            "false" | "f" => Ok(false),
            _ => Err(mismatch(value, "boolean")),
        },
        _ => Err(mismatch(value, "boolean")),
    }
}

fn to_text(value: &FilterValue) -> DbResult<String> {
    require(value).map(|v| v.to_string())
}

fn to_json(value: &FilterValue) -> DbResult<serde_json::Value> {
    Ok(match require(value)? {
        FilterValue::Json(v) => v.clone(),
        FilterValue::Text(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone()))
        }
        FilterValue::Int(i) => serde_json::Value::from(*i),
        FilterValue::Float(f) => serde_json::Value::from(*f),
        FilterValue::Bool(b) => serde_json::Value::Bool(*b),
        FilterValue::List(items) => serde_json::Value::Array(collect(items, to_json)?),
        FilterValue::Null => serde_json::Value::Null,
    })
}

fn to_uuid(value: &FilterValue) -> DbResult<uuid::Uuid> {
    match require(value)? {
        FilterValue::Text(s) => uuid::Uuid::parse_str(s.trim()).map_err(|_| mismatch(value, "uuid")),
        _ => Err(mismatch(value, "uuid")),
    }
}

fn text_of(value: &FilterValue, target: &str) -> DbResult<String> {
    match require(value)? {
        FilterValue::Text(s) => Ok(s.trim().to_string()),
        _ => Err(mismatch(value, target)),
    }
}

fn to_date(value: &FilterValue) -> DbResult<NaiveDate> {
    let s = text_of(value, "date")?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| mismatch(value, "date"))
}

fn to_time(value: &FilterValue) -> DbResult<NaiveTime> {
    let s = text_of(value, "time")?;
    NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M"))
        .map_err(|_| mismatch(value, "time"))
}

fn to_timestamp(value: &FilterValue) -> DbResult<NaiveDateTime> {
    let s = text_of(value, "timestamp")?;
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| mismatch(value, "timestamp"))
}

fn to_timestamptz(value: &FilterValue) -> DbResult<DateTime<Utc>> {
    let s = text_of(value, "timestamptz")?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Naive input is taken as UTC
    to_timestamp(value).map(|naive| naive.and_utc())
}
