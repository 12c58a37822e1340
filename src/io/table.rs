//! JSON spot tables
//!
//! Input is a JSON array with one object per spot. Field names are
//! configurable; coordinates may be integers, integral floats or numeric
//! strings, and labels may be strings or numbers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};

use crate::io::configuration::FieldNames;
use crate::io::error::{ErrorContext, NicheError, Result, WithContext};
use crate::spatial::sample::{SpotRecord, SpotTable};

type Object = Map<String, Value>;

/// Parse spot records from a reader holding a JSON array of objects
///
/// # Errors
///
/// Returns `Serialization` for malformed JSON and `Schema` for a missing
/// field or unreadable coordinate
pub fn read_records<R: Read>(reader: R, fields: &FieldNames) -> Result<Vec<SpotRecord>> {
    let objects: Vec<Object> = serde_json::from_reader(reader)?;
    objects
        .iter()
        .enumerate()
        .map(|(index, object)| parse_record(index, object, fields))
        .collect()
}

/// Load and intern a spot table from a JSON file
///
/// # Errors
///
/// Returns `FileSystem` when the file cannot be opened, otherwise as
/// [`read_records`]
pub fn load_table(path: &Path, fields: &FieldNames) -> Result<SpotTable> {
    let context = ErrorContext {
        path: Some(path.to_path_buf()),
        operation: Some("reading spot table"),
        ..Default::default()
    };
    let file = File::open(path).with_context(context.clone())?;
    let records = read_records(BufReader::new(file), fields).with_context(context)?;
    Ok(SpotTable::from_records(&records))
}

fn parse_record(index: usize, object: &Object, fields: &FieldNames) -> Result<SpotRecord> {
    let sample = label(index, object, &fields.sample)?;
    let row = coordinate(index, object, &fields.row)?;
    let col = coordinate(index, object, &fields.col)?;
    let barcode = match &fields.spot {
        Some(field) => label(index, object, field)?,
        None => format!("{sample}:{row}x{col}"),
    };

    Ok(SpotRecord {
        barcode,
        row,
        col,
        cluster: label(index, object, &fields.cluster)?,
        group: label(index, object, &fields.group)?,
        sample,
    })
}

fn field<'a>(index: usize, object: &'a Object, name: &str) -> Result<&'a Value> {
    match object.get(name) {
        Some(Value::Null) | None => Err(schema_error(index, name, "field is missing")),
        Some(value) => Ok(value),
    }
}

fn label(index: usize, object: &Object, name: &str) -> Result<String> {
    match field(index, object, name)? {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(schema_error(index, name, "label must be a string or number")),
    }
}

fn coordinate(index: usize, object: &Object, name: &str) -> Result<i32> {
    let value = field(index, object, name)?;
    let parsed = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| schema_error(index, name, &format!("{value} is not an integer coordinate")))
}

fn schema_error(index: usize, field: &str, reason: &str) -> NicheError {
    NicheError::Schema {
        record: index,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
