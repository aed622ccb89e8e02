//! Extractor: headerless CSV source → typed [`TabularDataset`]

use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};

use crate::definition::DatasetDefinition;
use crate::error::EtlError;
use crate::source::open_source;
use crate::table::{Cell, Column, ColumnType, TabularDataset};

/// Accepted layouts for declared timestamp columns, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read the definition's source into a dataset.
///
/// Fails without a partial result: any short or long row is a
/// [`EtlError::SchemaMismatch`], any value that does not fit its declared
/// type is a [`EtlError::TypeCoercion`].
pub fn extract(definition: &DatasetDefinition) -> Result<TabularDataset, EtlError> {
    log::info!(
        "{}: reading dataset from {}",
        definition.name(),
        definition.source_uri()
    );
    let reader = open_source(definition.source_uri())?;
    extract_from_reader(definition, reader)
}

/// Parse already-opened source bytes. Split out so tests need no files.
pub fn extract_from_reader<R: Read>(
    definition: &DatasetDefinition,
    reader: R,
) -> Result<TabularDataset, EtlError> {
    let expected = definition.columns().len();
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    // Column-major raw text; empty fields are missing values
    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); expected];
    let mut record = csv::StringRecord::new();
    let mut row = 0usize;
    loop {
        let more = csv
            .read_record(&mut record)
            .map_err(|e| EtlError::SourceUnavailable {
                uri: definition.source_uri().to_string(),
                message: e.to_string(),
            })?;
        if !more {
            break;
        }
        if record.len() != expected {
            return Err(EtlError::SchemaMismatch {
                expected,
                found: record.len(),
                row,
            });
        }
        for (values, field) in raw.iter_mut().zip(record.iter()) {
            values.push((!field.is_empty()).then(|| field.to_string()));
        }
        row += 1;
    }

    let columns = definition
        .columns()
        .iter()
        .zip(raw)
        .map(|(name, values)| {
            let ty = definition
                .declared_type(name)
                .unwrap_or_else(|| infer_type(&values));
            coerce_column(name, ty, values).map(|cells| Column::new(name.as_str(), ty, cells))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dataset = TabularDataset::new(columns);
    log::debug!(
        "{}: extracted {} rows x {} columns",
        definition.name(),
        dataset.num_rows(),
        dataset.num_columns()
    );
    Ok(dataset)
}

/// Narrowest type that fits every present value. Timestamps are never inferred.
fn infer_type(values: &[Option<String>]) -> ColumnType {
    let present = || values.iter().flatten().map(|v| v.trim());
    if present().next().is_none() {
        ColumnType::String
    } else if present().all(|v| v.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if present().all(|v| v.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else {
        ColumnType::String
    }
}

fn coerce_column(
    name: &str,
    ty: ColumnType,
    values: Vec<Option<String>>,
) -> Result<Vec<Cell>, EtlError> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            None => Ok(Cell::Null),
            Some(text) => coerce_value(&text, ty).ok_or_else(|| EtlError::TypeCoercion {
                column: name.to_string(),
                row,
                value: text,
                expected: ty,
            }),
        })
        .collect()
}

/// Strings are kept verbatim (blank cells are cleaned later, not here).
fn coerce_value(text: &str, ty: ColumnType) -> Option<Cell> {
    match ty {
        ColumnType::String => Some(Cell::Str(text.to_string())),
        ColumnType::Integer => text.trim().parse().ok().map(Cell::Int),
        ColumnType::Float => text.trim().parse().ok().map(Cell::Float),
        ColumnType::Timestamp => parse_timestamp(text.trim()).map(Cell::Timestamp),
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
