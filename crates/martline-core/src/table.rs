//! In-memory columnar data model shared by every pipeline stage

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Rendering format for timestamp cells (mirror file and logs)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Same, for timestamps with sub-second precision
const FRACTIONAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Semantic column type, either declared by a definition or inferred on extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
        })
    }
}

/// A single typed value. `Null` is the missing-value marker.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used by the file mirror. `None` for null.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Str(s) => Some(Cow::Borrowed(s)),
            Self::Int(v) => Some(Cow::Owned(v.to_string())),
            Self::Float(v) => Some(Cow::Owned(format_float(*v))),
            Self::Timestamp(ts) => Some(Cow::Owned(format_timestamp(ts))),
        }
    }
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format(TIMESTAMP_FORMAT).to_string()
    } else {
        ts.format(FRACTIONAL_TIMESTAMP_FORMAT).to_string()
    }
}

/// Floats always keep a decimal point so the mirror round-trips as float.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

// Floats compare by bit pattern so rows can be hashed for dedupe.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Str(s) => s.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            ty,
            values,
        }
    }
}

/// Ordered columns of equal length plus the source position of every row.
///
/// Row order is read order. Cleaning may drop rows (dedupe) but never adds
/// or removes columns, so `row_ids` always lines up with every column.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    columns: Vec<Column>,
    row_ids: Vec<usize>,
}

impl TabularDataset {
    /// Build a dataset whose rows are numbered `0..n` in order.
    ///
    /// Panics if the columns differ in length.
    pub fn new(columns: Vec<Column>) -> Self {
        let rows = columns.first().map_or(0, |c| c.values.len());
        assert!(
            columns.iter().all(|c| c.values.len() == rows),
            "all columns must have the same length"
        );
        Self {
            columns,
            row_ids: (0..rows).collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Source position (0-based data row in the source file) of each row.
    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    /// Cells of one row, in column order.
    pub fn row(&self, idx: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.num_rows()).map(move |i| self.row(i))
    }

    /// Keep the rows whose mask entry is `true`, preserving order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.num_rows());
        for column in &mut self.columns {
            let mut it = keep.iter();
            column.values.retain(|_| *it.next().unwrap_or(&false));
        }
        let mut it = keep.iter();
        self.row_ids.retain(|_| *it.next().unwrap_or(&false));
    }
}

/// Shape of written output shared by the file mirror and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit each row's source position as a leading column
    pub include_index: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            include_index: true,
        }
    }
}
