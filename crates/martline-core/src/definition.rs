//! Dataset definitions: schema plus ordered cleaning steps

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::table::ColumnType;

/// One cleaning transformation.
///
/// Steps are pure and stateless. Column-scoped steps only touch string
/// cells; nulls and non-string cells pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CleaningStep {
    /// Whitespace-only (or empty) cells become null, in every column
    BlankToNull,
    /// Drop rows equal to an earlier row across all columns
    DedupeRows,
    TitleCase { column: String },
    UpperCase { column: String },
    LowerCase { column: String },
    /// Remove ASCII punctuation characters
    StripPunctuation { column: String },
    /// Replace cells exactly equal to `from` with `to`
    ValueRemap {
        column: String,
        from: String,
        to: String,
    },
    /// Replace every occurrence of the substring `from` with `to`
    ReplaceLiteral {
        column: String,
        from: String,
        to: String,
    },
}

impl CleaningStep {
    pub fn title_case(column: &str) -> Self {
        Self::TitleCase {
            column: column.to_string(),
        }
    }

    pub fn upper_case(column: &str) -> Self {
        Self::UpperCase {
            column: column.to_string(),
        }
    }

    pub fn lower_case(column: &str) -> Self {
        Self::LowerCase {
            column: column.to_string(),
        }
    }

    pub fn strip_punctuation(column: &str) -> Self {
        Self::StripPunctuation {
            column: column.to_string(),
        }
    }

    pub fn value_remap(column: &str, from: &str, to: &str) -> Self {
        Self::ValueRemap {
            column: column.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn replace_literal(column: &str, from: &str, to: &str) -> Self {
        Self::ReplaceLiteral {
            column: column.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BlankToNull => "blank-to-null",
            Self::DedupeRows => "dedupe-rows",
            Self::TitleCase { .. } => "title-case",
            Self::UpperCase { .. } => "upper-case",
            Self::LowerCase { .. } => "lower-case",
            Self::StripPunctuation { .. } => "strip-punctuation",
            Self::ValueRemap { .. } => "value-remap",
            Self::ReplaceLiteral { .. } => "replace-literal",
        }
    }

    /// Target column, or `None` for dataset-wide steps.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::BlankToNull | Self::DedupeRows => None,
            Self::TitleCase { column }
            | Self::UpperCase { column }
            | Self::LowerCase { column }
            | Self::StripPunctuation { column }
            | Self::ValueRemap { column, .. }
            | Self::ReplaceLiteral { column, .. } => Some(column),
        }
    }
}

impl fmt::Display for CleaningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueRemap { column, from, to } | Self::ReplaceLiteral { column, from, to } => {
                write!(f, "{}({column}: {from:?} -> {to:?})", self.kind())
            }
            _ => match self.column() {
                Some(column) => write!(f, "{}({column})", self.kind()),
                None => f.write_str(self.kind()),
            },
        }
    }
}

/// Raw and clean table names for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentity {
    pub raw: String,
    pub clean: String,
}

impl TableIdentity {
    pub fn for_dataset(name: &str) -> Self {
        Self {
            raw: format!("raw_{name}"),
            clean: format!("clean_{name}"),
        }
    }
}

/// Static description of one dataset.
///
/// Source files are headerless, so `columns` defines both the names and
/// the positional order of fields. Columns missing from `column_types`
/// get an inferred type on extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    name: String,
    source_uri: String,
    columns: Vec<String>,
    #[serde(default)]
    column_types: BTreeMap<String, ColumnType>,
    #[serde(default)]
    steps: Vec<CleaningStep>,
}

impl DatasetDefinition {
    pub fn new(name: &str, source_uri: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            source_uri: source_uri.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            column_types: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    /// Declare a coercion type for a column.
    pub fn with_type(mut self, column: &str, ty: ColumnType) -> Self {
        self.column_types.insert(column.to_string(), ty);
        self
    }

    pub fn with_steps(mut self, steps: Vec<CleaningStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Same dataset, read from another location.
    pub fn with_source_uri(mut self, source_uri: impl Into<String>) -> Self {
        self.source_uri = source_uri.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_types(&self) -> &BTreeMap<String, ColumnType> {
        &self.column_types
    }

    pub fn declared_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types.get(column).copied()
    }

    pub fn steps(&self) -> &[CleaningStep] {
        &self.steps
    }

    pub fn tables(&self) -> TableIdentity {
        TableIdentity::for_dataset(&self.name)
    }

    /// Mirror file location under `clean_dir`.
    pub fn mirror_path(&self, clean_dir: &Path) -> PathBuf {
        crate::persist::mirror_path(clean_dir, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_identity_prefixes() {
        let tables = TableIdentity::for_dataset("geolocation");
        assert_eq!(tables.raw, "raw_geolocation");
        assert_eq!(tables.clean, "clean_geolocation");
    }

    #[test]
    fn builder_records_types_and_steps() {
        let columns = ["seller_id", "seller_zip_code"];
        let def = DatasetDefinition::new("sellers", "sellers.csv", &columns)
            .with_type("seller_zip_code", ColumnType::Integer)
            .with_steps(vec![CleaningStep::BlankToNull, CleaningStep::DedupeRows]);
        assert_eq!(def.columns(), &["seller_id", "seller_zip_code"]);
        assert_eq!(def.declared_type("seller_zip_code"), Some(ColumnType::Integer));
        assert_eq!(def.declared_type("seller_id"), None);
        assert_eq!(def.steps().len(), 2);
    }

    #[test]
    fn step_display() {
        assert_eq!(CleaningStep::BlankToNull.to_string(), "blank-to-null");
        assert_eq!(
            CleaningStep::title_case("order_status").to_string(),
            "title-case(order_status)"
        );
        assert_eq!(
            CleaningStep::value_remap("payment_type", "credit_card", "credit card").to_string(),
            "value-remap(payment_type: \"credit_card\" -> \"credit card\")"
        );
    }

    #[test]
    fn parse_definition_toml() {
        let toml = r#"
name = "carriers"
source_uri = "data/raw/carriers.csv"
columns = ["carrier_id", "carrier_name", "fleet_size"]

[column_types]
fleet_size = "integer"

[[steps]]
kind = "blank-to-null"

[[steps]]
kind = "title-case"
column = "carrier_name"

[[steps]]
kind = "replace-literal"
column = "carrier_name"
from = "_"
to = " "
"#;
        let def: DatasetDefinition = toml::from_str(toml).unwrap();
        assert_eq!(def.name(), "carriers");
        assert_eq!(def.declared_type("fleet_size"), Some(ColumnType::Integer));
        assert_eq!(
            def.steps(),
            &[
                CleaningStep::BlankToNull,
                CleaningStep::title_case("carrier_name"),
                CleaningStep::replace_literal("carrier_name", "_", " "),
            ]
        );
    }
}
