//! SQL text for table replacement and catalog queries

use martline_core::{ColumnType, TabularDataset};

/// Name of the leading row-index column when the index is written
pub const INDEX_COLUMN: &str = "index";

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::String => "VARCHAR",
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE",
        ColumnType::Timestamp => "TIMESTAMP",
    }
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// `CREATE TABLE` matching the dataset's columns, with an optional
/// leading index column.
pub fn create_table(table: &str, dataset: &TabularDataset, include_index: bool) -> String {
    let mut defs = Vec::with_capacity(dataset.num_columns() + 1);
    if include_index {
        defs.push(format!("{} BIGINT", quote_ident(INDEX_COLUMN)));
    }
    defs.extend(
        dataset
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.ty))),
    );
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

/// All base tables in the default schema.
pub fn list_tables() -> &'static str {
    "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
     ORDER BY table_name"
}

#[cfg(test)]
mod tests {
    use super::*;
    use martline_core::{Cell, Column};

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("raw_orders"), "\"raw_orders\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn create_table_with_index() {
        let ds = TabularDataset::new(vec![
            Column::new("payment_type", ColumnType::String, vec![Cell::Null]),
            Column::new("payment_value", ColumnType::Float, vec![Cell::Float(1.5)]),
        ]);
        assert_eq!(
            create_table("clean_order_payment", &ds, true),
            "CREATE TABLE \"clean_order_payment\" (\"index\" BIGINT, \
             \"payment_type\" VARCHAR, \"payment_value\" DOUBLE)"
        );
        assert_eq!(
            create_table("t", &ds, false),
            "CREATE TABLE \"t\" (\"payment_type\" VARCHAR, \"payment_value\" DOUBLE)"
        );
    }
}
