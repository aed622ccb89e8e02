//! Extract → clean → persist through the public API, from real files.

use std::fs::File;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use martline_core::{
    Cell, CleaningStep, ColumnType, DatasetDefinition, EtlError, WriteOptions, clean, extract,
    mirror_path, persist,
};
use tempfile::TempDir;

const ORDERS: &str = "\
o1,c1,delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,,,2017-10-18 00:00:00
o2,c2,SHIPPED,2018-07-24 20:41:37,2018-07-26 03:24:27,2018-07-26 14:31:00,,2018-08-13 00:00:00
o1,c1,delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,,,2017-10-18 00:00:00
";

fn orders_definition(uri: String) -> DatasetDefinition {
    DatasetDefinition::new(
        "orders",
        uri,
        &[
            "order_id",
            "customer_id",
            "order_status",
            "order_purchase_timestamp",
            "order_approved_at",
            "order_delivered_carrier_date",
            "order_delivered_customer_date",
            "order_delivered_delivery_date",
        ],
    )
    .with_steps(vec![
        CleaningStep::BlankToNull,
        CleaningStep::title_case("order_status"),
        CleaningStep::DedupeRows,
    ])
}

#[test]
fn gzipped_file_uri_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders_dataset.csv.gz");
    let mut gz = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    gz.write_all(ORDERS.as_bytes()).unwrap();
    gz.finish().unwrap();

    let def = orders_definition(format!("file://{}", path.display()));
    let raw = extract(&def).unwrap();
    assert_eq!(raw.num_rows(), 3);
    assert_eq!(raw.num_columns(), 8);
    // Timestamps are not inferred; they stay text
    assert_eq!(
        raw.column("order_purchase_timestamp").unwrap().ty,
        ColumnType::String
    );
    assert_eq!(raw.column("order_delivered_customer_date").unwrap().values, vec![Cell::Null; 3]);
}

#[test]
fn orders_pipeline_to_mirror() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("orders_dataset.csv");
    std::fs::write(&source, ORDERS).unwrap();
    let def = orders_definition(source.display().to_string())
        .with_type("order_purchase_timestamp", ColumnType::Timestamp);

    let raw = extract(&def).unwrap();
    let cleaned = clean(raw.clone(), def.steps()).unwrap();
    assert_eq!(cleaned.num_rows(), 2);
    assert_eq!(cleaned.row_ids(), &[0, 1]);
    assert_eq!(
        cleaned.column("order_status").unwrap().values,
        vec![Cell::from("Delivered"), Cell::from("Shipped")]
    );
    // Raw data is untouched by cleaning
    assert_eq!(raw.column("order_status").unwrap().values[1], Cell::from("SHIPPED"));

    let mirror = mirror_path(&dir.path().join("clean"), def.name());
    persist(&cleaned, &mirror, WriteOptions::default()).unwrap();
    let content = std::fs::read_to_string(&mirror).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[1],
        "0,o1,c1,Delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,,,2017-10-18 00:00:00"
    );
}

#[test]
fn missing_source_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let def = orders_definition(dir.path().join("nope.csv").display().to_string());
    assert!(matches!(
        extract(&def),
        Err(EtlError::SourceUnavailable { .. })
    ));
}

#[test]
fn unparseable_timestamp_names_column_and_row() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("orders_dataset.csv");
    std::fs::write(
        &source,
        "o1,c1,delivered,2017-10-02 10:56:33,,,,\no2,c2,delivered,yesterday,,,,\n",
    )
    .unwrap();
    let def = orders_definition(source.display().to_string())
        .with_type("order_purchase_timestamp", ColumnType::Timestamp);

    match extract(&def) {
        Err(EtlError::TypeCoercion { column, row, value, expected }) => {
            assert_eq!(column, "order_purchase_timestamp");
            assert_eq!(row, 1);
            assert_eq!(value, "yesterday");
            assert_eq!(expected, ColumnType::Timestamp);
        }
        other => panic!("unexpected: {:?}", other.map(|d| d.num_rows())),
    }
}
