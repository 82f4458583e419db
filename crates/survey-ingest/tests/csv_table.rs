use std::io::Write;

use survey_ingest::{SourceFormat, read_column_labels, read_source};
use tempfile::NamedTempFile;

fn temp_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[test]
fn reads_headers_and_pads_short_rows() {
    let file = temp_csv("\u{feff}KODE_PROV, DEM_AGE ,WEIGHT\n\n31,25,120.5\n32,40\n");
    let table = read_source(file.path(), SourceFormat::Csv).unwrap();
    assert_eq!(table.headers, vec!["KODE_PROV", "DEM_AGE", "WEIGHT"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[1], vec!["32", "40", ""]);
}

#[test]
fn empty_file_yields_empty_table() {
    let file = temp_csv("");
    let table = read_source(file.path(), SourceFormat::Csv).unwrap();
    assert!(table.headers.is_empty());
    assert!(table.is_empty());
}

#[test]
fn column_labels_are_keyed_by_name() {
    let file = temp_csv("name,label\nB4K5,Umur\nB4K4,Jenis kelamin\n");
    let labels = read_column_labels(file.path()).unwrap();
    assert_eq!(labels.get("B4K5").map(String::as_str), Some("Umur"));
    assert_eq!(labels.len(), 2);
}
