use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use survey_model::RawTable;
use tracing::debug;

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Read a delimited file whose first non-blank row holds the raw field names.
///
/// Blank rows are skipped; short rows are padded with empty cells.
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        match &headers {
            None => headers = Some(record.iter().map(normalize_header).collect()),
            Some(names) => {
                let row = (0..names.len())
                    .map(|idx| record.get(idx).map(normalize_cell).unwrap_or_default())
                    .collect();
                rows.push(row);
            }
        }
    }

    let headers = headers.unwrap_or_default();
    debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "read csv table"
    );
    Ok(RawTable::new(headers, rows))
}

/// Read a `name,label` sidecar describing raw columns.
pub fn read_column_labels(path: &Path) -> Result<BTreeMap<String, String>> {
    let table = read_csv_table(path)?;
    let mut labels = BTreeMap::new();
    for row in &table.rows {
        let name = row.first().map(String::as_str).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let label = row.get(1).cloned().unwrap_or_default();
        labels.insert(name.to_string(), label);
    }
    Ok(labels)
}
