use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::*;
use survey_model::RawTable;
use tracing::info;

use crate::csv_table::read_csv_table;
use crate::polars_utils::raw_table_from_dataframe;

/// Supported microdata file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            other => bail!("unsupported source format '{other}': {}", path.display()),
        }
    }
}

/// Decode `path` into raw records keyed by raw field name.
pub fn read_source(path: &Path, format: SourceFormat) -> Result<RawTable> {
    let table = match format {
        SourceFormat::Csv => read_csv_table(path)?,
        SourceFormat::Parquet => {
            let file =
                File::open(path).with_context(|| format!("open parquet: {}", path.display()))?;
            let df = ParquetReader::new(file)
                .finish()
                .with_context(|| format!("read parquet: {}", path.display()))?;
            raw_table_from_dataframe(&df)
                .with_context(|| format!("convert parquet: {}", path.display()))?
        }
    };
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.headers.len(),
        "read source"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_inferred_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("sak202502.CSV")).unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("ssn202303.parquet")).unwrap(),
            SourceFormat::Parquet
        );
        assert!(SourceFormat::from_path(Path::new("ssn202303.dbf")).is_err());
    }
}
