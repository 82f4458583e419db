pub mod csv_table;
pub mod polars_utils;
pub mod source;

pub use csv_table::{read_column_labels, read_csv_table};
pub use polars_utils::{any_to_string, format_numeric, parse_f64, raw_table_from_dataframe};
pub use source::{SourceFormat, read_source};
