//! Flattening result tables for CSV, JSON, and columnar output.

use std::fmt;

use polars::prelude::{Column, DataFrame, PolarsResult};
use serde::Serialize;

use survey_model::{ResultTable, WideTable};

/// One output cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(Option<f64>),
    Count(usize),
    Flag(bool),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(Some(value)) => write!(f, "{value}"),
            Cell::Number(None) => Ok(()),
            Cell::Count(count) => write!(f, "{count}"),
            Cell::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// Ordered `(column, value)` pairs of one output row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedRow(pub Vec<(String, Cell)>);

impl NamedRow {
    fn push(&mut self, name: impl Into<String>, cell: Cell) {
        self.0.push((name.into(), cell));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.0.iter().map(|(_, cell)| cell)
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.0
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, cell)| cell)
    }
}

impl Serialize for NamedRow {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, cell) in &self.0 {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

/// Column holding last-minus-first wave change in wide output.
pub const CHANGE_COLUMN: &str = "change";

pub fn long_rows(table: &ResultTable) -> Vec<NamedRow> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut out = NamedRow::default();
            out.push("indicator", Cell::Text(row.indicator.clone()));
            out.push("unit", Cell::Text(row.unit.as_str().to_string()));
            out.push("wave", Cell::Text(row.wave.to_string()));
            out.push("estimate", Cell::Number(row.estimate));
            out.push("lower_ci", Cell::Number(row.lower_ci));
            out.push("upper_ci", Cell::Number(row.upper_ci));
            out.push("ci_approximate", Cell::Flag(row.ci_approximate));
            out.push("sample_size", Cell::Count(row.sample_size));
            out.push("excluded_missing", Cell::Count(row.excluded_missing));
            out.push("excluded_unrecognized", Cell::Count(row.excluded_unrecognized));
            out.push(
                "undefined_reason",
                Cell::Text(
                    row.undefined_reason
                        .map(|reason| reason.as_str().to_string())
                        .unwrap_or_default(),
                ),
            );
            out
        })
        .collect()
}

/// Wide rows: indicator, unit, one estimate column per wave, then change.
pub fn wide_rows(table: &WideTable) -> Vec<NamedRow> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut out = NamedRow::default();
            out.push("indicator", Cell::Text(row.indicator.clone()));
            out.push("unit", Cell::Text(row.unit.as_str().to_string()));
            for wave in &table.waves {
                let estimate = row.cell(wave).and_then(|cell| cell.estimate);
                out.push(wave.to_string(), Cell::Number(estimate));
            }
            out.push(CHANGE_COLUMN, Cell::Number(row.change()));
            out
        })
        .collect()
}

/// Long results as a Polars frame.
pub fn long_frame(table: &ResultTable) -> PolarsResult<DataFrame> {
    let rows = &table.rows;
    let count = |values: Vec<usize>| -> Vec<u64> {
        values.into_iter().map(|n| n as u64).collect()
    };
    DataFrame::new(vec![
        Column::new(
            "indicator".into(),
            rows.iter().map(|row| row.indicator.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "unit".into(),
            rows.iter().map(|row| row.unit.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "wave".into(),
            rows.iter().map(|row| row.wave.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "estimate".into(),
            rows.iter().map(|row| row.estimate).collect::<Vec<_>>(),
        ),
        Column::new(
            "lower_ci".into(),
            rows.iter().map(|row| row.lower_ci).collect::<Vec<_>>(),
        ),
        Column::new(
            "upper_ci".into(),
            rows.iter().map(|row| row.upper_ci).collect::<Vec<_>>(),
        ),
        Column::new(
            "ci_approximate".into(),
            rows.iter().map(|row| row.ci_approximate).collect::<Vec<_>>(),
        ),
        Column::new(
            "sample_size".into(),
            count(rows.iter().map(|row| row.sample_size).collect()),
        ),
        Column::new(
            "excluded_missing".into(),
            count(rows.iter().map(|row| row.excluded_missing).collect()),
        ),
        Column::new(
            "excluded_unrecognized".into(),
            count(rows.iter().map(|row| row.excluded_unrecognized).collect()),
        ),
        Column::new(
            "undefined_reason".into(),
            rows.iter()
                .map(|row| row.undefined_reason.map(|reason| reason.as_str()))
                .collect::<Vec<_>>(),
        ),
    ])
}

/// Wide results as a Polars frame, one column per wave.
pub fn wide_frame(table: &WideTable) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new(
            "indicator".into(),
            table.rows.iter().map(|row| row.indicator.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "unit".into(),
            table.rows.iter().map(|row| row.unit.as_str()).collect::<Vec<_>>(),
        ),
    ];
    for wave in &table.waves {
        let values: Vec<Option<f64>> = table
            .rows
            .iter()
            .map(|row| row.cell(wave).and_then(|cell| cell.estimate))
            .collect();
        columns.push(Column::new(wave.as_str().into(), values));
    }
    columns.push(Column::new(
        CHANGE_COLUMN.into(),
        table.rows.iter().map(|row| row.change()).collect::<Vec<_>>(),
    ));
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_model::{ResultRow, UndefinedReason, Unit, WaveId};

    fn table() -> ResultTable {
        let wave = |id: &str| WaveId::parse(id).unwrap();
        ResultTable::new(vec![
            ResultRow {
                indicator: "labor_force_participation_rate".into(),
                unit: Unit::Percent,
                wave: wave("2024-08"),
                estimate: Some(70.0),
                lower_ci: Some(69.0),
                upper_ci: Some(71.0),
                ci_approximate: true,
                sample_size: 120,
                excluded_missing: 2,
                excluded_unrecognized: 1,
                undefined_reason: None,
            },
            ResultRow {
                estimate: Some(71.5),
                sample_size: 95,
                undefined_reason: None,
                ..ResultRow::undefined(
                    "labor_force_participation_rate",
                    Unit::Percent,
                    wave("2025-02"),
                    UndefinedReason::ZeroDenominator,
                )
            },
            ResultRow::undefined(
                "gini",
                Unit::Index,
                wave("2025-02"),
                UndefinedReason::FieldNotCollected,
            ),
        ])
    }

    #[test]
    fn long_rows_keep_column_order() {
        let rows = long_rows(&table());
        let names: Vec<_> = rows[0].names().collect();
        assert_eq!(names[..4], ["indicator", "unit", "wave", "estimate"]);
        assert_eq!(rows[0].get("ci_approximate"), Some(&Cell::Flag(true)));
        assert_eq!(
            rows[2].get("undefined_reason").map(ToString::to_string),
            Some("field not collected".to_string())
        );
        assert_eq!(rows[2].get("estimate").map(ToString::to_string), Some(String::new()));
    }

    #[test]
    fn wide_rows_end_with_change() {
        let wide = table().to_wide();
        let rows = wide_rows(&wide);
        let lfpr = &rows[0];
        let names: Vec<_> = lfpr.names().collect();
        assert_eq!(names, ["indicator", "unit", "2024-08", "2025-02", "change"]);
        assert_eq!(lfpr.get("change"), Some(&Cell::Number(Some(1.5))));
        assert_eq!(rows[1].get("2024-08"), Some(&Cell::Number(None)));
    }

    #[test]
    fn frames_have_one_row_per_entry() {
        let long = long_frame(&table()).unwrap();
        assert_eq!(long.height(), 3);
        assert_eq!(long.width(), 11);
        let wide = wide_frame(&table().to_wide()).unwrap();
        assert_eq!(wide.shape(), (2, 5));
    }

    #[test]
    fn named_rows_serialize_as_objects() {
        let json = serde_json::to_value(&long_rows(&table())[0]).unwrap();
        assert_eq!(json["estimate"], serde_json::json!(70.0));
        assert_eq!(json["sample_size"], serde_json::json!(120));
    }
}
