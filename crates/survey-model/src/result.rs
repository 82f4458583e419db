//! Indicator result tables in long and wide (wave-per-column) form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wave::WaveId;

/// Display unit of an indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "M Rp")]
    MillionRupiah,
    /// Unlabelled index (FGT measures, Gini).
    #[serde(rename = "")]
    Index,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::MillionRupiah => "M Rp",
            Unit::Index => "",
        }
    }
}

/// Why an estimate is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The wave does not collect a field the indicator references.
    FieldNotCollected,
    /// No eligible record with a usable value.
    EmptySubpopulation,
    ZeroDenominator,
    /// No poverty line applies to any eligible record.
    NoPovertyLines,
}

impl UndefinedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FieldNotCollected => "field not collected",
            Self::EmptySubpopulation => "empty subpopulation",
            Self::ZeroDenominator => "zero denominator",
            Self::NoPovertyLines => "no poverty lines",
        }
    }
}

/// One `(indicator, wave)` estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub indicator: String,
    pub unit: Unit,
    pub wave: WaveId,
    pub estimate: Option<f64>,
    pub lower_ci: Option<f64>,
    pub upper_ci: Option<f64>,
    /// Interval computed without a declared PSU structure.
    #[serde(default)]
    pub ci_approximate: bool,
    /// Records contributing to the estimate.
    pub sample_size: usize,
    /// Records dropped because a referenced field was missing.
    #[serde(default)]
    pub excluded_missing: usize,
    /// Records dropped because a referenced field held an unrecognized code.
    #[serde(default)]
    pub excluded_unrecognized: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undefined_reason: Option<UndefinedReason>,
}

impl ResultRow {
    pub fn undefined(
        indicator: impl Into<String>,
        unit: Unit,
        wave: WaveId,
        reason: UndefinedReason,
    ) -> Self {
        Self {
            indicator: indicator.into(),
            unit,
            wave,
            estimate: None,
            lower_ci: None,
            upper_ci: None,
            ci_approximate: false,
            sample_size: 0,
            excluded_missing: 0,
            excluded_unrecognized: 0,
            undefined_reason: Some(reason),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.estimate.is_some()
    }
}

/// Long-form results: one row per indicator per wave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, indicator: &str, wave: &WaveId) -> Option<&ResultRow> {
        self.rows
            .iter()
            .find(|row| row.indicator == indicator && &row.wave == wave)
    }

    /// Estimate of the first row named `indicator`.
    pub fn estimate(&self, indicator: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.indicator == indicator)
            .and_then(|row| row.estimate)
    }

    /// Distinct waves in first-seen order.
    pub fn waves(&self) -> Vec<WaveId> {
        let mut waves: Vec<WaveId> = Vec::new();
        for row in &self.rows {
            if !waves.contains(&row.wave) {
                waves.push(row.wave.clone());
            }
        }
        waves
    }

    /// Pivot so waves become columns, one row per indicator.
    pub fn to_wide(&self) -> WideTable {
        let mut waves = self.waves();
        waves.sort();
        let mut order: Vec<(String, Unit)> = Vec::new();
        let mut cells: BTreeMap<(String, WaveId), WaveCell> = BTreeMap::new();
        for row in &self.rows {
            if !order.iter().any(|(name, _)| name == &row.indicator) {
                order.push((row.indicator.clone(), row.unit));
            }
            cells.insert(
                (row.indicator.clone(), row.wave.clone()),
                WaveCell::from_row(row),
            );
        }
        let rows = order
            .into_iter()
            .map(|(indicator, unit)| {
                let row_cells = waves
                    .iter()
                    .filter_map(|wave| cells.remove(&(indicator.clone(), wave.clone())))
                    .collect();
                WideRow {
                    indicator,
                    unit,
                    cells: row_cells,
                }
            })
            .collect();
        WideTable { waves, rows }
    }
}

/// Estimate for one wave inside a [`WideRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveCell {
    pub wave: WaveId,
    pub estimate: Option<f64>,
    pub lower_ci: Option<f64>,
    pub upper_ci: Option<f64>,
    #[serde(default)]
    pub ci_approximate: bool,
    pub sample_size: usize,
    #[serde(default)]
    pub excluded_missing: usize,
    #[serde(default)]
    pub excluded_unrecognized: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undefined_reason: Option<UndefinedReason>,
}

impl WaveCell {
    fn from_row(row: &ResultRow) -> Self {
        Self {
            wave: row.wave.clone(),
            estimate: row.estimate,
            lower_ci: row.lower_ci,
            upper_ci: row.upper_ci,
            ci_approximate: row.ci_approximate,
            sample_size: row.sample_size,
            excluded_missing: row.excluded_missing,
            excluded_unrecognized: row.excluded_unrecognized,
            undefined_reason: row.undefined_reason,
        }
    }

    fn into_row(self, indicator: &str, unit: Unit) -> ResultRow {
        ResultRow {
            indicator: indicator.to_string(),
            unit,
            wave: self.wave,
            estimate: self.estimate,
            lower_ci: self.lower_ci,
            upper_ci: self.upper_ci,
            ci_approximate: self.ci_approximate,
            sample_size: self.sample_size,
            excluded_missing: self.excluded_missing,
            excluded_unrecognized: self.excluded_unrecognized,
            undefined_reason: self.undefined_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub indicator: String,
    pub unit: Unit,
    /// Cells in the table's wave order.
    pub cells: Vec<WaveCell>,
}

impl WideRow {
    pub fn cell(&self, wave: &WaveId) -> Option<&WaveCell> {
        self.cells.iter().find(|cell| &cell.wave == wave)
    }

    /// Last wave's estimate minus the first wave's.
    pub fn change(&self) -> Option<f64> {
        if self.cells.len() < 2 {
            return None;
        }
        let first = self.cells.first()?.estimate?;
        let last = self.cells.last()?.estimate?;
        Some(last - first)
    }
}

/// Multi-wave comparison, one row per indicator, waves as columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    pub waves: Vec<WaveId>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn row(&self, indicator: &str) -> Option<&WideRow> {
        self.rows.iter().find(|row| row.indicator == indicator)
    }

    /// Un-pivot back to long form.
    pub fn to_long(&self) -> ResultTable {
        let rows = self
            .rows
            .iter()
            .flat_map(|row| {
                row.cells
                    .iter()
                    .cloned()
                    .map(|cell| cell.into_row(&row.indicator, row.unit))
            })
            .collect();
        ResultTable { rows }
    }
}
