use std::collections::BTreeMap;

use serde::Serialize;
use survey_model::{CanonicalField, WaveId};

/// A mapped raw column that the data does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingSource {
    pub field: CanonicalField,
    pub source: String,
}

/// Data-quality findings accumulated while harmonizing one wave.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonizationReport {
    pub wave: WaveId,
    pub records: usize,
    /// Raw values outside the recode table (or unparseable), with counts.
    pub unrecognized: BTreeMap<CanonicalField, BTreeMap<String, usize>>,
    /// Cells resolved to missing, per field.
    pub missing: BTreeMap<CanonicalField, usize>,
    pub missing_sources: Vec<MissingSource>,
    /// Raw columns no rule reads.
    pub unmapped_columns: Vec<String>,
    /// Fields the wave does not collect.
    pub not_available: Vec<CanonicalField>,
}

impl HarmonizationReport {
    pub fn new(wave: WaveId, records: usize) -> Self {
        Self {
            wave,
            records,
            unrecognized: BTreeMap::new(),
            missing: BTreeMap::new(),
            missing_sources: Vec::new(),
            unmapped_columns: Vec::new(),
            not_available: Vec::new(),
        }
    }

    pub fn record_unrecognized(&mut self, field: CanonicalField, raw: &str) {
        *self
            .unrecognized
            .entry(field)
            .or_default()
            .entry(raw.trim().to_string())
            .or_default() += 1;
    }

    pub fn record_missing(&mut self, field: CanonicalField, count: usize) {
        if count > 0 {
            *self.missing.entry(field).or_default() += count;
        }
    }

    pub fn unrecognized_count(&self, field: CanonicalField) -> usize {
        self.unrecognized
            .get(&field)
            .map_or(0, |values| values.values().sum())
    }

    pub fn unrecognized_total(&self) -> usize {
        self.unrecognized
            .values()
            .flat_map(BTreeMap::values)
            .sum()
    }

    pub fn has_findings(&self) -> bool {
        !self.unrecognized.is_empty() || !self.missing_sources.is_empty()
    }
}
