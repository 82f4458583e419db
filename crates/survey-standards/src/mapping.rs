//! Validated per-wave mappings from raw fields to the canonical schema.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use survey_model::{CanonicalField, ModelError, WaveId};

use crate::poverty::PovertyLines;

/// How one raw column becomes one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRule {
    pub field: CanonicalField,
    /// Raw column name, matched case-insensitively.
    pub source: String,
    pub label: Option<String>,
    /// Raw values treated as missing.
    pub missing_codes: Vec<String>,
    /// Raw code to canonical code. Empty for non-categorical fields.
    pub recode: BTreeMap<String, &'static str>,
}

impl FieldRule {
    pub fn new(field: CanonicalField, source: impl Into<String>) -> Self {
        Self {
            field,
            source: source.into(),
            label: None,
            missing_codes: Vec::new(),
            recode: BTreeMap::new(),
        }
    }

    pub fn with_missing_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_codes
            .extend(codes.into_iter().map(|code| code.into().trim().to_string()));
        self
    }

    /// Add a recode entry; `code` must belong to the field's code domain.
    pub fn with_recode(mut self, raw: &str, code: &str) -> Result<Self, ModelError> {
        let canonical = self.field.intern_code(code)?;
        self.recode.insert(raw.trim().to_string(), canonical);
        Ok(self)
    }

    pub fn is_missing_code(&self, raw: &str) -> bool {
        let raw = raw.trim();
        self.missing_codes.iter().any(|code| code == raw)
    }

    pub fn recode(&self, raw: &str) -> Option<&'static str> {
        self.recode.get(raw.trim()).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldResolution {
    Mapped(FieldRule),
    NotAvailable,
}

/// Everything needed to harmonize one wave.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveMapping {
    pub wave: WaveId,
    pub survey: String,
    pub label: String,
    fields: BTreeMap<CanonicalField, FieldResolution>,
    poverty_lines: Option<PovertyLines>,
}

impl WaveMapping {
    pub fn new(wave: WaveId, survey: impl Into<String>) -> Self {
        Self {
            wave,
            survey: survey.into(),
            label: String::new(),
            fields: BTreeMap::new(),
            poverty_lines: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn map(mut self, rule: FieldRule) -> Self {
        self.fields
            .insert(rule.field, FieldResolution::Mapped(rule));
        self
    }

    pub fn not_available(mut self, field: CanonicalField) -> Self {
        self.fields.insert(field, FieldResolution::NotAvailable);
        self
    }

    pub fn with_poverty_lines(mut self, lines: PovertyLines) -> Self {
        self.poverty_lines = Some(lines);
        self
    }

    pub fn resolution(&self, field: CanonicalField) -> Option<&FieldResolution> {
        self.fields.get(&field)
    }

    pub fn rule(&self, field: CanonicalField) -> Option<&FieldRule> {
        match self.fields.get(&field) {
            Some(FieldResolution::Mapped(rule)) => Some(rule),
            _ => None,
        }
    }

    /// Mapped rules in canonical field order.
    pub fn rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.fields.values().filter_map(|resolution| match resolution {
            FieldResolution::Mapped(rule) => Some(rule),
            FieldResolution::NotAvailable => None,
        })
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.rule(field).is_some()
    }

    pub fn not_available_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.fields
            .iter()
            .filter(|(_, resolution)| matches!(resolution, FieldResolution::NotAvailable))
            .map(|(field, _)| *field)
    }

    /// Required fields with neither a rule nor a not-available marker.
    pub fn unresolved(
        &self,
        required: impl IntoIterator<Item = CanonicalField>,
    ) -> Vec<CanonicalField> {
        required
            .into_iter()
            .filter(|field| !self.fields.contains_key(field))
            .collect()
    }

    pub fn poverty_lines(&self) -> Option<&PovertyLines> {
        self.poverty_lines.as_ref()
    }

    /// Raw column names read by this mapping, lowercased.
    pub fn source_columns(&self) -> BTreeSet<String> {
        self.rules()
            .map(|rule| rule.source.trim().to_ascii_lowercase())
            .collect()
    }
}

/// One line of `svyind waves --describe`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescription {
    pub field: CanonicalField,
    pub label: String,
    pub source: Option<String>,
    pub missing_codes: Vec<String>,
    pub recode_count: usize,
    pub available: bool,
}

impl WaveMapping {
    pub fn describe(&self) -> Vec<FieldDescription> {
        CanonicalField::ALL
            .iter()
            .map(|field| {
                let rule = self.rule(*field);
                FieldDescription {
                    field: *field,
                    label: rule
                        .and_then(|rule| rule.label.clone())
                        .unwrap_or_else(|| field.label().to_string()),
                    source: rule.map(|rule| rule.source.clone()),
                    missing_codes: rule
                        .map(|rule| rule.missing_codes.clone())
                        .unwrap_or_default(),
                    recode_count: rule.map_or(0, |rule| rule.recode.len()),
                    available: rule.is_some(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recode_targets_are_domain_checked() {
        let rule = FieldRule::new(CanonicalField::Gender, "B4K4")
            .with_recode("1", "male")
            .unwrap();
        assert_eq!(rule.recode(" 1 "), Some("male"));
        assert!(
            FieldRule::new(CanonicalField::Gender, "B4K4")
                .with_recode("3", "other")
                .is_err()
        );
    }

    #[test]
    fn unresolved_lists_fields_without_any_marker() {
        let mapping = WaveMapping::new(WaveId::parse("2024-02").unwrap(), "sakernas")
            .map(FieldRule::new(CanonicalField::Weight, "WEIGHT"))
            .not_available(CanonicalField::MonthlyWage);
        let missing = mapping.unresolved([
            CanonicalField::Weight,
            CanonicalField::MonthlyWage,
            CanonicalField::Age,
        ]);
        assert_eq!(missing, vec![CanonicalField::Age]);
    }

    #[test]
    fn source_columns_are_lowercased() {
        let mapping = WaveMapping::new(WaveId::parse("2025-02").unwrap(), "sakernas")
            .map(FieldRule::new(CanonicalField::Age, "DEM_AGE"));
        assert!(mapping.source_columns().contains("dem_age"));
    }
}
