//! Binding of canonical records to their sampling design.

use std::collections::BTreeMap;

use serde::Serialize;
use survey_model::{CanonicalField, CanonicalFrame, FieldKind, Slot, WaveId};
use survey_standards::PovertyLines;
use tracing::{info, warn};

use crate::error::{DesignError, Result};
use crate::spec::DesignSpec;

/// Records left out of the design, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DesignExclusions {
    pub missing_weight: usize,
    /// Unparseable, zero, or negative weights.
    pub invalid_weight: usize,
    pub missing_strata: usize,
    pub missing_psu: usize,
}

impl DesignExclusions {
    pub fn total(&self) -> usize {
        self.missing_weight + self.invalid_weight + self.missing_strata + self.missing_psu
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Stratum {
    pub(crate) psu_count: usize,
    /// Sampling fraction `f_h`; zero without FPC.
    pub(crate) sampling_fraction: f64,
}

/// Immutable survey design over one wave's canonical records.
///
/// Only records with a positive weight (and, when declared, a stratum and PSU)
/// belong to the design; indicators see the design rows, never the excluded ones.
#[derive(Debug, Clone)]
pub struct SurveyDesign {
    frame: CanonicalFrame,
    spec: DesignSpec,
    rows: Vec<usize>,
    weights: Vec<f64>,
    strata: Vec<usize>,
    psus: Vec<usize>,
    psu_count: usize,
    stratum_info: Vec<Stratum>,
    exclusions: DesignExclusions,
    poverty_lines: Option<PovertyLines>,
}

impl SurveyDesign {
    pub fn declare(frame: CanonicalFrame, spec: DesignSpec) -> Result<Self> {
        check_field(&frame, spec.weight, FieldKind::Number)?;
        for field in [spec.strata, spec.psu].into_iter().flatten() {
            check_field(&frame, field, FieldKind::Identifier)?;
        }
        if let Some(fpc) = spec.fpc {
            check_field(&frame, fpc, FieldKind::Number)?;
        }

        let mut exclusions = DesignExclusions::default();
        let mut rows = Vec::with_capacity(frame.len());
        let mut weights = Vec::with_capacity(frame.len());
        let mut strata = Vec::with_capacity(frame.len());
        let mut psus = Vec::with_capacity(frame.len());
        let mut stratum_ids: BTreeMap<String, usize> = BTreeMap::new();
        let mut psu_ids: BTreeMap<(usize, String), usize> = BTreeMap::new();
        let mut fpc_values: BTreeMap<usize, f64> = BTreeMap::new();

        for row in 0..frame.len() {
            let weight = match frame.number(spec.weight, row) {
                Slot::Missing => {
                    exclusions.missing_weight += 1;
                    continue;
                }
                Slot::Unrecognized => {
                    exclusions.invalid_weight += 1;
                    continue;
                }
                Slot::Value(w) if w <= 0.0 => {
                    exclusions.invalid_weight += 1;
                    continue;
                }
                Slot::Value(w) => w,
            };

            let stratum_key = match spec.strata {
                Some(field) => match frame.ident(field, row).value() {
                    Some(id) => (*id).to_string(),
                    None => {
                        exclusions.missing_strata += 1;
                        continue;
                    }
                },
                None => String::new(),
            };
            let psu_key = match spec.psu {
                Some(field) => match frame.ident(field, row).value() {
                    Some(id) => Some((*id).to_string()),
                    None => {
                        exclusions.missing_psu += 1;
                        continue;
                    }
                },
                None => None,
            };

            let next_stratum = stratum_ids.len();
            let stratum = *stratum_ids.entry(stratum_key).or_insert(next_stratum);
            // Without a PSU field every record is its own PSU.
            let psu_key = psu_key.unwrap_or_else(|| format!("#{row}"));
            let next_psu = psu_ids.len();
            let psu = *psu_ids.entry((stratum, psu_key)).or_insert(next_psu);

            if let Some(field) = spec.fpc
                && let Slot::Value(value) = frame.number(field, row)
            {
                fpc_values.entry(stratum).or_insert(value);
            }

            rows.push(row);
            weights.push(weight);
            strata.push(stratum);
            psus.push(psu);
        }

        let mut psu_per_stratum = vec![0usize; stratum_ids.len()];
        for (stratum, _) in psu_ids.keys() {
            psu_per_stratum[*stratum] += 1;
        }
        let stratum_info: Vec<Stratum> = psu_per_stratum
            .iter()
            .enumerate()
            .map(|(stratum, &psu_count)| Stratum {
                psu_count,
                sampling_fraction: sampling_fraction(fpc_values.get(&stratum).copied(), psu_count),
            })
            .collect();

        let singletons = stratum_info.iter().filter(|s| s.psu_count < 2).count();
        if spec.psu.is_some() && singletons > 0 {
            warn!(
                wave = %frame.wave(),
                strata = singletons,
                "strata with a single PSU contribute no variance"
            );
        }
        if exclusions.total() > 0 {
            warn!(
                wave = %frame.wave(),
                excluded = exclusions.total(),
                missing_weight = exclusions.missing_weight,
                invalid_weight = exclusions.invalid_weight,
                missing_strata = exclusions.missing_strata,
                missing_psu = exclusions.missing_psu,
                "records excluded from the design"
            );
        }
        info!(
            wave = %frame.wave(),
            records = rows.len(),
            strata = stratum_info.len(),
            psus = psu_ids.len(),
            "declared survey design"
        );

        Ok(Self {
            frame,
            spec,
            rows,
            weights,
            strata,
            psus,
            psu_count: psu_ids.len(),
            stratum_info,
            exclusions,
            poverty_lines: None,
        })
    }

    pub fn with_poverty_lines(mut self, lines: PovertyLines) -> Self {
        self.poverty_lines = Some(lines);
        self
    }

    pub fn frame(&self) -> &CanonicalFrame {
        &self.frame
    }

    pub fn wave(&self) -> &WaveId {
        self.frame.wave()
    }

    pub fn spec(&self) -> &DesignSpec {
        &self.spec
    }

    /// Number of records in the design.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Frame row of each design record.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Design weight of each design record.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn exclusions(&self) -> &DesignExclusions {
        &self.exclusions
    }

    pub fn strata_count(&self) -> usize {
        self.stratum_info.len()
    }

    pub fn psu_count(&self) -> usize {
        self.psu_count
    }

    /// Intervals are approximate when records stand in for PSUs.
    pub fn is_approximate(&self) -> bool {
        self.spec.psu.is_none()
    }

    pub fn poverty_lines(&self) -> Option<&PovertyLines> {
        self.poverty_lines.as_ref()
    }

    pub(crate) fn stratum_of(&self) -> &[usize] {
        &self.strata
    }

    pub(crate) fn psu_of(&self) -> &[usize] {
        &self.psus
    }

    pub(crate) fn strata_info(&self) -> &[Stratum] {
        &self.stratum_info
    }
}

fn check_field(frame: &CanonicalFrame, field: CanonicalField, kind: FieldKind) -> Result<()> {
    if !frame.is_available(field) {
        return Err(DesignError::FieldNotCollected {
            wave: frame.wave().to_string(),
            field: field.as_str().to_string(),
        });
    }
    match (kind, field.kind()) {
        (FieldKind::Number, FieldKind::Number) => Ok(()),
        (FieldKind::Number, _) => Err(DesignError::NotNumeric {
            field: field.as_str().to_string(),
        }),
        (_, FieldKind::Identifier) => Ok(()),
        _ => Err(DesignError::NotIdentifier {
            field: field.as_str().to_string(),
        }),
    }
}

/// `f_h` from an FPC value: a fraction when at most 1, else the population PSU count.
fn sampling_fraction(fpc: Option<f64>, psu_count: usize) -> f64 {
    match fpc {
        Some(value) if value > 1.0 => (psu_count as f64 / value).clamp(0.0, 1.0),
        Some(value) if value >= 0.0 => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(weights: Vec<Slot<f64>>, strata: Vec<Slot<String>>) -> CanonicalFrame {
        let len = weights.len();
        let psus = (0..len).map(|i| Slot::Value(format!("p{}", i % 2))).collect();
        CanonicalFrame::builder(WaveId::parse("2024-03").unwrap(), len)
            .numbers(CanonicalField::Weight, weights)
            .unwrap()
            .idents(CanonicalField::Strata, strata)
            .unwrap()
            .idents(CanonicalField::Psu, psus)
            .unwrap()
            .build()
    }

    #[test]
    fn excluded_records_are_counted_by_reason() {
        let frame = frame(
            vec![
                Slot::Value(10.0),
                Slot::Missing,
                Slot::Value(0.0),
                Slot::Unrecognized,
                Slot::Value(5.0),
            ],
            vec![
                Slot::Value("1".into()),
                Slot::Value("1".into()),
                Slot::Value("1".into()),
                Slot::Value("1".into()),
                Slot::Missing,
            ],
        );
        let design = SurveyDesign::declare(frame, DesignSpec::stratified()).unwrap();
        assert_eq!(design.len(), 1);
        assert_eq!(
            *design.exclusions(),
            DesignExclusions {
                missing_weight: 1,
                invalid_weight: 2,
                missing_strata: 1,
                missing_psu: 0,
            }
        );
    }

    #[test]
    fn declaring_uncollected_field_is_an_error() {
        let frame = CanonicalFrame::builder(WaveId::parse("2024-03").unwrap(), 1)
            .numbers(CanonicalField::Weight, vec![Slot::Value(1.0)])
            .unwrap()
            .build();
        let err = SurveyDesign::declare(frame, DesignSpec::stratified()).unwrap_err();
        assert!(matches!(err, DesignError::FieldNotCollected { .. }));
    }

    #[test]
    fn fpc_values_are_fractions_or_population_counts() {
        assert_eq!(sampling_fraction(Some(0.25), 4), 0.25);
        assert_eq!(sampling_fraction(Some(40.0), 4), 0.1);
        assert_eq!(sampling_fraction(None, 4), 0.0);
    }

    #[test]
    fn psus_are_nested_in_strata() {
        let frame = frame(
            vec![Slot::Value(1.0); 4],
            vec![
                Slot::Value("a".into()),
                Slot::Value("a".into()),
                Slot::Value("b".into()),
                Slot::Value("b".into()),
            ],
        );
        let design = SurveyDesign::declare(frame, DesignSpec::stratified()).unwrap();
        assert_eq!(design.strata_count(), 2);
        assert_eq!(design.psu_count(), 4);
        assert!(!design.is_approximate());
    }
}
