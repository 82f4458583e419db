//! Built-in indicator definitions.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::OnceLock;

use survey_model::{CanonicalField, Unit};

use crate::error::{IndicatorError, Result};
use crate::predicate::Predicate;
use crate::request::IndicatorRequest;

/// Age from which a person counts as working age.
pub const WORKING_AGE: f64 = 15.0;
/// Weekly hours below which an employed person is underemployed.
pub const UNDEREMPLOYMENT_HOURS: f64 = 35.0;

const IN_LABOR_FORCE: &[&str] = &["employed", "unemployed"];
const EMPLOYED: &[&str] = &["employed"];
const UNEMPLOYED: &[&str] = &["unemployed"];
const ATTENDING: &[&str] = &["attending"];
const FEMALE: &[&str] = &["female"];

/// How eligible records are reduced to one number.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// Weighted share of eligible records satisfying `numerator`.
    Ratio { numerator: Predicate },
    /// Weighted mean of a numeric field.
    WeightedMean { value: CanonicalField },
    /// Foster-Greer-Thorbecke poverty measure of per-capita expenditure.
    Fgt { alpha: u8 },
    /// Gini coefficient of per-capita expenditure.
    Gini,
    /// Weighted `p`-quantile of per-capita expenditure.
    Quantile { p: f64 },
    /// Ratio of two weighted quantiles of per-capita expenditure.
    QuantileRatio { upper: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    /// Multiplier applied to the estimate and its interval.
    pub scale: f64,
    /// Subpopulation the indicator is computed over.
    pub eligible: Predicate,
    pub aggregate: Aggregate,
    /// Multiplies the design weight per record (household to person weights).
    pub population_weight: Option<CanonicalField>,
}

impl IndicatorSpec {
    /// Fields whose absence from a wave leaves the indicator undefined.
    pub fn referenced_fields(&self) -> BTreeSet<CanonicalField> {
        let mut fields = self.eligible.fields();
        match &self.aggregate {
            Aggregate::Ratio { numerator } => fields.extend(numerator.fields()),
            Aggregate::WeightedMean { value } => {
                fields.insert(*value);
            }
            Aggregate::Fgt { .. }
            | Aggregate::Gini
            | Aggregate::Quantile { .. }
            | Aggregate::QuantileRatio { .. } => {
                fields.insert(CanonicalField::PerCapitaExpenditure);
            }
        }
        fields.extend(self.population_weight);
        fields
    }

    /// Referenced fields plus the optional poverty-line lookup keys.
    pub fn required_fields(&self) -> BTreeSet<CanonicalField> {
        let mut fields = self.referenced_fields();
        if matches!(self.aggregate, Aggregate::Fgt { .. }) {
            fields.insert(CanonicalField::Province);
            fields.insert(CanonicalField::UrbanRural);
        }
        fields
    }

    pub fn needs_poverty_lines(&self) -> bool {
        matches!(self.aggregate, Aggregate::Fgt { .. })
    }

    /// Computed from household per-capita expenditure.
    pub fn is_welfare(&self) -> bool {
        matches!(
            self.aggregate,
            Aggregate::Fgt { .. }
                | Aggregate::Gini
                | Aggregate::Quantile { .. }
                | Aggregate::QuantileRatio { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Catalogue {
    specs: Vec<IndicatorSpec>,
}

impl Catalogue {
    pub fn builtin() -> Self {
        let working_age = || Predicate::AtLeast(CanonicalField::Age, WORKING_AGE);
        let in_labor_force = || Predicate::CodeIn(CanonicalField::Activity, IN_LABOR_FORCE);
        let employed = || Predicate::CodeIn(CanonicalField::Activity, EMPLOYED);
        let fgt = |name, label, alpha| IndicatorSpec {
            name,
            label,
            unit: Unit::Index,
            scale: 100.0,
            eligible: Predicate::All,
            aggregate: Aggregate::Fgt { alpha },
            population_weight: Some(CanonicalField::HouseholdSize),
        };
        let percentile_ratio = |name, label, upper, lower| IndicatorSpec {
            name,
            label,
            unit: Unit::Index,
            scale: 1.0,
            eligible: Predicate::All,
            aggregate: Aggregate::QuantileRatio { upper, lower },
            population_weight: Some(CanonicalField::HouseholdSize),
        };

        let specs = vec![
            IndicatorSpec {
                name: "labor_force_participation_rate",
                label: "Labor force participation rate",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: working_age(),
                aggregate: Aggregate::Ratio {
                    numerator: in_labor_force(),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "employment_rate",
                label: "Employment-to-population ratio",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: working_age(),
                aggregate: Aggregate::Ratio {
                    numerator: employed(),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "unemployment_rate",
                label: "Open unemployment rate",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: Predicate::and([working_age(), in_labor_force()]),
                aggregate: Aggregate::Ratio {
                    numerator: Predicate::CodeIn(CanonicalField::Activity, UNEMPLOYED),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "underemployment_rate",
                label: "Time-related underemployment rate",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: Predicate::and([working_age(), employed()]),
                aggregate: Aggregate::Ratio {
                    numerator: Predicate::Below(
                        CanonicalField::HoursWorked,
                        UNDEREMPLOYMENT_HOURS,
                    ),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "female_labor_force_participation_rate",
                label: "Female labor force participation rate",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: Predicate::and([
                    working_age(),
                    Predicate::CodeIn(CanonicalField::Gender, FEMALE),
                ]),
                aggregate: Aggregate::Ratio {
                    numerator: in_labor_force(),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "neet_rate",
                label: "Youth not in employment, education or training",
                unit: Unit::Percent,
                scale: 100.0,
                eligible: Predicate::Between(CanonicalField::Age, WORKING_AGE, 25.0),
                aggregate: Aggregate::Ratio {
                    numerator: Predicate::and([
                        employed().negate(),
                        Predicate::CodeIn(CanonicalField::SchoolAttendance, ATTENDING).negate(),
                    ]),
                },
                population_weight: None,
            },
            IndicatorSpec {
                name: "average_wage",
                label: "Average monthly net wage of employees",
                unit: Unit::MillionRupiah,
                scale: 1e-6,
                eligible: Predicate::and([
                    working_age(),
                    employed(),
                    Predicate::Above(CanonicalField::MonthlyWage, 0.0),
                ]),
                aggregate: Aggregate::WeightedMean {
                    value: CanonicalField::MonthlyWage,
                },
                population_weight: None,
            },
            fgt("p0", "Poverty headcount ratio", 0),
            fgt("p1", "Poverty gap index", 1),
            fgt("p2", "Poverty severity index", 2),
            IndicatorSpec {
                name: "gini",
                label: "Gini ratio of per-capita expenditure",
                unit: Unit::Index,
                scale: 1.0,
                eligible: Predicate::All,
                aggregate: Aggregate::Gini,
                population_weight: Some(CanonicalField::HouseholdSize),
            },
            IndicatorSpec {
                name: "median_expenditure",
                label: "Median monthly per-capita expenditure",
                unit: Unit::MillionRupiah,
                scale: 1e-6,
                eligible: Predicate::All,
                aggregate: Aggregate::Quantile { p: 0.5 },
                population_weight: Some(CanonicalField::HouseholdSize),
            },
            percentile_ratio("p90_p10", "Expenditure ratio of 90th to 10th percentile", 0.9, 0.1),
            percentile_ratio("p80_p20", "Expenditure ratio of 80th to 20th percentile", 0.8, 0.2),
            percentile_ratio("p90_p50", "Expenditure ratio of 90th percentile to median", 0.9, 0.5),
            percentile_ratio("p50_p10", "Expenditure ratio of median to 10th percentile", 0.5, 0.1),
        ];
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorSpec> {
        let name = name.trim();
        self.specs
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolves a request into catalogue entries, rejecting unknown names
    /// before any computation starts. Duplicates are dropped.
    pub fn resolve(&self, request: &IndicatorRequest) -> Result<Vec<&IndicatorSpec>> {
        match request {
            IndicatorRequest::All => Ok(self.specs.iter().collect()),
            IndicatorRequest::Named(names) => {
                if names.is_empty() {
                    return Err(IndicatorError::EmptyRequest);
                }
                let mut resolved: Vec<&IndicatorSpec> = Vec::with_capacity(names.len());
                for name in names {
                    let spec = self
                        .get(name)
                        .ok_or_else(|| IndicatorError::UnknownIndicator { name: name.clone() })?;
                    if !resolved.iter().any(|seen| seen.name == spec.name) {
                        resolved.push(spec);
                    }
                }
                Ok(resolved)
            }
        }
    }

    /// Union of the fields every indicator reads, plus the weight.
    pub fn required_fields(&self) -> BTreeSet<CanonicalField> {
        let mut fields = BTreeSet::from([CanonicalField::Weight]);
        for spec in &self.specs {
            fields.extend(spec.required_fields());
        }
        fields
    }

    /// Plain-text listing, one indicator per line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for spec in &self.specs {
            let unit = match spec.unit.as_str() {
                "" => "-",
                unit => unit,
            };
            let _ = writeln!(
                out,
                "{:<38} {:<5} {} | {}",
                spec.name, unit, spec.label, spec.eligible
            );
        }
        out
    }
}

static CATALOGUE: OnceLock<Catalogue> = OnceLock::new();

/// The shared built-in catalogue.
pub fn catalogue() -> &'static Catalogue {
    CATALOGUE.get_or_init(Catalogue::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively_and_dedupe() {
        let request = IndicatorRequest::named([
            "LABOR_FORCE_PARTICIPATION_RATE",
            "gini",
            "labor_force_participation_rate",
        ]);
        let specs = catalogue().resolve(&request).unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name).collect();
        assert_eq!(names, ["labor_force_participation_rate", "gini"]);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let request = IndicatorRequest::named(["employment_rate", "hdi"]);
        let err = catalogue().resolve(&request).unwrap_err();
        assert!(matches!(err, IndicatorError::UnknownIndicator { ref name } if name == "hdi"));
    }

    #[test]
    fn poverty_measures_use_person_weights() {
        for name in ["p0", "p1", "p2", "gini", "median_expenditure", "p90_p10"] {
            let spec = catalogue().get(name).unwrap();
            assert_eq!(spec.population_weight, Some(CanonicalField::HouseholdSize));
            assert!(spec.referenced_fields().contains(&CanonicalField::PerCapitaExpenditure));
            assert!(spec.is_welfare());
        }
        assert!(!catalogue().get("neet_rate").unwrap().is_welfare());
        assert!(catalogue().get("p1").unwrap().needs_poverty_lines());
        assert!(!catalogue().get("gini").unwrap().needs_poverty_lines());
    }

    #[test]
    fn required_fields_cover_labor_and_welfare() {
        let fields = catalogue().required_fields();
        assert!(fields.contains(&CanonicalField::Weight));
        assert!(fields.contains(&CanonicalField::HoursWorked));
        assert!(fields.contains(&CanonicalField::Province));
        assert!(!fields.contains(&CanonicalField::Education));
        assert!(!fields.contains(&CanonicalField::Strata));
    }
}
