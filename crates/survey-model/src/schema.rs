//! Canonical analytic schema shared by every survey wave.
//!
//! The canonical schema is the contract between harmonization and estimation:
//! field names, kinds, and categorical code domains never vary by wave, so an
//! indicator formula written against these fields applies to any wave's data.
//!
//! ## Field kinds
//!
//! - **Number**: parsed as `f64` (age, hours, wage, expenditure)
//! - **Code**: categorical, restricted to a fixed code domain
//! - **Identifier**: opaque text passed through untouched (province, strata, PSU)
//!
//! Design fields (`weight`, `strata`, `psu`, `fpc`) are flagged separately so the
//! harmonizer can guarantee they are passed through without recoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Storage kind of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Number,
    Code,
    Identifier,
}

/// A field of the canonical schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Weight,
    Strata,
    Psu,
    Fpc,
    Province,
    UrbanRural,
    Age,
    Gender,
    Education,
    SchoolAttendance,
    Activity,
    HoursWorked,
    MonthlyWage,
    HouseholdSize,
    PerCapitaExpenditure,
}

const URBAN_RURAL_CODES: &[&str] = &["urban", "rural"];
const GENDER_CODES: &[&str] = &["male", "female"];
const EDUCATION_CODES: &[&str] = &[
    "none",
    "primary_incomplete",
    "primary",
    "junior_high",
    "senior_high",
    "diploma",
    "university",
];
const SCHOOL_ATTENDANCE_CODES: &[&str] = &["attending", "not_attending", "never_attended"];
const ACTIVITY_CODES: &[&str] = &["employed", "unemployed", "not_in_labor_force"];

impl CanonicalField {
    /// All canonical fields in schema order.
    pub const ALL: [CanonicalField; 15] = [
        CanonicalField::Weight,
        CanonicalField::Strata,
        CanonicalField::Psu,
        CanonicalField::Fpc,
        CanonicalField::Province,
        CanonicalField::UrbanRural,
        CanonicalField::Age,
        CanonicalField::Gender,
        CanonicalField::Education,
        CanonicalField::SchoolAttendance,
        CanonicalField::Activity,
        CanonicalField::HoursWorked,
        CanonicalField::MonthlyWage,
        CanonicalField::HouseholdSize,
        CanonicalField::PerCapitaExpenditure,
    ];

    /// Canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Strata => "strata",
            Self::Psu => "psu",
            Self::Fpc => "fpc",
            Self::Province => "province",
            Self::UrbanRural => "urban_rural",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Education => "education",
            Self::SchoolAttendance => "school_attendance",
            Self::Activity => "activity",
            Self::HoursWorked => "hours_worked",
            Self::MonthlyWage => "monthly_wage",
            Self::HouseholdSize => "household_size",
            Self::PerCapitaExpenditure => "per_capita_expenditure",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Weight => "Survey design weight",
            Self::Strata => "Sampling stratum",
            Self::Psu => "Primary sampling unit",
            Self::Fpc => "Finite population correction",
            Self::Province => "Province code",
            Self::UrbanRural => "Urban/rural classification",
            Self::Age => "Age in completed years",
            Self::Gender => "Gender",
            Self::Education => "Highest education level completed",
            Self::SchoolAttendance => "School attendance",
            Self::Activity => "Main activity in the reference week",
            Self::HoursWorked => "Hours worked in the reference week",
            Self::MonthlyWage => "Monthly net wage (Rupiah)",
            Self::HouseholdSize => "Number of household members",
            Self::PerCapitaExpenditure => "Monthly per-capita expenditure (Rupiah)",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Weight
            | Self::Fpc
            | Self::Age
            | Self::HoursWorked
            | Self::MonthlyWage
            | Self::HouseholdSize
            | Self::PerCapitaExpenditure => FieldKind::Number,
            Self::UrbanRural
            | Self::Gender
            | Self::Education
            | Self::SchoolAttendance
            | Self::Activity => FieldKind::Code,
            Self::Strata | Self::Psu | Self::Province => FieldKind::Identifier,
        }
    }

    /// Whether this field carries sampling-design metadata.
    pub fn is_design(self) -> bool {
        matches!(self, Self::Weight | Self::Strata | Self::Psu | Self::Fpc)
    }

    /// Permissible canonical codes (empty for non-categorical fields).
    pub fn codes(self) -> &'static [&'static str] {
        match self {
            Self::UrbanRural => URBAN_RURAL_CODES,
            Self::Gender => GENDER_CODES,
            Self::Education => EDUCATION_CODES,
            Self::SchoolAttendance => SCHOOL_ATTENDANCE_CODES,
            Self::Activity => ACTIVITY_CODES,
            _ => &[],
        }
    }

    /// Resolve a code string to the schema's static code.
    ///
    /// Returns an error when the field is not categorical or the code is outside
    /// its domain.
    pub fn intern_code(self, code: &str) -> Result<&'static str, ModelError> {
        self.codes()
            .iter()
            .copied()
            .find(|known| known.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| ModelError::UnknownCode {
                field: self.as_str().to_string(),
                code: code.to_string(),
            })
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| ModelError::UnknownField {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for field in CanonicalField::ALL {
            assert_eq!(field.as_str().parse::<CanonicalField>().unwrap(), field);
        }
    }

    #[test]
    fn design_fields_are_flagged() {
        let design: Vec<_> = CanonicalField::ALL
            .iter()
            .filter(|f| f.is_design())
            .collect();
        assert_eq!(design.len(), 4);
        assert!(!CanonicalField::Province.is_design());
    }

    #[test]
    fn intern_code_is_case_insensitive_and_domain_checked() {
        assert_eq!(
            CanonicalField::Gender.intern_code("Female").unwrap(),
            "female"
        );
        assert!(CanonicalField::Gender.intern_code("other").is_err());
        assert!(CanonicalField::Age.intern_code("1").is_err());
    }
}
