//! On-disk TOML shapes of wave and poverty-line files.
//!
//! These structs mirror the files verbatim; [`crate::registry`] validates them
//! and turns them into [`crate::mapping::WaveMapping`] values.

#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::Deserialize;

/// A wave file (`role = "wave"`) or a shared base (`role = "wave_base"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaveFile {
    pub wave: WaveHeader,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaveHeader {
    /// `YYYY-MM`; absent in base files.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub survey: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// File stem of a `wave_base` file to inherit from.
    #[serde(default)]
    pub extends: Option<String>,
    /// File stem of a `poverty_lines` file.
    #[serde(default)]
    pub poverty_lines: Option<String>,
    #[serde(default)]
    pub not_available: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRuleConfig {
    pub source: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub missing_codes: Vec<String>,
    #[serde(default)]
    pub recode: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PovertyLinesFile {
    pub poverty_lines: PovertyLinesHeader,
    pub national: AreaLinesConfig,
    #[serde(default)]
    pub provinces: BTreeMap<String, AreaLinesConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PovertyLinesHeader {
    pub period: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaLinesConfig {
    pub urban: f64,
    pub rural: f64,
}
