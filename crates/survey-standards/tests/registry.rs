//! Loading and validating standards directories.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use survey_model::{CanonicalField, WaveId};
use survey_standards::hash::sha256_hex;
use survey_standards::{StandardsError, WaveRegistry, standards_root};
use tempfile::TempDir;

const BASE: &str = r#"
[wave]
survey = "sakernas"
label = "Sakernas (legacy questionnaire)"
not_available = ["strata", "psu", "monthly_wage"]

[fields.weight]
source = "WEIGHT"

[fields.age]
source = "B4K5"

[fields.activity]
source = "B5R1"
recode = { "1" = "employed", "2" = "unemployed", "3" = "not_in_labor_force" }
"#;

const WAVE: &str = r#"
[wave]
id = "2024-08"
extends = "base"
poverty_lines = "2024-03"

[fields.age]
source = "UMUR"
missing_codes = ["99"]
"#;

const LINES: &str = r#"
[poverty_lines]
period = "2024-03"

[national]
urban = 601871.0
rural = 556874.0

[provinces.31]
urban = 825000.0
rural = 825000.0
"#;

struct Fixture {
    dir: TempDir,
    files: Vec<(String, String)>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            files: Vec::new(),
        }
    }

    fn file(mut self, path: &str, role: &str, contents: &str) -> Self {
        write(&self.dir.path().join(path), contents);
        self.files.push((path.to_string(), role.to_string()));
        self
    }

    fn standard() -> Self {
        Self::new()
            .file("waves/base.toml", "wave_base", BASE)
            .file("waves/sakernas-2024-08.toml", "wave", WAVE)
            .file("poverty_lines/2024-03.toml", "poverty_lines", LINES)
    }

    fn write_manifest(self) -> Self {
        let mut manifest = String::from(
            "[manifest]\nschema = \"survey-indicators.standards-manifest\"\nschema_version = 1\n\n[pins]\nstandards = \"test\"\ncatalogue = \"1\"\n",
        );
        for (path, role) in &self.files {
            let sha = sha256_hex(&fs::read(self.dir.path().join(path)).unwrap());
            manifest.push_str(&format!(
                "\n[[files]]\npath = \"{path}\"\nsha256 = \"{sha}\"\nkind = \"toml\"\nrole = \"{role}\"\n"
            ));
        }
        write(&self.dir.path().join("manifest.toml"), &manifest);
        self
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn required() -> BTreeSet<CanonicalField> {
    [
        CanonicalField::Weight,
        CanonicalField::Age,
        CanonicalField::Activity,
        CanonicalField::MonthlyWage,
    ]
    .into_iter()
    .collect()
}

#[test]
fn wave_inherits_base_and_overrides_fields() {
    let fixture = Fixture::standard().write_manifest();
    let (registry, summary) = WaveRegistry::load(fixture.path(), &required()).unwrap();
    assert_eq!(summary.wave_count, 1);
    assert_eq!(summary.base_count, 1);

    let wave = WaveId::parse("2024-08").unwrap();
    let mapping = registry.resolve(&wave).unwrap();
    assert_eq!(mapping.survey, "sakernas");
    assert_eq!(mapping.rule(CanonicalField::Weight).unwrap().source, "WEIGHT");

    let age = mapping.rule(CanonicalField::Age).unwrap();
    assert_eq!(age.source, "UMUR");
    assert!(age.is_missing_code("99"));

    assert_eq!(
        mapping.rule(CanonicalField::Activity).unwrap().recode("2"),
        Some("unemployed")
    );
    assert!(!mapping.is_mapped(CanonicalField::MonthlyWage));

    let lines = mapping.poverty_lines().unwrap();
    assert_eq!(lines.lookup(Some("31"), Some("rural")), Some(825_000.0));
    assert_eq!(lines.lookup(Some("12"), Some("rural")), Some(556_874.0));
}

#[test]
fn checksum_mismatch_is_rejected() {
    let fixture = Fixture::standard().write_manifest();
    write(&fixture.path().join("waves/base.toml"), BASE.replace("B4K5", "AGE").as_str());
    let err = WaveRegistry::load(fixture.path(), &required()).unwrap_err();
    assert!(matches!(err, StandardsError::Sha256Mismatch { .. }), "{err}");
}

#[test]
fn unlisted_file_is_rejected() {
    let fixture = Fixture::standard().write_manifest();
    write(&fixture.path().join("waves/stray.toml"), "[wave]\n");
    let err = WaveRegistry::load(fixture.path(), &required()).unwrap_err();
    assert!(matches!(err, StandardsError::UnexpectedFile { .. }), "{err}");
}

#[test]
fn unresolved_required_field_is_a_configuration_error() {
    let fixture = Fixture::standard().write_manifest();
    let mut required = required();
    required.insert(CanonicalField::HoursWorked);
    let err = WaveRegistry::load(fixture.path(), &required).unwrap_err();
    match err {
        StandardsError::IncompleteMapping { wave, field } => {
            assert_eq!(wave, "2024-08");
            assert_eq!(field, "hours_worked");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_base_is_reported() {
    let fixture = Fixture::new()
        .file("waves/sakernas-2024-08.toml", "wave", WAVE)
        .file("poverty_lines/2024-03.toml", "poverty_lines", LINES)
        .write_manifest();
    let err = WaveRegistry::load(fixture.path(), &required()).unwrap_err();
    assert!(matches!(err, StandardsError::MissingBase { .. }), "{err}");
}

#[test]
fn mapped_and_not_available_in_one_file_conflict() {
    let wave = r#"
[wave]
id = "2024-02"
survey = "sakernas"
not_available = ["age"]

[fields.age]
source = "B4K5"
"#;
    let fixture = Fixture::new()
        .file("waves/sakernas-2024-02.toml", "wave", wave)
        .write_manifest();
    let err = WaveRegistry::load(fixture.path(), &BTreeSet::new()).unwrap_err();
    assert!(matches!(err, StandardsError::Conflict { .. }), "{err}");
}

#[test]
fn recode_target_outside_domain_is_rejected() {
    let wave = r#"
[wave]
id = "2024-02"
survey = "sakernas"

[fields.gender]
source = "B4K4"
recode = { "1" = "male", "2" = "woman" }
"#;
    let fixture = Fixture::new()
        .file("waves/sakernas-2024-02.toml", "wave", wave)
        .write_manifest();
    let err = WaveRegistry::load(fixture.path(), &BTreeSet::new()).unwrap_err();
    match err {
        StandardsError::InvalidCode { field, code, .. } => {
            assert_eq!(field, "gender");
            assert_eq!(code, "woman");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_wave_ids_are_rejected() {
    let wave = "[wave]\nid = \"2024-02\"\nsurvey = \"sakernas\"\n";
    let fixture = Fixture::new()
        .file("waves/a.toml", "wave", wave)
        .file("waves/b.toml", "wave", wave)
        .write_manifest();
    let err = WaveRegistry::load(fixture.path(), &BTreeSet::new()).unwrap_err();
    assert!(matches!(err, StandardsError::DuplicateWave { .. }), "{err}");
}

#[test]
fn unknown_wave_fails_to_resolve() {
    let fixture = Fixture::standard().write_manifest();
    let (registry, _) = WaveRegistry::load(fixture.path(), &required()).unwrap();
    assert!(matches!(
        registry.resolve_str("1999-08"),
        Err(StandardsError::UnknownWave { .. })
    ));
    assert!(matches!(
        registry.resolve_str("not-a-wave"),
        Err(StandardsError::UnknownWave { .. })
    ));
}

#[test]
fn shipped_standards_verify() {
    let required: BTreeSet<CanonicalField> = CanonicalField::ALL.into_iter().collect();
    let (registry, summary) = WaveRegistry::load(&standards_root(), &required).unwrap();
    assert_eq!(summary.base_count, 2);

    let listing: Vec<String> = registry
        .waves()
        .map(|mapping| format!("{} {} {}", mapping.wave, mapping.survey, mapping.label))
        .collect();
    insta::assert_snapshot!(listing.join("\n"), @r"
    2023-03 susenas Susenas March 2023
    2024-02 sakernas Sakernas February 2024
    2024-03 susenas Susenas March 2024
    2024-08 sakernas Sakernas August 2024
    2025-02 sakernas Sakernas February 2025
    ");

    let susenas = registry.resolve_str("2023-03").unwrap();
    assert_eq!(susenas.rule(CanonicalField::Weight).unwrap().source, "WERT");
    assert_eq!(
        susenas.rule(CanonicalField::PerCapitaExpenditure).unwrap().source,
        "KAPITA"
    );
    assert!(susenas.poverty_lines().is_some());

    let sakernas = registry.resolve_str("2025-02").unwrap();
    assert!(sakernas.is_mapped(CanonicalField::Psu));
    assert!(!sakernas.is_mapped(CanonicalField::Education));
}
