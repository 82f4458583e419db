//! Property tests for harmonization.
//!
//! Design metadata must survive harmonization bit-for-bit whatever the rest of
//! the record looks like, so the strategies mix valid, unknown, and blank codes.

use proptest::prelude::*;
use survey_harmonize::harmonize;
use survey_model::{CanonicalField, RawTable, Slot, WaveId};
use survey_standards::{FieldRule, WaveMapping};

fn mapping() -> WaveMapping {
    WaveMapping::new(WaveId::parse("2024-08").unwrap(), "sakernas")
        .map(FieldRule::new(CanonicalField::Weight, "WEIGHT"))
        .map(FieldRule::new(CanonicalField::Strata, "STRATA"))
        .map(FieldRule::new(CanonicalField::Psu, "PSU"))
        .map(
            FieldRule::new(CanonicalField::Gender, "B4K4")
                .with_recode("1", "male")
                .unwrap()
                .with_recode("2", "female")
                .unwrap(),
        )
}

fn record() -> impl Strategy<Value = (f64, String, String, String)> {
    (
        0.001f64..1.0e6,
        "[A-Z0-9]{1,6}",
        "[a-z0-9]{1,8}",
        prop_oneof![Just("1"), Just("2"), Just("3"), Just("")].prop_map(String::from),
    )
}

proptest! {
    #[test]
    fn design_fields_are_never_altered(records in prop::collection::vec(record(), 1..40)) {
        let raw = RawTable::new(
            vec!["WEIGHT".into(), "STRATA".into(), "PSU".into(), "B4K4".into()],
            records
                .iter()
                .map(|(w, s, p, g)| vec![w.to_string(), s.clone(), p.clone(), g.clone()])
                .collect(),
        );
        let out = harmonize(&raw, &mapping()).unwrap();

        for (row, (weight, strata, psu, _)) in records.iter().enumerate() {
            prop_assert_eq!(out.frame.number(CanonicalField::Weight, row), Slot::Value(*weight));
            prop_assert_eq!(out.frame.ident(CanonicalField::Strata, row), Slot::Value(strata.as_str()));
            prop_assert_eq!(out.frame.ident(CanonicalField::Psu, row), Slot::Value(psu.as_str()));
        }
    }

    #[test]
    fn every_record_is_kept_and_unknown_codes_are_counted(records in prop::collection::vec(record(), 0..40)) {
        let raw = RawTable::new(
            vec!["WEIGHT".into(), "STRATA".into(), "PSU".into(), "B4K4".into()],
            records
                .iter()
                .map(|(w, s, p, g)| vec![w.to_string(), s.clone(), p.clone(), g.clone()])
                .collect(),
        );
        let out = harmonize(&raw, &mapping()).unwrap();
        prop_assert_eq!(out.frame.len(), records.len());

        let unknown = records.iter().filter(|(_, _, _, g)| g == "3").count();
        prop_assert_eq!(out.report.unrecognized_count(CanonicalField::Gender), unknown);
    }
}

#[test]
fn report_serializes_with_canonical_names() {
    let raw = RawTable::new(
        vec!["WEIGHT".into(), "B4K4".into()],
        vec![vec!["10".into(), "5".into()]],
    );
    let out = harmonize(&raw, &mapping()).unwrap();
    let json = serde_json::to_value(&out.report).unwrap();
    assert_eq!(json["unrecognized"]["gender"]["5"], 1);
    assert_eq!(json["missing_sources"][0]["field"], "strata");
}
