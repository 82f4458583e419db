//! Tests for survey-model types.

use survey_model::{
    CanonicalField, CanonicalFrame, ResultRow, ResultTable, Slot, UndefinedReason, Unit, WaveId,
};

fn wave(id: &str) -> WaveId {
    WaveId::parse(id).expect("valid wave id")
}

fn defined(indicator: &str, wave_id: &str, estimate: f64) -> ResultRow {
    ResultRow {
        indicator: indicator.to_string(),
        unit: Unit::Percent,
        wave: wave(wave_id),
        estimate: Some(estimate),
        lower_ci: Some(estimate - 0.5),
        upper_ci: Some(estimate + 0.5),
        ci_approximate: false,
        sample_size: 250,
        excluded_missing: 3,
        excluded_unrecognized: 1,
        undefined_reason: None,
    }
}

#[test]
fn wide_then_long_reproduces_rows() {
    let table = ResultTable::new(vec![
        defined("labor_force_participation_rate", "2024-08", 69.8),
        defined("labor_force_participation_rate", "2025-02", 70.6),
        defined("unemployment_rate", "2024-08", 4.91),
        ResultRow::undefined(
            "unemployment_rate",
            Unit::Percent,
            wave("2025-02"),
            UndefinedReason::ZeroDenominator,
        ),
    ]);

    let wide = table.to_wide();
    assert_eq!(wide.rows.len(), 2);
    assert_eq!(wide.waves, vec![wave("2024-08"), wave("2025-02")]);

    let mut round = wide.to_long().rows;
    let mut original = table.rows.clone();
    let key = |row: &ResultRow| (row.indicator.clone(), row.wave.clone());
    round.sort_by_key(key);
    original.sort_by_key(key);
    assert_eq!(round, original);
}

#[test]
fn result_table_serializes() {
    let table = ResultTable::new(vec![defined("employment_rate", "2025-02", 66.1)]);
    let json = serde_json::to_string(&table).expect("serialize table");
    let round: ResultTable = serde_json::from_str(&json).expect("deserialize table");
    assert_eq!(round, table);
    assert!(json.contains("\"unit\":\"%\""));
    assert!(json.contains("\"wave\":\"2025-02\""));
}

#[test]
fn frame_accessors_return_missing_outside_bounds() {
    let frame = CanonicalFrame::builder(wave("2024-02"), 1)
        .numbers(CanonicalField::Age, vec![Slot::Unrecognized])
        .expect("age column")
        .build();
    assert_eq!(frame.number(CanonicalField::Age, 0), Slot::Unrecognized);
    assert_eq!(frame.number(CanonicalField::Age, 7), Slot::Missing);
    assert_eq!(frame.ident(CanonicalField::Province, 0), Slot::Missing);
}
