//! End-to-end runs over the bundled microdata fixtures.

use std::path::PathBuf;

use survey_cli::pipeline::{
    WaveInput, compare_waves, compute_wave, load_registry, prepare_wave, write_csv, write_json,
};
use survey_indicators::{
    CalculationOptions, IndicatorError, IndicatorRequest, Layout, MultiWaveTable, long_rows,
    wide_rows,
};
use survey_model::{CanonicalField, UndefinedReason, WaveId};
use survey_standards::{WaveRegistry, standards_root};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn registry() -> WaveRegistry {
    let (registry, summary) = load_registry(&standards_root()).unwrap();
    assert!(summary.wave_count >= 5);
    registry
}

fn input(wave: &str, file: &str) -> WaveInput {
    WaveInput {
        wave: WaveId::parse(wave).unwrap(),
        path: fixture(file),
    }
}

fn assert_within(actual: Option<f64>, expected: f64, tolerance: f64) {
    let actual = actual.expect("estimate defined");
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {expected}, got {actual}"
    );
}

fn assert_close(actual: Option<f64>, expected: f64) {
    assert_within(actual, expected, 1e-6);
}

fn with_ci() -> CalculationOptions {
    CalculationOptions::new(true)
}

fn without_ci() -> CalculationOptions {
    CalculationOptions::new(false)
}

#[test]
fn susenas_poverty_and_inequality() {
    let registry = registry();
    let prepared = prepare_wave(&registry, &input("2023-03", "susenas_2023_03.csv")).unwrap();
    assert!(!prepared.design.is_approximate());
    assert_eq!(prepared.report.records, 48);
    assert_eq!(
        prepared
            .report
            .unrecognized_count(CanonicalField::UrbanRural),
        1
    );
    assert!(prepared.report.unmapped_columns.contains(&"URUT".to_string()));

    let request = IndicatorRequest::named([
        "p0",
        "p1",
        "p2",
        "gini",
        "labor_force_participation_rate",
    ]);
    let table = compute_wave(&prepared, &request, with_ci()).unwrap();
    let wave = WaveId::parse("2023-03").unwrap();

    let p0 = table.get("p0", &wave).unwrap();
    assert_close(p0.estimate, 28.620415935825257);
    assert_eq!(p0.sample_size, 46);
    assert_eq!(p0.excluded_missing, 1);
    // Area code 9 and differing urban and rural lines leave one household without a line.
    assert_eq!(p0.excluded_unrecognized, 1);
    assert!(!p0.ci_approximate);
    let (lower, upper) = (p0.lower_ci.unwrap(), p0.upper_ci.unwrap());
    assert!(lower < 28.62 && 28.62 < upper);

    assert_close(table.estimate("p1"), 6.760061290605732);
    assert_close(table.estimate("p2"), 2.1925266430600487);

    let gini = table.get("gini", &wave).unwrap();
    assert_close(gini.estimate, 0.1848569253546577);
    assert_eq!(gini.sample_size, 47);

    let lfpr = table.get("labor_force_participation_rate", &wave).unwrap();
    assert_eq!(lfpr.estimate, None);
    assert_eq!(
        lfpr.undefined_reason,
        Some(UndefinedReason::FieldNotCollected)
    );
}

#[test]
fn susenas_march_2023_reproduces_published_poverty_and_gini() {
    let registry = registry();
    let prepared = prepare_wave(
        &registry,
        &input("2023-03", "susenas_2023_03_reference.csv"),
    )
    .unwrap();
    assert_eq!(prepared.report.records, 40);

    let request = IndicatorRequest::named(["p0", "p1", "p2", "gini"]);
    let table = compute_wave(&prepared, &request, without_ci()).unwrap();
    assert_within(table.estimate("p0"), 9.36, 0.005);
    assert_within(table.estimate("p1"), 1.53, 0.005);
    assert_within(table.estimate("p2"), 0.38, 0.005);
    assert_within(table.estimate("gini"), 0.39, 0.005);
    for row in &table.rows {
        assert_eq!(row.sample_size, 40);
        assert_eq!(row.lower_ci, None);
    }

    // No single-person households here, so the BPS exclusion changes nothing.
    let bps = compute_wave(
        &prepared,
        &request,
        without_ci().with_exclude_single_person(true),
    )
    .unwrap();
    assert_eq!(bps.estimate("p0"), table.estimate("p0"));
    assert_eq!(bps.estimate("gini"), table.estimate("gini"));
}

#[test]
fn sakernas_waves_compare_side_by_side() {
    let registry = registry();
    let inputs = vec![
        input("2025-02", "sakernas_2025_02.csv"),
        input("2024-08", "sakernas_2024_08.csv"),
    ];
    let request =
        IndicatorRequest::named(["labor_force_participation_rate", "unemployment_rate"]);
    let comparison = compare_waves(&registry, &inputs, &request, with_ci(), Layout::Wide).unwrap();
    assert_eq!(comparison.reports.len(), 2);

    let MultiWaveTable::Wide(table) = comparison.table else {
        panic!("expected wide layout");
    };
    let older = WaveId::parse("2024-08").unwrap();
    let newer = WaveId::parse("2025-02").unwrap();
    assert_eq!(table.waves, vec![older.clone(), newer.clone()]);

    let unemployment = table.row("unemployment_rate").unwrap();
    assert_close(unemployment.cell(&older).unwrap().estimate, 10.0);
    assert_close(unemployment.cell(&newer).unwrap().estimate, 6.25);
    assert_close(unemployment.change(), -3.75);

    let lfpr = table.row("labor_force_participation_rate").unwrap();
    let legacy = lfpr.cell(&older).unwrap();
    assert_close(legacy.estimate, 75.0);
    assert_eq!(legacy.excluded_unrecognized, 1);
    assert!(legacy.ci_approximate);
    let current = lfpr.cell(&newer).unwrap();
    assert_close(current.estimate, 80.0);
    assert!(!current.ci_approximate);
}

#[test]
fn results_round_trip_through_files() {
    let registry = registry();
    let inputs = vec![
        input("2024-08", "sakernas_2024_08.csv"),
        input("2025-02", "sakernas_2025_02.csv"),
    ];
    let request = IndicatorRequest::named(["unemployment_rate"]);
    let comparison =
        compare_waves(&registry, &inputs, &request, without_ci(), Layout::Long).unwrap();
    let long = comparison.table.into_long();
    let rows = long_rows(&long);
    assert_eq!(rows.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("results.csv");
    write_csv(&csv_path, &rows).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.get(0), Some("indicator"));
    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get(0), Some("unemployment_rate"));

    let json_path = dir.path().join("results.json");
    write_json(&json_path, &rows).unwrap();
    let text = std::fs::read_to_string(&json_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["wave"], "2024-08");
    assert_eq!(array[1]["estimate"], 6.25);

    let wide = wide_rows(&long.to_wide());
    assert_eq!(wide.len(), 1);
}

#[test]
fn unknown_indicator_fails_before_reading_data() {
    let registry = registry();
    let inputs = vec![input("2024-08", "does_not_exist.csv")];
    let request = IndicatorRequest::named(["poverty_gap_ratio"]);
    let error =
        compare_waves(&registry, &inputs, &request, without_ci(), Layout::Long).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<IndicatorError>(),
        Some(IndicatorError::UnknownIndicator { .. })
    ));
}

#[test]
fn unregistered_wave_is_rejected() {
    let registry = registry();
    let error = prepare_wave(&registry, &input("2019-08", "sakernas_2024_08.csv")).unwrap_err();
    assert!(format!("{error:#}").contains("2019-08"));
}
