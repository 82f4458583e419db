use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info_span;

use survey_indicators::{
    IndicatorRequest, Layout, MultiWaveTable, NamedRow, catalogue, long_rows, wide_rows,
};
use survey_standards::{WaveRegistry, standards_root};

use survey_cli::pipeline::{
    WaveInput, compare_waves, compute_wave, install_registry, prepare_wave, write_csv, write_json,
};

use crate::cli::{CompareArgs, ComputeArgs, OutputArgs, WavesArgs};
use crate::summary::{
    print_catalogue, print_findings, print_results, print_wave_fields, print_waves, print_wide,
};

fn load_standards(standards_dir: Option<&PathBuf>) -> Result<&'static WaveRegistry> {
    let root = standards_dir.cloned().unwrap_or_else(standards_root);
    install_registry(&root)
}

pub fn run_waves(args: &WavesArgs, standards_dir: Option<&PathBuf>) -> Result<()> {
    let registry = load_standards(standards_dir)?;
    match &args.wave {
        Some(wave) => {
            let mapping = registry.resolve_str(wave)?;
            print_wave_fields(wave, &mapping.describe());
        }
        None => print_waves(registry),
    }
    Ok(())
}

pub fn run_indicators() {
    print_catalogue(catalogue());
}

pub fn run_compute(args: &ComputeArgs, standards_dir: Option<&PathBuf>) -> Result<()> {
    let span = info_span!("compute", wave = %args.wave);
    let _guard = span.enter();
    let request = IndicatorRequest::parse(&args.output.indicators);
    // Unknown names fail before the microdata is read.
    catalogue().resolve(&request)?;

    let registry = load_standards(standards_dir)?;
    let input = WaveInput {
        wave: registry.resolve_str(&args.wave)?.wave.clone(),
        path: args.input.clone(),
    };
    let prepared = prepare_wave(registry, &input)?;
    print_findings(&prepared.report);

    let table = compute_wave(&prepared, &request, args.output.options())
        .with_context(|| format!("compute wave {}", args.wave))?;
    print_results(&table);

    let rows = long_rows(&table);
    write_outputs(&args.output, &rows)
}

pub fn run_compare(args: &CompareArgs, standards_dir: Option<&PathBuf>) -> Result<()> {
    let span = info_span!("compare", waves = args.inputs.len());
    let _guard = span.enter();
    let request = IndicatorRequest::parse(&args.output.indicators);
    let registry = load_standards(standards_dir)?;
    let layout = if args.wide { Layout::Wide } else { Layout::Long };

    let comparison = compare_waves(
        registry,
        &args.inputs,
        &request,
        args.output.options(),
        layout,
    )?;
    for report in &comparison.reports {
        print_findings(report);
    }
    let rows = match &comparison.table {
        MultiWaveTable::Long(table) => {
            print_results(table);
            long_rows(table)
        }
        MultiWaveTable::Wide(table) => {
            print_wide(table);
            wide_rows(table)
        }
    };
    write_outputs(&args.output, &rows)
}

fn write_outputs(output: &OutputArgs, rows: &[NamedRow]) -> Result<()> {
    if let Some(path) = &output.json {
        write_json(path, rows)?;
        println!("JSON: {}", path.display());
    }
    if let Some(path) = &output.csv {
        write_csv(path, rows)?;
        println!("CSV: {}", path.display());
    }
    Ok(())
}
