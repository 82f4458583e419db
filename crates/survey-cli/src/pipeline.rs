//! Ingest → harmonize → declare design → calculate, and result output.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, info_span, warn};

use survey_design::{DesignSpec, SurveyDesign};
use survey_harmonize::{HarmonizationReport, Harmonized, harmonize};
use survey_indicators::{
    CalculationOptions, CancellationToken, IndicatorRequest, Layout, MultiWaveTable, NamedRow,
    calculate_multi_with, calculate_with, catalogue,
};
use survey_ingest::{SourceFormat, read_source};
use survey_model::{CanonicalField, ResultTable, WaveId};
use survey_standards::{StandardsError, VerifySummary, WaveRegistry, install, installed};

/// `WAVE=FILE` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveInput {
    pub wave: WaveId,
    pub path: PathBuf,
}

impl WaveInput {
    pub fn parse(value: &str) -> Result<Self> {
        let Some((wave, path)) = value.split_once('=') else {
            bail!("expected WAVE=FILE, got '{value}'");
        };
        let path = path.trim();
        if path.is_empty() {
            bail!("missing file for wave '{}'", wave.trim());
        }
        Ok(Self {
            wave: WaveId::parse(wave.trim())?,
            path: PathBuf::from(path),
        })
    }
}

/// Fields every registered wave must either map or declare not collected.
pub fn required_fields() -> BTreeSet<CanonicalField> {
    let mut fields = catalogue().required_fields();
    fields.extend([
        CanonicalField::Strata,
        CanonicalField::Psu,
        CanonicalField::Fpc,
    ]);
    fields
}

/// Verify and load the standards directory.
pub fn load_registry(standards_dir: &Path) -> Result<(WaveRegistry, VerifySummary)> {
    WaveRegistry::load(standards_dir, &required_fields())
        .with_context(|| format!("load standards: {}", standards_dir.display()))
}

/// Load the standards once per process and install them globally.
pub fn install_registry(standards_dir: &Path) -> Result<&'static WaveRegistry> {
    if let Some(registry) = installed() {
        return Ok(registry);
    }
    let (registry, summary) = load_registry(standards_dir)?;
    info!(
        standards_dir = %summary.standards_dir.display(),
        waves = summary.wave_count,
        poverty_line_sets = summary.poverty_line_sets,
        "standards loaded"
    );
    match install(registry) {
        Ok(registry) => Ok(registry),
        Err(StandardsError::AlreadyInstalled) => {
            installed().context("standards registry disappeared after install")
        }
        Err(error) => Err(error.into()),
    }
}

/// A harmonized wave with its declared design.
#[derive(Debug)]
pub struct PreparedWave {
    pub design: SurveyDesign,
    pub report: HarmonizationReport,
    pub source: PathBuf,
}

/// Read, harmonize, and bind the design of one wave's microdata.
pub fn prepare_wave(registry: &WaveRegistry, input: &WaveInput) -> Result<PreparedWave> {
    let span = info_span!("wave", wave = %input.wave);
    let _guard = span.enter();
    let start = Instant::now();

    let mapping = registry.resolve(&input.wave)?;
    let format = SourceFormat::from_path(&input.path)?;
    let raw = read_source(&input.path, format)?;
    let Harmonized { frame, report } = harmonize(&raw, mapping)
        .with_context(|| format!("harmonize {}", input.path.display()))?;

    let spec = DesignSpec::from_mapping(mapping);
    let mut design = SurveyDesign::declare(frame, spec)
        .with_context(|| format!("declare design for wave {}", input.wave))?;
    if let Some(lines) = mapping.poverty_lines() {
        design = design.with_poverty_lines(lines.clone());
    }
    if design.is_approximate() {
        warn!(
            wave = %input.wave,
            "no PSU identifier declared; intervals treat records as clusters"
        );
    }
    info!(
        records = design.len(),
        strata = design.strata_count(),
        psus = design.psu_count(),
        duration_ms = start.elapsed().as_millis(),
        "wave prepared"
    );
    Ok(PreparedWave {
        design,
        report,
        source: input.path.clone(),
    })
}

pub fn compute_wave(
    wave: &PreparedWave,
    request: &IndicatorRequest,
    options: CalculationOptions,
) -> Result<ResultTable> {
    Ok(calculate_with(&wave.design, request, options)?)
}

/// Multi-wave results plus the harmonization findings of each wave.
#[derive(Debug)]
pub struct Comparison {
    pub table: MultiWaveTable,
    pub reports: Vec<HarmonizationReport>,
}

pub fn compare_waves(
    registry: &WaveRegistry,
    inputs: &[WaveInput],
    request: &IndicatorRequest,
    options: CalculationOptions,
    layout: Layout,
) -> Result<Comparison> {
    // Resolve names before reading any microdata.
    catalogue().resolve(request)?;
    let mut designs = Vec::with_capacity(inputs.len());
    let mut reports = Vec::with_capacity(inputs.len());
    for input in inputs {
        let prepared = prepare_wave(registry, input)?;
        designs.push(prepared.design);
        reports.push(prepared.report);
    }
    let table = calculate_multi_with(
        &designs,
        request,
        options,
        layout,
        &CancellationToken::new(),
    )?;
    Ok(Comparison { table, reports })
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "wrote JSON");
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[NamedRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    if let Some(first) = rows.first() {
        writer.write_record(first.names())?;
    }
    for row in rows {
        writer.write_record(row.cells().map(ToString::to_string))?;
    }
    writer
        .flush()
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "wrote CSV");
    Ok(())
}
