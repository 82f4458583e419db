#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;
use survey_model::{CanonicalField, WaveId};
use tracing::{debug, info};

use crate::config::{AreaLinesConfig, FieldRuleConfig, PovertyLinesFile, WaveFile};
use crate::error::StandardsError;
use crate::hash::sha256_hex;
use crate::manifest::{MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, Manifest, ManifestFile, Pins};
use crate::mapping::{FieldDescription, FieldRule, WaveMapping};
use crate::poverty::{AreaLines, PovertyLines};

const ROLE_WAVE: &str = "wave";
const ROLE_WAVE_BASE: &str = "wave_base";
const ROLE_POVERTY_LINES: &str = "poverty_lines";

const ALLOWED_ROLES: &[&str] = &[ROLE_WAVE, ROLE_WAVE_BASE, ROLE_POVERTY_LINES];
const ALLOWED_KINDS: &[&str] = &["toml"];

static INSTALLED: OnceLock<WaveRegistry> = OnceLock::new();

#[derive(Debug, Clone, Serialize)]
pub struct VerifySummary {
    pub standards_dir: PathBuf,
    pub pins: Pins,
    pub file_count: usize,
    pub wave_count: usize,
    pub base_count: usize,
    pub poverty_line_sets: usize,
}

/// Read-only set of registered wave mappings.
#[derive(Debug, Clone)]
pub struct WaveRegistry {
    pins: Option<Pins>,
    waves: BTreeMap<WaveId, WaveMapping>,
}

impl WaveRegistry {
    /// Verify the manifest under `standards_dir`, load every wave, and check
    /// each one resolves all `required` canonical fields.
    pub fn load(
        standards_dir: &Path,
        required: &BTreeSet<CanonicalField>,
    ) -> Result<(Self, VerifySummary), StandardsError> {
        let manifest = load_manifest(&standards_dir.join("manifest.toml"))?;
        validate_manifest(&manifest, standards_dir)?;

        let mut files = manifest.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        for file in &files {
            verify_file(standards_dir, file)?;
        }

        let mut poverty: BTreeMap<String, PovertyLines> = BTreeMap::new();
        let mut bases: BTreeMap<String, (PathBuf, WaveFile)> = BTreeMap::new();
        let mut wave_files: Vec<(PathBuf, WaveFile)> = Vec::new();

        for file in &files {
            let path = standards_dir.join(&file.path);
            let stem = file_stem(&path);
            match file.role.as_str() {
                ROLE_POVERTY_LINES => {
                    let parsed: PovertyLinesFile = read_toml(&path)?;
                    poverty.insert(stem.clone(), poverty_lines_from_file(&path, stem, parsed)?);
                }
                ROLE_WAVE_BASE => {
                    let parsed: WaveFile = read_toml(&path)?;
                    bases.insert(stem, (path, parsed));
                }
                _ => {
                    let parsed: WaveFile = read_toml(&path)?;
                    wave_files.push((path, parsed));
                }
            }
        }

        let mut mappings = Vec::with_capacity(wave_files.len());
        for (path, file) in &wave_files {
            mappings.push(build_mapping(path, file, &bases, &poverty)?);
        }

        let registry = Self::from_mappings(mappings, required)?;
        let registry = Self {
            pins: Some(manifest.pins.clone()),
            ..registry
        };

        let summary = VerifySummary {
            standards_dir: standards_dir.to_path_buf(),
            pins: manifest.pins,
            file_count: files.len(),
            wave_count: registry.waves.len(),
            base_count: bases.len(),
            poverty_line_sets: poverty.len(),
        };
        info!(
            waves = summary.wave_count,
            files = summary.file_count,
            "standards verified"
        );
        Ok((registry, summary))
    }

    /// Register mappings built in code, with the same validation as [`Self::load`].
    pub fn from_mappings(
        mappings: Vec<WaveMapping>,
        required: &BTreeSet<CanonicalField>,
    ) -> Result<Self, StandardsError> {
        let mut waves = BTreeMap::new();
        for mapping in mappings {
            if let Some(field) = mapping.unresolved(required.iter().copied()).first() {
                return Err(StandardsError::IncompleteMapping {
                    wave: mapping.wave.to_string(),
                    field: field.as_str().to_string(),
                });
            }
            let wave = mapping.wave.clone();
            debug!(wave = %wave, survey = %mapping.survey, "registered wave");
            if waves.insert(wave.clone(), mapping).is_some() {
                return Err(StandardsError::DuplicateWave {
                    wave: wave.to_string(),
                });
            }
        }
        Ok(Self { pins: None, waves })
    }

    pub fn pins(&self) -> Option<&Pins> {
        self.pins.as_ref()
    }

    pub fn resolve(&self, wave: &WaveId) -> Result<&WaveMapping, StandardsError> {
        self.waves
            .get(wave)
            .ok_or_else(|| StandardsError::UnknownWave {
                wave: wave.to_string(),
            })
    }

    /// Resolve a textual wave id; malformed ids are unknown waves.
    pub fn resolve_str(&self, wave: &str) -> Result<&WaveMapping, StandardsError> {
        let id = WaveId::parse(wave).map_err(|_| StandardsError::UnknownWave {
            wave: wave.to_string(),
        })?;
        self.resolve(&id)
    }

    /// Registered waves in chronological order.
    pub fn waves(&self) -> impl Iterator<Item = &WaveMapping> {
        self.waves.values()
    }

    pub fn wave_ids(&self) -> Vec<WaveId> {
        self.waves.keys().cloned().collect()
    }

    pub fn describe(&self, wave: &WaveId) -> Result<Vec<FieldDescription>, StandardsError> {
        Ok(self.resolve(wave)?.describe())
    }

    /// Re-check every wave against a (possibly larger) required field set.
    pub fn validate_required(
        &self,
        required: &BTreeSet<CanonicalField>,
    ) -> Result<(), StandardsError> {
        for mapping in self.waves.values() {
            if let Some(field) = mapping.unresolved(required.iter().copied()).first() {
                return Err(StandardsError::IncompleteMapping {
                    wave: mapping.wave.to_string(),
                    field: field.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Install the process-wide registry. Succeeds once.
pub fn install(registry: WaveRegistry) -> Result<&'static WaveRegistry, StandardsError> {
    INSTALLED
        .set(registry)
        .map_err(|_| StandardsError::AlreadyInstalled)?;
    INSTALLED.get().ok_or(StandardsError::AlreadyInstalled)
}

pub fn installed() -> Option<&'static WaveRegistry> {
    INSTALLED.get()
}

fn build_mapping(
    path: &Path,
    file: &WaveFile,
    bases: &BTreeMap<String, (PathBuf, WaveFile)>,
    poverty: &BTreeMap<String, PovertyLines>,
) -> Result<WaveMapping, StandardsError> {
    let id = file
        .wave
        .id
        .as_deref()
        .ok_or_else(|| StandardsError::MissingWaveId {
            path: path.to_path_buf(),
        })?;
    let wave = WaveId::parse(id).map_err(|source| StandardsError::InvalidWaveId {
        path: path.to_path_buf(),
        source,
    })?;

    check_conflicts(path, file)?;

    let mut fields: BTreeMap<String, FieldRuleConfig> = BTreeMap::new();
    let mut not_available: BTreeSet<String> = BTreeSet::new();
    let mut survey = None;
    let mut label = None;
    let mut lines_name = None;

    if let Some(base_name) = &file.wave.extends {
        let (base_path, base) =
            bases
                .get(base_name)
                .ok_or_else(|| StandardsError::MissingBase {
                    wave: wave.to_string(),
                    base: base_name.clone(),
                })?;
        check_conflicts(base_path, base)?;
        fields.extend(
            base.fields
                .iter()
                .map(|(name, rule)| (normalize_key(name), rule.clone())),
        );
        not_available.extend(base.wave.not_available.iter().map(|f| normalize_key(f)));
        survey = base.wave.survey.clone();
        label = base.wave.label.clone();
        lines_name = base.wave.poverty_lines.clone();
    }

    for (name, rule) in &file.fields {
        let key = normalize_key(name);
        not_available.remove(&key);
        fields.insert(key, rule.clone());
    }
    for name in &file.wave.not_available {
        let key = normalize_key(name);
        fields.remove(&key);
        not_available.insert(key);
    }

    let survey = file.wave.survey.clone().or(survey).unwrap_or_default();
    let label = file.wave.label.clone().or(label).unwrap_or_default();
    let lines_name = file.wave.poverty_lines.clone().or(lines_name);

    let mut mapping = WaveMapping::new(wave.clone(), survey).with_label(label);
    for (name, config) in &fields {
        let field = parse_field(path, name)?;
        mapping = mapping.map(field_rule(&wave, field, config)?);
    }
    for name in &not_available {
        mapping = mapping.not_available(parse_field(path, name)?);
    }

    if let Some(name) = lines_name {
        let lines = poverty
            .get(&name)
            .ok_or_else(|| StandardsError::MissingPovertyLines {
                wave: wave.to_string(),
                name: name.clone(),
            })?;
        mapping = mapping.with_poverty_lines(lines.clone());
    }

    Ok(mapping)
}

fn check_conflicts(path: &Path, file: &WaveFile) -> Result<(), StandardsError> {
    let mapped: BTreeSet<String> = file.fields.keys().map(|f| normalize_key(f)).collect();
    for name in &file.wave.not_available {
        if mapped.contains(&normalize_key(name)) {
            return Err(StandardsError::Conflict {
                path: path.to_path_buf(),
                field: name.clone(),
            });
        }
    }
    Ok(())
}

fn field_rule(
    wave: &WaveId,
    field: CanonicalField,
    config: &FieldRuleConfig,
) -> Result<FieldRule, StandardsError> {
    let mut rule = FieldRule::new(field, config.source.trim())
        .with_missing_codes(config.missing_codes.iter().cloned());
    rule.label = config.label.clone();

    if !config.recode.is_empty() && field.codes().is_empty() {
        return Err(StandardsError::RecodeNotCategorical {
            wave: wave.to_string(),
            field: field.as_str().to_string(),
        });
    }
    for (raw, code) in &config.recode {
        rule = rule
            .with_recode(raw, code)
            .map_err(|_| StandardsError::InvalidCode {
                wave: wave.to_string(),
                field: field.as_str().to_string(),
                code: code.clone(),
            })?;
    }
    Ok(rule)
}

fn parse_field(path: &Path, name: &str) -> Result<CanonicalField, StandardsError> {
    name.parse().map_err(|_| StandardsError::UnknownField {
        path: path.to_path_buf(),
        field: name.to_string(),
    })
}

fn normalize_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn poverty_lines_from_file(
    path: &Path,
    name: String,
    file: PovertyLinesFile,
) -> Result<PovertyLines, StandardsError> {
    let check = |lines: AreaLinesConfig, region: &str| -> Result<AreaLines, StandardsError> {
        for value in [lines.urban, lines.rural] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StandardsError::InvalidPovertyLines {
                    path: path.to_path_buf(),
                    message: format!("{region}: line must be positive, got {value}"),
                });
            }
        }
        Ok(AreaLines {
            urban: lines.urban,
            rural: lines.rural,
        })
    };

    let national = check(file.national, "national")?;
    let mut provinces = BTreeMap::new();
    for (code, lines) in file.provinces {
        let parsed = check(lines, &code)?;
        provinces.insert(code.trim().to_string(), parsed);
    }
    Ok(PovertyLines {
        name,
        period: file.poverty_lines.period,
        national,
        provinces,
    })
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StandardsError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| StandardsError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn load_manifest(path: &Path) -> Result<Manifest, StandardsError> {
    read_toml(path)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn validate_manifest(manifest: &Manifest, standards_dir: &Path) -> Result<(), StandardsError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(StandardsError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(StandardsError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut manifest_paths: BTreeSet<PathBuf> = BTreeSet::new();
    for file in &manifest.files {
        if !ALLOWED_ROLES.contains(&file.role.as_str()) {
            return Err(StandardsError::InvalidManifest {
                message: format!("unsupported role '{}' for {}", file.role, file.path),
            });
        }
        if !ALLOWED_KINDS.contains(&file.kind.as_str()) {
            return Err(StandardsError::InvalidManifest {
                message: format!("unsupported kind '{}' for {}", file.kind, file.path),
            });
        }

        validate_sha(&file.sha256, &file.path)?;

        let path = normalize_path(&validate_path(&file.path)?);
        if !manifest_paths.insert(path.clone()) {
            return Err(StandardsError::DuplicatePath { path });
        }
    }

    for path in list_files_under(standards_dir)? {
        if path == Path::new("manifest.toml") {
            continue;
        }
        if !manifest_paths.contains(&normalize_path(&path)) {
            return Err(StandardsError::UnexpectedFile {
                path: standards_dir.join(path),
            });
        }
    }

    Ok(())
}

fn verify_file(standards_dir: &Path, file: &ManifestFile) -> Result<(), StandardsError> {
    let full_path = standards_dir.join(&file.path);
    let bytes = std::fs::read(&full_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StandardsError::MissingFile {
                path: full_path.clone(),
            }
        } else {
            StandardsError::io(full_path.clone(), e)
        }
    })?;

    let actual = sha256_hex(&bytes);
    let expected = file.sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(StandardsError::Sha256Mismatch {
            path: full_path,
            expected,
            actual,
        });
    }
    Ok(())
}

fn validate_sha(sha: &str, path: &str) -> Result<(), StandardsError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StandardsError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<PathBuf, StandardsError> {
    if path.contains('\\') {
        return Err(StandardsError::InvalidPath {
            path: PathBuf::from(path),
            message: "manifest path must use '/' separators".to_string(),
        });
    }

    let p = PathBuf::from(path);
    if p.is_absolute() {
        return Err(StandardsError::InvalidPath {
            path: p,
            message: "manifest path must be relative".to_string(),
        });
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(StandardsError::InvalidPath {
            path: p,
            message: "manifest path must not traverse out of standards/".to_string(),
        });
    }
    Ok(p)
}

fn list_files_under(root: &Path) -> Result<BTreeSet<PathBuf>, StandardsError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = BTreeSet::new();

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| StandardsError::io(&dir, e))? {
            let entry = entry.map_err(|e| StandardsError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| StandardsError::InvalidPath {
                        path: path.clone(),
                        message: format!("failed to relativize path: {e}"),
                    })?
                    .to_path_buf();
                files.insert(rel);
            }
        }
    }

    Ok(files)
}

fn normalize_path(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        if !matches!(c, Component::CurDir) {
            out.push(c.as_os_str());
        }
    }
    out
}
