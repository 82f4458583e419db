use survey_model::{
    CanonicalColumn, CanonicalField, CanonicalFrame, FieldKind, ModelError, RawTable, Slot,
};
use survey_standards::{FieldRule, WaveMapping};
use tracing::{debug, info, warn};

use crate::report::{HarmonizationReport, MissingSource};
use crate::resolve::{resolve_code, resolve_ident, resolve_number};

#[derive(Debug, thiserror::Error)]
pub enum HarmonizeError {
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Canonical records of one wave plus what went wrong producing them.
#[derive(Debug, Clone)]
pub struct Harmonized {
    pub frame: CanonicalFrame,
    pub report: HarmonizationReport,
}

/// Apply `mapping` to raw records.
///
/// Mapped fields are renamed and recoded, fields the wave does not collect are
/// filled with `Missing`, and design fields are carried without recoding.
/// Unknown raw codes become `Unrecognized` and are counted in the report.
pub fn harmonize(raw: &RawTable, mapping: &WaveMapping) -> Result<Harmonized, HarmonizeError> {
    let len = raw.len();
    let mut report = HarmonizationReport::new(mapping.wave.clone(), len);
    let mut builder = CanonicalFrame::builder(mapping.wave.clone(), len);

    for field in CanonicalField::ALL {
        let Some(rule) = mapping.rule(field) else {
            builder = builder.unavailable(field);
            report.not_available.push(field);
            continue;
        };
        let Some(index) = raw.column_index(&rule.source) else {
            warn!(
                wave = %mapping.wave,
                field = field.as_str(),
                source = %rule.source,
                "mapped source column is absent"
            );
            report.missing_sources.push(MissingSource {
                field,
                source: rule.source.clone(),
            });
            report.record_missing(field, len);
            builder = builder.column(field, CanonicalColumn::missing(field.kind(), len))?;
            continue;
        };
        let column = build_column(raw, index, rule, &mut report);
        builder = builder.column(field, column)?;
    }

    let sources = mapping.source_columns();
    report.unmapped_columns = raw
        .headers
        .iter()
        .filter(|header| !sources.contains(&header.trim().to_ascii_lowercase()))
        .cloned()
        .collect();
    if !report.unmapped_columns.is_empty() {
        debug!(
            wave = %mapping.wave,
            columns = report.unmapped_columns.len(),
            "raw columns not used by the mapping"
        );
    }

    for (field, values) in &report.unrecognized {
        let total: usize = values.values().sum();
        let sample: Vec<&str> = values.keys().take(5).map(String::as_str).collect();
        warn!(
            wave = %mapping.wave,
            field = field.as_str(),
            count = total,
            values = ?sample,
            "unrecognized raw values"
        );
    }

    info!(
        wave = %mapping.wave,
        records = len,
        unrecognized = report.unrecognized_total(),
        "harmonized wave"
    );
    Ok(Harmonized {
        frame: builder.build(),
        report,
    })
}

fn build_column(
    raw: &RawTable,
    index: usize,
    rule: &FieldRule,
    report: &mut HarmonizationReport,
) -> CanonicalColumn {
    let field = rule.field;
    let mut missing = 0usize;
    let mut track = |slot_missing: bool, slot_unrecognized: bool, value: &str| {
        if slot_missing {
            missing += 1;
        } else if slot_unrecognized {
            report.record_unrecognized(field, value);
        }
    };

    let column = match field.kind() {
        FieldKind::Number => CanonicalColumn::Number(
            raw.column_values(index)
                .map(|value| {
                    let slot = resolve_number(rule, value);
                    track(slot.is_missing(), slot.is_unrecognized(), value);
                    slot
                })
                .collect(),
        ),
        FieldKind::Code => CanonicalColumn::Code(
            raw.column_values(index)
                .map(|value| {
                    let slot = resolve_code(rule, value);
                    track(slot.is_missing(), slot.is_unrecognized(), value);
                    slot
                })
                .collect(),
        ),
        FieldKind::Identifier => CanonicalColumn::Ident(
            raw.column_values(index)
                .map(|value| {
                    let slot: Slot<String> = resolve_ident(rule, value);
                    track(slot.is_missing(), false, value);
                    slot
                })
                .collect(),
        ),
    };
    report.record_missing(field, missing);
    column
}
