//! Evaluates catalogue indicators against declared survey designs.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use survey_design::{Estimate, SurveyDesign, Z_95};
use survey_model::{CanonicalField, ResultRow, ResultTable, Slot, UndefinedReason, WideTable};

use crate::catalogue::{Aggregate, IndicatorSpec, catalogue};
use crate::error::{IndicatorError, Result};
use crate::functional::{fgt_term, gini, weighted_quantile};
use crate::predicate::{Predicate, Truth, Unknown};
use crate::request::IndicatorRequest;

/// Shared flag that stops [`calculate_multi`] from starting further waves.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Long,
    /// One row per indicator, one column per wave.
    Wide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultiWaveTable {
    Long(ResultTable),
    Wide(WideTable),
}

impl MultiWaveTable {
    pub fn into_long(self) -> ResultTable {
        match self {
            MultiWaveTable::Long(table) => table,
            MultiWaveTable::Wide(table) => table.to_long(),
        }
    }
}

/// Settings applied to every indicator of one calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalculationOptions {
    pub include_ci: bool,
    /// Leave single-person households out of the welfare indicators
    /// (poverty, Gini, percentiles), following BPS practice.
    pub exclude_single_person: bool,
}

impl CalculationOptions {
    pub fn new(include_ci: bool) -> Self {
        Self {
            include_ci,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_exclude_single_person(mut self, exclude: bool) -> Self {
        self.exclude_single_person = exclude;
        self
    }
}

/// Computes the requested indicators for one wave.
///
/// Unknown indicator names fail before anything is computed. Indicators that
/// cannot be estimated on this wave yield undefined rows rather than errors.
pub fn calculate(
    design: &SurveyDesign,
    request: &IndicatorRequest,
    include_ci: bool,
) -> Result<ResultTable> {
    calculate_with(design, request, CalculationOptions::new(include_ci))
}

pub fn calculate_with(
    design: &SurveyDesign,
    request: &IndicatorRequest,
    options: CalculationOptions,
) -> Result<ResultTable> {
    let specs = catalogue().resolve(request)?;
    Ok(ResultTable::new(evaluate_wave(design, &specs, options)))
}

/// Computes the requested indicators for several waves in parallel.
///
/// Waves are evaluated independently; rows come back ordered by wave and then
/// by request order.
pub fn calculate_multi(
    designs: &[SurveyDesign],
    request: &IndicatorRequest,
    include_ci: bool,
    layout: Layout,
    cancel: &CancellationToken,
) -> Result<MultiWaveTable> {
    calculate_multi_with(
        designs,
        request,
        CalculationOptions::new(include_ci),
        layout,
        cancel,
    )
}

pub fn calculate_multi_with(
    designs: &[SurveyDesign],
    request: &IndicatorRequest,
    options: CalculationOptions,
    layout: Layout,
    cancel: &CancellationToken,
) -> Result<MultiWaveTable> {
    let specs = catalogue().resolve(request)?;

    let mut seen = BTreeSet::new();
    for design in designs {
        if !seen.insert(design.wave()) {
            return Err(IndicatorError::DuplicateWave {
                wave: design.wave().to_string(),
            });
        }
    }

    let mut ordered: Vec<&SurveyDesign> = designs.iter().collect();
    ordered.sort_by(|a, b| a.wave().cmp(b.wave()));

    let per_wave: Vec<Vec<ResultRow>> = ordered
        .par_iter()
        .map(|design| {
            if cancel.is_cancelled() {
                return Err(IndicatorError::Cancelled);
            }
            Ok(evaluate_wave(design, &specs, options))
        })
        .collect::<Result<_>>()?;

    let table = ResultTable::new(per_wave.into_iter().flatten().collect());
    info!(
        waves = ordered.len(),
        indicators = specs.len(),
        rows = table.len(),
        "multi-wave calculation complete"
    );
    Ok(match layout {
        Layout::Long => MultiWaveTable::Long(table),
        Layout::Wide => MultiWaveTable::Wide(table.to_wide()),
    })
}

fn evaluate_wave(
    design: &SurveyDesign,
    specs: &[&IndicatorSpec],
    options: CalculationOptions,
) -> Vec<ResultRow> {
    let rows: Vec<ResultRow> = specs
        .iter()
        .map(|spec| evaluate(design, spec, options))
        .collect();
    info!(
        wave = %design.wave(),
        records = design.len(),
        defined = rows.iter().filter(|row| row.is_defined()).count(),
        requested = rows.len(),
        "computed indicators"
    );
    rows
}

#[derive(Debug, Default)]
struct Tally {
    sample_size: usize,
    missing: usize,
    unrecognized: usize,
    with_line: usize,
}

impl Tally {
    fn exclude(&mut self, reason: Unknown) {
        match reason {
            Unknown::Missing => self.missing += 1,
            Unknown::Unrecognized => self.unrecognized += 1,
        }
    }
}

/// Per-design-record inputs: the numerator or welfare value, the denominator,
/// and the weight multiplier (zero outside the domain).
struct Scores {
    y: Vec<f64>,
    x: Vec<f64>,
    multiplier: Vec<f64>,
}

fn known<T>(slot: Slot<T>) -> std::result::Result<T, Unknown> {
    match slot {
        Slot::Value(value) => Ok(value),
        Slot::Missing => Err(Unknown::Missing),
        Slot::Unrecognized => Err(Unknown::Unrecognized),
    }
}

/// Household size above one.
fn multi_person_household() -> Predicate {
    Predicate::Above(CanonicalField::HouseholdSize, 1.0)
}

fn evaluate(design: &SurveyDesign, spec: &IndicatorSpec, options: CalculationOptions) -> ResultRow {
    let include_ci = options.include_ci;
    let frame = design.frame();
    let undefined =
        |reason| ResultRow::undefined(spec.name, spec.unit, design.wave().clone(), reason);

    if let Some(field) = spec
        .referenced_fields()
        .into_iter()
        .find(|field| !frame.is_available(*field))
    {
        debug!(indicator = spec.name, wave = %design.wave(), %field, "field not collected");
        return undefined(UndefinedReason::FieldNotCollected);
    }
    let lines = match (spec.needs_poverty_lines(), design.poverty_lines()) {
        (false, _) => None,
        (true, Some(lines)) => Some(lines),
        (true, None) => return undefined(UndefinedReason::NoPovertyLines),
    };

    let eligible = if options.exclude_single_person && spec.is_welfare() {
        Predicate::and([spec.eligible.clone(), multi_person_household()])
    } else {
        spec.eligible.clone()
    };

    let n = design.len();
    let mut tally = Tally::default();
    let mut scores = Scores {
        y: vec![0.0; n],
        x: vec![0.0; n],
        multiplier: vec![0.0; n],
    };

    for (pos, &row) in design.rows().iter().enumerate() {
        match eligible.eval(frame, row) {
            Truth::False => continue,
            Truth::Unknown(reason) => {
                tally.exclude(reason);
                continue;
            }
            Truth::True => {}
        }

        let line = match lines {
            Some(lines) => {
                let province = known(frame.ident(CanonicalField::Province, row)).ok();
                let area = known(frame.code(CanonicalField::UrbanRural, row));
                match lines.lookup(province, area.ok()) {
                    Some(line) => {
                        tally.with_line += 1;
                        Some(line)
                    }
                    // Only an unknown area can leave a record without a line.
                    None => {
                        tally.exclude(area.err().unwrap_or(Unknown::Unrecognized));
                        continue;
                    }
                }
            }
            None => None,
        };

        let multiplier = match spec.population_weight {
            None => Ok(1.0),
            Some(field) => known(frame.number(field, row)).and_then(|size| {
                if size > 0.0 && size.is_finite() {
                    Ok(size)
                } else {
                    Err(Unknown::Unrecognized)
                }
            }),
        };

        let value = multiplier.and_then(|multiplier| {
            let (y, x) = match &spec.aggregate {
                Aggregate::Ratio { numerator } => match numerator.eval(frame, row) {
                    Truth::True => (1.0, 1.0),
                    Truth::False => (0.0, 1.0),
                    Truth::Unknown(reason) => return Err(reason),
                },
                Aggregate::WeightedMean { value } => (known(frame.number(*value, row))?, 1.0),
                Aggregate::Fgt { alpha } => {
                    let welfare = known(frame.number(CanonicalField::PerCapitaExpenditure, row))?;
                    (fgt_term(welfare, line.unwrap_or_default(), *alpha), 1.0)
                }
                Aggregate::Gini | Aggregate::Quantile { .. } | Aggregate::QuantileRatio { .. } => {
                    (known(frame.number(CanonicalField::PerCapitaExpenditure, row))?, 1.0)
                }
            };
            Ok((y, x, multiplier))
        });

        match value {
            Ok((y, x, multiplier)) => {
                tally.sample_size += 1;
                scores.y[pos] = y;
                scores.x[pos] = x;
                scores.multiplier[pos] = multiplier;
            }
            Err(reason) => tally.exclude(reason),
        }
    }

    if tally.sample_size == 0 {
        let reason = if lines.is_some() && tally.with_line == 0 {
            UndefinedReason::NoPovertyLines
        } else {
            UndefinedReason::EmptySubpopulation
        };
        debug!(indicator = spec.name, wave = %design.wave(), reason = reason.as_str(), "undefined");
        return ResultRow {
            excluded_missing: tally.missing,
            excluded_unrecognized: tally.unrecognized,
            ..undefined(reason)
        };
    }

    let estimate = match &spec.aggregate {
        Aggregate::Gini => gini_estimate(design, &scores, include_ci),
        Aggregate::Quantile { p } => {
            quantile_estimate(design, &scores, *p, include_ci).map(|(est, _)| est)
        }
        Aggregate::QuantileRatio { upper, lower } => {
            quantile_ratio_estimate(design, &scores, *upper, *lower, include_ci)
        }
        Aggregate::Ratio { .. } | Aggregate::WeightedMean { .. } | Aggregate::Fgt { .. } => {
            let weighted = |values: &[f64]| -> Vec<f64> {
                values
                    .iter()
                    .zip(&scores.multiplier)
                    .map(|(value, m)| value * m)
                    .collect()
            };
            design.ratio_of(&weighted(&scores.y), &weighted(&scores.x), include_ci)
        }
    };
    let Some(estimate) = estimate.map(|est| est.scaled(spec.scale)) else {
        return ResultRow {
            sample_size: tally.sample_size,
            excluded_missing: tally.missing,
            excluded_unrecognized: tally.unrecognized,
            ..undefined(UndefinedReason::ZeroDenominator)
        };
    };

    let interval = if include_ci { estimate.interval() } else { None };
    debug!(
        indicator = spec.name,
        wave = %design.wave(),
        estimate = estimate.value,
        sample_size = tally.sample_size,
        "estimated"
    );
    ResultRow {
        indicator: spec.name.to_string(),
        unit: spec.unit,
        wave: design.wave().clone(),
        estimate: Some(estimate.value),
        lower_ci: interval.map(|(lower, _)| lower),
        upper_ci: interval.map(|(_, upper)| upper),
        ci_approximate: interval.is_some() && estimate.approximate,
        sample_size: tally.sample_size,
        excluded_missing: tally.missing,
        excluded_unrecognized: tally.unrecognized,
        undefined_reason: None,
    }
}

fn person_weights(design: &SurveyDesign, scores: &Scores) -> Vec<f64> {
    design
        .weights()
        .iter()
        .zip(&scores.multiplier)
        .map(|(w, m)| w * m)
        .collect()
}

fn gini_estimate(design: &SurveyDesign, scores: &Scores, include_ci: bool) -> Option<Estimate> {
    let weights = person_weights(design, scores);
    let result = gini(&scores.y, &weights)?;
    let variance = include_ci.then(|| {
        let linearized: Vec<f64> = weights
            .iter()
            .zip(&result.influence)
            .map(|(w, u)| w * u)
            .collect();
        design.linearized_variance(&linearized)
    });
    Some(Estimate {
        value: result.value,
        variance,
        approximate: design.is_approximate(),
    })
}

/// Weighted quantile with its linearized scores when intervals are requested.
///
/// The scores are `−w_i (1{y_i ≤ q} − p) / (W f̂)`. The density `f̂` comes from
/// the quantile function over the Woodruff span `p ± z·se(F̂(q))`. No scores are
/// produced when that span is flat.
fn quantile_estimate(
    design: &SurveyDesign,
    scores: &Scores,
    p: f64,
    include_ci: bool,
) -> Option<(Estimate, Option<Vec<f64>>)> {
    let weights = person_weights(design, scores);
    let value = weighted_quantile(&scores.y, &weights, p)?;
    let linearized = if include_ci {
        quantile_scores(design, &scores.y, &weights, p, value)
    } else {
        None
    };
    let estimate = Estimate {
        value,
        variance: linearized
            .as_ref()
            .map(|scores| design.linearized_variance(scores)),
        approximate: design.is_approximate(),
    };
    Some((estimate, linearized))
}

fn quantile_scores(
    design: &SurveyDesign,
    values: &[f64],
    weights: &[f64],
    p: f64,
    q: f64,
) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let below: Vec<f64> = values
        .iter()
        .zip(weights)
        .map(|(y, w)| {
            let indicator = if *y <= q { 1.0 } else { 0.0 };
            if *w > 0.0 { w * (indicator - p) / total } else { 0.0 }
        })
        .collect();
    let se = design.linearized_variance(&below).max(0.0).sqrt();
    let half = (Z_95 * se).max(0.01).min(p.min(1.0 - p) / 2.0);
    let span = weighted_quantile(values, weights, p + half)?
        - weighted_quantile(values, weights, p - half)?;
    if span <= 0.0 || !span.is_finite() {
        return None;
    }
    let density = 2.0 * half / span;
    Some(below.iter().map(|score| -score / density).collect())
}

/// `q_upper / q_lower` with scores `(z_upper − R·z_lower) / q_lower`.
fn quantile_ratio_estimate(
    design: &SurveyDesign,
    scores: &Scores,
    upper: f64,
    lower: f64,
    include_ci: bool,
) -> Option<Estimate> {
    let (top, top_scores) = quantile_estimate(design, scores, upper, include_ci)?;
    let (bottom, bottom_scores) = quantile_estimate(design, scores, lower, include_ci)?;
    if bottom.value <= 0.0 {
        return None;
    }
    let ratio = top.value / bottom.value;
    let variance = match (top_scores, bottom_scores) {
        (Some(top_scores), Some(bottom_scores)) => {
            let combined: Vec<f64> = top_scores
                .iter()
                .zip(&bottom_scores)
                .map(|(a, b)| (a - ratio * b) / bottom.value)
                .collect();
            Some(design.linearized_variance(&combined))
        }
        _ => None,
    };
    Some(Estimate {
        value: ratio,
        variance,
        approximate: design.is_approximate(),
    })
}
