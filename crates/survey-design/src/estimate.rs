//! Weighted estimators and Taylor linearization variance.
//!
//! Every estimator reduces to a vector of per-record linearized scores `z_i`.
//! Scores are summed to PSU totals `t_hj`, and the design variance is
//!
//! ```text
//! V = Σ_h (1 − f_h) · n_h / (n_h − 1) · Σ_j (t_hj − t̄_h)²
//! ```
//!
//! where `n_h` is the number of PSUs in stratum `h`. Strata with fewer than two
//! PSUs contribute nothing. Domain estimators zero the scores of records outside
//! the domain but keep the full design's PSU structure.

use serde::Serialize;

use crate::design::SurveyDesign;

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959963984540054;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub value: f64,
    /// Design variance, when requested.
    pub variance: Option<f64>,
    /// Records stood in for PSUs.
    pub approximate: bool,
}

impl Estimate {
    pub fn point(value: f64) -> Self {
        Self {
            value,
            variance: None,
            approximate: false,
        }
    }

    pub fn standard_error(&self) -> Option<f64> {
        self.variance.map(|v| v.max(0.0).sqrt())
    }

    /// 95% normal interval.
    pub fn interval(&self) -> Option<(f64, f64)> {
        let se = self.standard_error()?;
        Some((self.value - Z_95 * se, self.value + Z_95 * se))
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            variance: self.variance.map(|v| v * factor * factor),
            approximate: self.approximate,
        }
    }
}

impl SurveyDesign {
    /// Σ weight·value over design records; `value_fn` receives the frame row.
    pub fn weighted_total(&self, value_fn: impl Fn(usize) -> f64, with_variance: bool) -> Estimate {
        let values: Vec<f64> = self.rows().iter().map(|&row| value_fn(row)).collect();
        self.total_of(&values, with_variance)
    }

    /// Ratio of two weighted totals; `None` when the denominator total is zero.
    pub fn weighted_ratio(
        &self,
        numerator_fn: impl Fn(usize) -> f64,
        denominator_fn: impl Fn(usize) -> f64,
        with_variance: bool,
    ) -> Option<Estimate> {
        let numerator: Vec<f64> = self.rows().iter().map(|&row| numerator_fn(row)).collect();
        let denominator: Vec<f64> = self.rows().iter().map(|&row| denominator_fn(row)).collect();
        self.ratio_of(&numerator, &denominator, with_variance)
    }

    /// Weighted total of values aligned with the design records.
    pub fn total_of(&self, values: &[f64], with_variance: bool) -> Estimate {
        let weights = self.weights();
        let total = weights.iter().zip(values).map(|(w, y)| w * y).sum();
        let variance = with_variance.then(|| {
            let scores: Vec<f64> = weights.iter().zip(values).map(|(w, y)| w * y).collect();
            self.linearized_variance(&scores)
        });
        Estimate {
            value: total,
            variance,
            approximate: self.is_approximate(),
        }
    }

    /// Ratio estimator `R = Y / X` with scores `z_i = w_i (y_i − R x_i) / X`.
    pub fn ratio_of(
        &self,
        numerator: &[f64],
        denominator: &[f64],
        with_variance: bool,
    ) -> Option<Estimate> {
        let weights = self.weights();
        let y: f64 = weights.iter().zip(numerator).map(|(w, y)| w * y).sum();
        let x: f64 = weights.iter().zip(denominator).map(|(w, x)| w * x).sum();
        if x == 0.0 || !x.is_finite() {
            return None;
        }
        let ratio = y / x;
        let variance = with_variance.then(|| {
            let scores: Vec<f64> = weights
                .iter()
                .zip(numerator.iter().zip(denominator))
                .map(|(w, (y, xi))| w * (y - ratio * xi) / x)
                .collect();
            self.linearized_variance(&scores)
        });
        Some(Estimate {
            value: ratio,
            variance,
            approximate: self.is_approximate(),
        })
    }

    /// Between-PSU variance of the total of `scores` (one score per design record).
    pub fn linearized_variance(&self, scores: &[f64]) -> f64 {
        let strata = self.strata_info();
        let mut psu_totals = vec![0.0f64; self.psu_count()];
        let mut psu_stratum = vec![0usize; self.psu_count()];
        for ((score, &psu), &stratum) in scores.iter().zip(self.psu_of()).zip(self.stratum_of()) {
            psu_totals[psu] += score;
            psu_stratum[psu] = stratum;
        }

        let mut sums = vec![0.0f64; strata.len()];
        for (total, &stratum) in psu_totals.iter().zip(&psu_stratum) {
            sums[stratum] += total;
        }
        let mut squares = vec![0.0f64; strata.len()];
        for (total, &stratum) in psu_totals.iter().zip(&psu_stratum) {
            let n = strata[stratum].psu_count as f64;
            let deviation = total - sums[stratum] / n;
            squares[stratum] += deviation * deviation;
        }

        strata
            .iter()
            .zip(&squares)
            .filter(|(stratum, _)| stratum.psu_count >= 2)
            .map(|(stratum, ss)| {
                let n = stratum.psu_count as f64;
                (1.0 - stratum.sampling_fraction) * n / (n - 1.0) * ss
            })
            .sum()
    }
}
