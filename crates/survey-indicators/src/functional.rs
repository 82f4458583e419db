//! Welfare functionals: FGT poverty terms, weighted quantiles and the weighted
//! Gini coefficient.
//!
//! The Gini uses the trapezoid rule on the Lorenz curve with tied values
//! grouped, so a population with equal welfare has a Gini of exactly zero.
//! Its linearized score per record is the influence function of `G` with
//! respect to that record's weight.

/// Per-record FGT term `((z − y) / z)^α` for `y < z`, zero otherwise.
pub fn fgt_term(value: f64, line: f64, alpha: u8) -> f64 {
    if line <= 0.0 || value >= line {
        return 0.0;
    }
    let gap = (line - value) / line;
    gap.powi(i32::from(alpha))
}

/// Smallest value whose cumulative weight share reaches `p`. Records with a
/// non-positive weight are ignored; `None` when no weight remains.
pub fn weighted_quantile(values: &[f64], weights: &[f64], p: f64) -> Option<f64> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let total: f64 = order.iter().map(|&i| weights[i]).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    // Relative slack so that shares like 0.5 of an even split are reached.
    let target = p.clamp(0.0, 1.0) * total * (1.0 - 1e-12);
    let mut cumulative = 0.0;
    for &i in &order {
        cumulative += weights[i];
        if cumulative >= target {
            return Some(values[i]);
        }
    }
    order.last().map(|&i| values[i])
}

/// Gini coefficient and per-record influence values `u_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct GiniEstimate {
    pub value: f64,
    /// `∂G/∂W_i`, aligned with the input records.
    pub influence: Vec<f64>,
}

/// Weighted Gini of `values`. Returns `None` when the total weight or the
/// total welfare is not positive.
pub fn gini(values: &[f64], weights: &[f64]) -> Option<GiniEstimate> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let population: f64 = order.iter().map(|&i| weights[i]).sum();
    let welfare: f64 = order.iter().map(|&i| weights[i] * values[i]).sum();
    if population <= 0.0 || welfare <= 0.0 || !welfare.is_finite() {
        return None;
    }

    struct Group {
        start: usize,
        end: usize,
        value: f64,
        mass: f64,
        weight_before: f64,
        welfare_before: f64,
    }

    let mut groups = Vec::new();
    let (mut weight_before, mut welfare_before) = (0.0, 0.0);
    let mut start = 0;
    while start < order.len() {
        let value = values[order[start]];
        let mut end = start;
        let mut mass = 0.0;
        while end < order.len() && values[order[end]] == value {
            mass += weights[order[end]];
            end += 1;
        }
        groups.push(Group {
            start,
            end,
            value,
            mass,
            weight_before,
            welfare_before,
        });
        weight_before += mass;
        welfare_before += mass * value;
        start = end;
    }

    let area: f64 = groups
        .iter()
        .map(|g| g.mass * (2.0 * g.welfare_before + g.mass * g.value))
        .sum();
    let value = 1.0 - area / (population * welfare);

    let mut influence = vec![0.0; values.len()];
    let scale = population * welfare;
    for group in &groups {
        let weight_through = group.weight_before + group.mass;
        let partial = group.value * (2.0 * population - weight_through - group.weight_before)
            + 2.0 * group.welfare_before
            + group.mass * group.value;
        for &i in &order[group.start..group.end] {
            influence[i] =
                -(partial - (1.0 - value) * (welfare + population * values[i])) / scale;
        }
    }

    Some(GiniEstimate { value, influence })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fgt_terms() {
        assert_eq!(fgt_term(50.0, 100.0, 0), 1.0);
        assert_eq!(fgt_term(50.0, 100.0, 1), 0.5);
        assert_eq!(fgt_term(50.0, 100.0, 2), 0.25);
        // Strictly below the line.
        assert_eq!(fgt_term(100.0, 100.0, 0), 0.0);
    }

    #[test]
    fn two_point_gini() {
        // Half the population holds everything: G = 0.5.
        let est = gini(&[0.0, 10.0], &[1.0, 1.0]).unwrap();
        assert!((est.value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn influence_sums_to_zero() {
        let values = [1.0, 4.0, 4.0, 9.0, 2.5];
        let weights = [2.0, 1.0, 3.0, 0.5, 1.5];
        let est = gini(&values, &weights).unwrap();
        let total: f64 = est.influence.iter().zip(&weights).map(|(u, w)| u * w).sum();
        assert!(total.abs() < 1e-12);
    }

    #[test]
    fn influence_matches_finite_difference() {
        let values = [1.0, 4.0, 4.0, 9.0, 2.5];
        let mut weights = [2.0, 1.0, 3.0, 0.5, 1.5];
        let base = gini(&values, &weights).unwrap();
        let h = 1e-6;
        weights[3] += h;
        let bumped = gini(&values, &weights).unwrap();
        let numeric = (bumped.value - base.value) / h;
        assert!((numeric - base.influence[3]).abs() < 1e-5);
    }

    #[test]
    fn quantiles_follow_cumulative_weight() {
        let values = [30.0, 10.0, 20.0, 40.0];
        let weights = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(weighted_quantile(&values, &weights, 0.5), Some(20.0));
        assert_eq!(weighted_quantile(&values, &weights, 0.51), Some(30.0));
        assert_eq!(weighted_quantile(&values, &weights, 0.1), Some(10.0));
        assert_eq!(weighted_quantile(&values, &weights, 1.0), Some(40.0));
        // Heavy top record pulls the median up.
        assert_eq!(
            weighted_quantile(&values, &[1.0, 1.0, 1.0, 5.0], 0.5),
            Some(40.0)
        );
        assert_eq!(weighted_quantile(&values, &[0.0; 4], 0.5), None);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(gini(&[], &[]).is_none());
        assert!(gini(&[0.0, 0.0], &[1.0, 1.0]).is_none());
    }
}
