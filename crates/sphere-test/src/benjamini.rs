//! Benjamini-Hochberg step-up correction.

use ordered_float::OrderedFloat;

use crate::work_unit::WorkUnit;

/// Sort work units by raw p-value (ascending), assign 1-based ranks and
/// fill in adjusted p-values.
///
/// Walking from the largest rank down, `adjusted(n) = p(n)` and
/// `adjusted(i) = min(adjusted(i + 1), p(i) * n / i)`, so adjusted values
/// never decrease with rank and never drop below the raw value.
pub fn benjamini_hochberg(units: &mut [WorkUnit]) {
    // Stable: equal p-values keep generation order.
    units.sort_by_key(|u| OrderedFloat(u.p_value));

    let n = units.len();
    let mut previous = f64::INFINITY;
    for (i, unit) in units.iter_mut().enumerate().rev() {
        unit.rank = i + 1;
        unit.adjusted_p_value = step_up(unit.p_value, unit.rank, n, previous);
        previous = unit.adjusted_p_value;
    }
}

/// Adjusted p-values for `p_values`, returned in input order.
pub fn adjust_p_values(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| OrderedFloat(p_values[i]));

    let mut adjusted = vec![0.0; n];
    let mut previous = f64::INFINITY;
    for (i, &idx) in order.iter().enumerate().rev() {
        adjusted[idx] = step_up(p_values[idx], i + 1, n, previous);
        previous = adjusted[idx];
    }
    adjusted
}

#[inline]
fn step_up(p_value: f64, rank: usize, n: usize, previous: f64) -> f64 {
    // n / rank >= 1, so the scaled value cannot round below p_value.
    previous.min(p_value * (n as f64 / rank as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RandomSampler;

    fn units_with(p_values: &[f64]) -> Vec<WorkUnit> {
        p_values
            .iter()
            .map(|&p| {
                let mut unit = WorkUnit::new(vec![0], RandomSampler::new(1, 0).unwrap());
                unit.p_value = p;
                unit
            })
            .collect()
    }

    #[test]
    fn test_linear_p_values_adjust_to_the_same_value() {
        let adjusted = adjust_p_values(&[0.01, 0.02, 0.03, 0.04, 0.05]);
        for a in adjusted {
            assert!((a - 0.05).abs() < 1e-12, "got {}", a);
        }
    }

    #[test]
    fn test_step_up_takes_running_minimum() {
        // 0.04 * 4 / 3 = 0.0533 is beaten by the rank-4 value 0.05
        let adjusted = adjust_p_values(&[0.01, 0.04, 0.05, 0.03]);
        let expected = [0.04, 0.05, 0.05, 0.05];
        for (a, e) in adjusted.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "got {:?}", adjusted);
        }
    }

    #[test]
    fn test_work_units_sorted_ranked_and_monotone() {
        let mut units = units_with(&[0.3, 0.001, 0.02, 0.02, 0.9, 0.004]);
        benjamini_hochberg(&mut units);

        let ranks: Vec<usize> = units.iter().map(|u| u.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
        assert!(units.windows(2).all(|w| w[0].p_value <= w[1].p_value));
        assert!(units
            .windows(2)
            .all(|w| w[0].adjusted_p_value <= w[1].adjusted_p_value));
        assert!(units.iter().all(|u| u.adjusted_p_value >= u.p_value));
        assert_eq!(units[5].adjusted_p_value, 0.9);
    }

    #[test]
    fn test_empty_input() {
        let mut units = units_with(&[]);
        benjamini_hochberg(&mut units);
        assert!(adjust_p_values(&[]).is_empty());
    }
}
