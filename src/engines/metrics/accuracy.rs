/// Point-forecast error metrics over pre-filtered, finite pairs.
pub struct AccuracyMetrics;

impl AccuracyMetrics {
    pub fn mae(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mean(actual.iter().zip(forecast).map(|(a, f)| (f - a).abs()))
    }

    pub fn mse(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mean(actual.iter().zip(forecast).map(|(a, f)| (f - a).powi(2)))
    }

    pub fn rmse(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mse(actual, forecast).sqrt()
    }

    /// Pairs with a zero actual are left out of both sum and count.
    pub fn mape(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mean(
            actual
                .iter()
                .zip(forecast)
                .filter(|(a, _)| **a != 0.0)
                .map(|(a, f)| ((f - a) / a).abs()),
        ) * 100.0
    }

    /// Pairs where both values are zero are left out.
    pub fn smape(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mean(actual.iter().zip(forecast).filter_map(|(a, f)| {
            let denom = a.abs() + f.abs();
            (denom != 0.0).then(|| 2.0 * (f - a).abs() / denom)
        })) * 100.0
    }

    pub fn bias(actual: &[f64], forecast: &[f64]) -> f64 {
        Self::mean(actual.iter().zip(forecast).map(|(a, f)| f - a))
    }

    pub fn r2(actual: &[f64], forecast: &[f64]) -> f64 {
        if actual.is_empty() {
            return f64::NAN;
        }
        let mean = actual.iter().sum::<f64>() / actual.len() as f64;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        if ss_tot == 0.0 {
            return f64::NAN;
        }
        let ss_res: f64 = actual
            .iter()
            .zip(forecast)
            .map(|(a, f)| (a - f).powi(2))
            .sum();
        1.0 - ss_res / ss_tot
    }

    fn mean(values: impl Iterator<Item = f64>) -> f64 {
        let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}

/// Share of actuals inside their interval, bounds inclusive.
pub fn coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let inside = actual
        .iter()
        .zip(lower.iter().zip(upper))
        .filter(|(a, (lo, hi))| **a >= **lo && **a <= **hi)
        .count();
    inside as f64 / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let forecast = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(AccuracyMetrics::mae(&actual, &forecast), 1.0);
        assert_eq!(AccuracyMetrics::mse(&actual, &forecast), 1.5);
        assert_eq!(AccuracyMetrics::bias(&actual, &forecast), -0.5);
        assert_eq!(AccuracyMetrics::r2(&actual, &forecast), 1.0 - 6.0 / 5.0);
    }

    #[test]
    fn test_smape_skips_zero_denominators() {
        let value = AccuracyMetrics::smape(&[0.0, 1.0], &[0.0, 3.0]);
        assert_eq!(value, 100.0);
    }

    #[test]
    fn test_r2_undefined_for_constant_actuals() {
        assert!(AccuracyMetrics::r2(&[2.0, 2.0], &[1.0, 3.0]).is_nan());
    }

    #[test]
    fn test_coverage_bounds_are_inclusive() {
        assert_eq!(coverage(&[1.0, 2.0, 5.0], &[1.0, 0.0, 0.0], &[1.0, 3.0, 4.0]), 2.0 / 3.0);
    }
}
