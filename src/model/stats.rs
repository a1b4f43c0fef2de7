use super::types::ValidityMask;
use serde::{Deserialize, Serialize};

/// Descriptive statistics of one series. Moments that cannot be computed
/// from the available points are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub length: usize,
    pub n_nulls: usize,
    pub n_nan: usize,
    pub n_zeros: usize,
    pub n_positive: usize,
    pub n_negative: usize,
    pub n_unique_values: usize,
    pub is_constant: bool,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub variance: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub sum: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

pub fn describe(values: &[f64], validity: Option<&ValidityMask>) -> SeriesStats {
    let mut n_nulls = 0;
    let mut n_nan = 0;
    let mut finite = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if validity.is_some_and(|m| !m.is_valid(i)) {
            n_nulls += 1;
        } else if !v.is_finite() {
            n_nan += 1;
        } else {
            finite.push(v);
        }
    }

    let n_zeros = finite.iter().filter(|v| **v == 0.0).count();
    let n_positive = finite.iter().filter(|v| **v > 0.0).count();
    let n_negative = finite.iter().filter(|v| **v < 0.0).count();

    let mut sorted = finite.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut unique = sorted.clone();
    unique.dedup();

    let n = finite.len() as f64;
    let sum = (!finite.is_empty()).then(|| finite.iter().sum::<f64>());
    let mean = sum.map(|s| s / n);
    let min = sorted.first().copied();
    let max = sorted.last().copied();

    let median = if sorted.is_empty() {
        None
    } else if sorted.len() % 2 == 1 {
        Some(sorted[sorted.len() / 2])
    } else {
        let mid = sorted.len() / 2;
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    };

    let variance = match mean {
        Some(m) if finite.len() >= 2 => {
            Some(finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0))
        }
        _ => None,
    };
    let std_dev = variance.map(f64::sqrt);

    let (skewness, kurtosis) = match (mean, std_dev) {
        (Some(m), Some(s)) if s > 0.0 => {
            let m2 = finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let m3 = finite.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
            let m4 = finite.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
            let skew = (finite.len() >= 3).then(|| m3 / m2.powf(1.5));
            let kurt = (finite.len() >= 4).then(|| m4 / (m2 * m2) - 3.0);
            (skew, kurt)
        }
        _ => (None, None),
    };

    SeriesStats {
        length: values.len(),
        n_nulls,
        n_nan,
        n_zeros,
        n_positive,
        n_negative,
        n_unique_values: unique.len(),
        is_constant: unique.len() <= 1,
        mean,
        median,
        std_dev,
        variance,
        min,
        max,
        range: min.zip(max).map(|(lo, hi)| hi - lo),
        sum,
        skewness,
        kurtosis,
    }
}
