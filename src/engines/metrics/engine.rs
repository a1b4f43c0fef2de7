use super::accuracy::{coverage, AccuracyMetrics};
use super::kind::Metric;
use std::collections::HashMap;

/// Parallel arrays to score. Interval bounds are only read for coverage.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub actual: &'a [f64],
    pub forecast: &'a [f64],
    pub lower: Option<&'a [f64]>,
    pub upper: Option<&'a [f64]>,
}

impl<'a> ScoringInput<'a> {
    pub fn new(actual: &'a [f64], forecast: &'a [f64]) -> Self {
        Self {
            actual,
            forecast,
            lower: None,
            upper: None,
        }
    }

    pub fn with_interval(mut self, lower: &'a [f64], upper: &'a [f64]) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }
}

#[derive(Default)]
struct ValidPairs {
    actual: Vec<f64>,
    forecast: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

pub struct MetricAggregator {
    metric: Metric,
}

impl MetricAggregator {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn score(&self, input: &ScoringInput) -> f64 {
        Self::compute(self.metric, input)
    }

    /// A pair counts only when actual and forecast (and, for coverage,
    /// both bounds) are finite. No valid pair means NaN.
    pub fn compute(metric: Metric, input: &ScoringInput) -> f64 {
        if input.actual.len() != input.forecast.len() {
            log::warn!(
                "{}: actual has {} values but forecast has {}",
                metric,
                input.actual.len(),
                input.forecast.len()
            );
            return f64::NAN;
        }

        if metric.needs_interval() {
            let Some(pairs) = Self::valid_with_interval(input) else {
                return f64::NAN;
            };
            return coverage(&pairs.actual, &pairs.lower, &pairs.upper);
        }

        let pairs = Self::valid_pairs(input);
        let (a, f) = (&pairs.actual[..], &pairs.forecast[..]);
        match metric {
            Metric::Mae => AccuracyMetrics::mae(a, f),
            Metric::Mse => AccuracyMetrics::mse(a, f),
            Metric::Rmse => AccuracyMetrics::rmse(a, f),
            Metric::Mape => AccuracyMetrics::mape(a, f),
            Metric::Smape => AccuracyMetrics::smape(a, f),
            Metric::Bias => AccuracyMetrics::bias(a, f),
            Metric::R2 => AccuracyMetrics::r2(a, f),
            Metric::Coverage => f64::NAN,
        }
    }

    /// Every metric keyed by name, in the style of a report.
    pub fn evaluate_all(input: &ScoringInput) -> HashMap<String, f64> {
        Metric::ALL
            .iter()
            .map(|m| (m.name().to_string(), Self::compute(*m, input)))
            .collect()
    }

    fn valid_pairs(input: &ScoringInput) -> ValidPairs {
        let mut pairs = ValidPairs::default();
        for (a, f) in input.actual.iter().zip(input.forecast) {
            if a.is_finite() && f.is_finite() {
                pairs.actual.push(*a);
                pairs.forecast.push(*f);
            }
        }
        pairs
    }

    fn valid_with_interval(input: &ScoringInput) -> Option<ValidPairs> {
        let (lower, upper) = (input.lower?, input.upper?);
        if lower.len() != input.actual.len() || upper.len() != input.actual.len() {
            return None;
        }
        let mut pairs = ValidPairs::default();
        for i in 0..input.actual.len() {
            let (a, f, lo, hi) = (input.actual[i], input.forecast[i], lower[i], upper[i]);
            if a.is_finite() && f.is_finite() && lo.is_finite() && hi.is_finite() {
                pairs.actual.push(a);
                pairs.forecast.push(f);
                pairs.lower.push(lo);
                pairs.upper.push(hi);
            }
        }
        Some(pairs)
    }
}
