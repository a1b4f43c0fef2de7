use super::frame::{finite, i64_column, key_columns, key_schema, opt_f64_column, str_column};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::metrics::{Metric, MetricAggregator, ScoringInput};
use crate::error::Result;
use crate::types::SeriesKey;
use polars::prelude::*;

/// One scored observation. Missing bounds are NaN so that the shared
/// validity filter drops them for coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPoint {
    pub actual: f64,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for ScoredPoint {
    fn default() -> Self {
        Self {
            actual: f64::NAN,
            forecast: f64::NAN,
            lower: f64::NAN,
            upper: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: SeriesKey,
    pub metric: Metric,
    pub value: Option<f64>,
    pub n_observations: usize,
}

/// Scores existing actual/forecast columns per group.
pub struct MetricsOperator {
    layout: InputLayout,
    aggregator: MetricAggregator,
}

impl MetricsOperator {
    pub fn bind(schema: &[ColumnSpec], options: &OperatorOptions) -> Result<Self> {
        let metric = options.metric()?;
        let roles: &[&str] = if metric.needs_interval() {
            &["actual", "forecast", "lower", "upper"]
        } else {
            &["actual", "forecast"]
        };
        let layout = InputLayout::resolve(schema, roles)?;
        log::info!("metrics bound: {} over {} key column(s)", metric, layout.keys.len());
        Ok(Self {
            layout,
            aggregator: MetricAggregator::new(metric),
        })
    }
}

impl GroupOperator for MetricsOperator {
    type Value = ScoredPoint;
    type Plan = ();
    type Row = MetricRow;

    fn name(&self) -> &'static str {
        "metrics"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.extend([
            ColumnSpec::new("metric", DataType::String),
            ColumnSpec::new("value", DataType::Float64),
            ColumnSpec::new("n_observations", DataType::Int64),
        ]);
        schema
    }

    fn release_strategy(&self) -> ReleaseStrategy {
        ReleaseStrategy::Bulk
    }

    fn extract(&self, batch: &DataFrame) -> Result<Vec<IngestRow<ScoredPoint>>> {
        let columns: Vec<Vec<Option<f64>>> = (0..self.layout.values.len())
            .map(|i| f64_values(batch, self.layout.value_index(i)))
            .collect::<Result<_>>()?;
        let bound = |i: usize, row: usize| {
            columns
                .get(i)
                .and_then(|c| c[row])
                .unwrap_or(f64::NAN)
        };

        let values = (0..batch.height())
            .map(|row| match (columns[0][row], columns[1][row]) {
                (Some(actual), Some(forecast)) => Some(ScoredPoint {
                    actual,
                    forecast,
                    lower: bound(2, row),
                    upper: bound(3, row),
                }),
                _ => None,
            })
            .collect();
        extract_rows(&self.layout, batch, values)
    }

    fn plan(&self, _groups: &GroupBuffer<ScoredPoint>) -> Result<()> {
        Ok(())
    }

    fn evaluate(
        &self,
        _plan: &(),
        key: &SeriesKey,
        series: &SeriesBuffer<ScoredPoint>,
    ) -> Result<Vec<MetricRow>> {
        let points: Vec<&ScoredPoint> = series.valid_points().map(|p| &p.value).collect();
        let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
        let forecast: Vec<f64> = points.iter().map(|p| p.forecast).collect();
        let lower: Vec<f64> = points.iter().map(|p| p.lower).collect();
        let upper: Vec<f64> = points.iter().map(|p| p.upper).collect();

        let metric = self.aggregator.metric();
        let mut input = ScoringInput::new(&actual, &forecast);
        if metric.needs_interval() {
            input = input.with_interval(&lower, &upper);
        }
        let n_observations = points
            .iter()
            .filter(|p| p.actual.is_finite() && p.forecast.is_finite())
            .filter(|p| !metric.needs_interval() || (p.lower.is_finite() && p.upper.is_finite()))
            .count();

        Ok(vec![MetricRow {
            key: key.clone(),
            metric,
            value: finite(self.aggregator.score(&input)),
            n_observations,
        }])
    }

    fn to_frame(&self, rows: &[MetricRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let mut columns = key_columns(&self.layout, &keys)?;
        columns.push(str_column("metric", rows.iter().map(|r| r.metric.name()).collect()));
        columns.push(opt_f64_column("value", rows.iter().map(|r| r.value).collect()));
        columns.push(i64_column(
            "n_observations",
            rows.iter().map(|r| r.n_observations as i64).collect(),
        ));
        Ok(DataFrame::new(columns)?)
    }
}
