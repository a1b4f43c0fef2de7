use super::frame::{
    f64_column, finite, key_columns, key_schema, opt_f64_column, opt_i64_column, str_column,
    time_column, time_schema,
};
use crate::config::OperatorOptions;
use crate::data::{describe_period, ColumnSpec, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer, SeriesPoint};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::folds::{planner_for, FoldConfig};
use crate::engines::metrics::{Metric, MetricAggregator, ScoringInput};
use crate::engines::policy::{triage, FailureAction};
use crate::error::Result;
use crate::model::{Model, ModelOptions};
use crate::types::{FoldBoundary, ResultRow, SeriesKey};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Walk-forward evaluation: for every fold, fit on the training window of
/// each group and score the forecast against the test window.
pub struct BacktestOperator {
    layout: InputLayout,
    folds: FoldConfig,
    period: Option<i64>,
    model_options: ModelOptions,
    metric: Metric,
    model: Arc<dyn Model>,
}

impl BacktestOperator {
    pub fn bind(
        schema: &[ColumnSpec],
        options: &OperatorOptions,
        model: Arc<dyn Model>,
    ) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let folds = options.fold_config()?;
        let period = match options.frequency()? {
            Some(frequency) => frequency.period(&layout.time)?,
            None => None,
        };
        let model_options = options.model_options(folds.horizon)?;
        let metric = options.metric()?;

        log::info!(
            "backtest bound: {} key column(s), horizon {}, {} folds, period {}, method {}, metric {}",
            layout.keys.len(),
            folds.horizon,
            folds.n_folds,
            period.map_or_else(
                || "by position".to_string(),
                |p| describe_period(p, &layout.time)
            ),
            model_options.method,
            metric
        );

        Ok(Self {
            layout,
            folds,
            period,
            model_options,
            metric,
            model,
        })
    }

    pub fn fold_config(&self) -> &FoldConfig {
        &self.folds
    }

    fn evaluate_fold(
        &self,
        fold: &FoldBoundary,
        key: &SeriesKey,
        series: &SeriesBuffer,
    ) -> Result<Vec<ResultRow>> {
        let train: Vec<f64> = valid(series.window(fold.train_start, fold.train_end))
            .map(|p| p.value)
            .collect();
        let test: Vec<&SeriesPoint> = valid(series.window(fold.test_start, fold.test_end)).collect();
        if train.is_empty() || test.is_empty() {
            log::debug!("{} fold {}: empty train or test window", key, fold.fold_id);
            return Ok(Vec::new());
        }

        let context = format!("{} fold {}", key, fold.fold_id);
        let output = match self.model.forecast(&train, None, &self.model_options) {
            Ok(output) => output,
            Err(failure) => {
                // Too-short folds are skipped like any other data problem.
                if let FailureAction::Insufficient(reason) = triage(&context, failure)? {
                    log::warn!("{}: skipped ({})", context, reason);
                }
                return Ok(Vec::new());
            }
        };
        if output.point.iter().any(|p| !p.is_finite()) {
            log::warn!("{}: non-finite forecast, skipped", context);
            return Ok(Vec::new());
        }

        let n = output.point.len().min(test.len());
        Ok((0..n)
            .map(|h| {
                let (lower, upper) = output.interval_at(h);
                ResultRow {
                    fold_id: Some(fold.fold_id),
                    key: key.clone(),
                    time: test[h].time,
                    step: Some(h + 1),
                    forecast: output.point[h],
                    actual: Some(test[h].value),
                    lower,
                    upper,
                    score: None,
                    model_name: output.metadata.name.clone(),
                }
            })
            .collect())
    }

    /// One score over the given rows of a fold. Interval metrics see the
    /// bounds only when every row has both.
    fn score_fold(&self, rows: &[&ResultRow]) -> Option<f64> {
        let actual: Vec<f64> = rows.iter().map(|r| r.actual.unwrap_or(f64::NAN)).collect();
        let forecast: Vec<f64> = rows.iter().map(|r| r.forecast).collect();
        let bounds: Option<(Vec<f64>, Vec<f64>)> = rows
            .iter()
            .map(|r| r.lower.zip(r.upper))
            .collect::<Option<Vec<_>>>()
            .map(|pairs| pairs.into_iter().unzip());

        let mut input = ScoringInput::new(&actual, &forecast);
        if let Some((lower, upper)) = &bounds {
            input = input.with_interval(lower, upper);
        }
        finite(MetricAggregator::compute(self.metric, &input))
    }
}

fn valid<'a>(points: &'a [SeriesPoint]) -> impl Iterator<Item = &'a SeriesPoint> {
    points.iter().filter(|p| p.valid)
}

impl GroupOperator for BacktestOperator {
    type Value = f64;
    type Plan = Vec<FoldBoundary>;
    type Row = ResultRow;

    fn name(&self) -> &'static str {
        "backtest"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = vec![ColumnSpec::new("fold_id", DataType::Int64)];
        schema.extend(key_schema(&self.layout));
        schema.push(time_schema(&self.layout));
        schema.extend([
            ColumnSpec::new("forecast", DataType::Float64),
            ColumnSpec::new("actual", DataType::Float64),
            ColumnSpec::new("error", DataType::Float64),
            ColumnSpec::new("abs_error", DataType::Float64),
            ColumnSpec::new("lower", DataType::Float64),
            ColumnSpec::new("upper", DataType::Float64),
            ColumnSpec::new("model_name", DataType::String),
            ColumnSpec::new("fold_metric_score", DataType::Float64),
        ]);
        schema
    }

    fn release_strategy(&self) -> ReleaseStrategy {
        ReleaseStrategy::Bulk
    }

    fn extract(&self, batch: &DataFrame) -> Result<Vec<IngestRow>> {
        let values = f64_values(batch, self.layout.value_index(0))?;
        extract_rows(&self.layout, batch, values)
    }

    fn plan(&self, groups: &GroupBuffer) -> Result<Vec<FoldBoundary>> {
        let axis = groups.distinct_times();
        let folds = planner_for(self.folds.clone(), self.period).plan(&axis);
        log::info!(
            "backtest: {} folds over {} distinct timestamps",
            folds.len(),
            axis.len()
        );
        Ok(folds)
    }

    fn evaluate(
        &self,
        plan: &Vec<FoldBoundary>,
        key: &SeriesKey,
        series: &SeriesBuffer,
    ) -> Result<Vec<ResultRow>> {
        let mut rows = Vec::new();
        for fold in plan {
            rows.extend(self.evaluate_fold(fold, key, series)?);
        }
        Ok(rows)
    }

    /// `fold_metric_score` covers every group finalized with the fold.
    fn complete(&self, _plan: &Vec<FoldBoundary>, mut rows: Vec<ResultRow>) -> Result<Vec<ResultRow>> {
        let mut by_fold: BTreeMap<usize, Vec<&ResultRow>> = BTreeMap::new();
        for row in &rows {
            if let Some(fold) = row.fold_id {
                by_fold.entry(fold).or_default().push(row);
            }
        }
        let scores: BTreeMap<usize, Option<f64>> = by_fold
            .iter()
            .map(|(fold, members)| (*fold, self.score_fold(members)))
            .collect();
        for (fold, score) in &scores {
            log::debug!("backtest fold {}: {} {:?}", fold, self.metric, score);
        }

        for row in &mut rows {
            row.score = row.fold_id.and_then(|f| scores.get(&f).copied().flatten());
        }
        Ok(rows)
    }

    fn to_frame(&self, rows: &[ResultRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();
        let errors: Vec<Option<f64>> = rows.iter().map(|r| r.error()).collect();

        let mut columns = vec![opt_i64_column(
            "fold_id",
            rows.iter().map(|r| r.fold_id.map(|f| f as i64)).collect(),
        )];
        columns.extend(key_columns(&self.layout, &keys)?);
        columns.push(time_column(&self.layout, &times)?);
        columns.push(f64_column("forecast", rows.iter().map(|r| r.forecast).collect()));
        columns.push(opt_f64_column("actual", rows.iter().map(|r| r.actual).collect()));
        columns.push(opt_f64_column("error", errors.clone()));
        columns.push(opt_f64_column("abs_error", errors.iter().map(|e| e.map(f64::abs)).collect()));
        columns.push(opt_f64_column("lower", rows.iter().map(|r| r.lower).collect()));
        columns.push(opt_f64_column("upper", rows.iter().map(|r| r.upper).collect()));
        columns.push(str_column(
            "model_name",
            rows.iter().map(|r| r.model_name.as_str()).collect(),
        ));
        columns.push(opt_f64_column(
            "fold_metric_score",
            rows.iter().map(|r| r.score).collect(),
        ));

        Ok(DataFrame::new(columns)?)
    }
}
