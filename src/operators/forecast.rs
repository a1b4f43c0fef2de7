use super::frame::{
    f64_column, i64_column, key_columns, key_schema, opt_f64_column, str_column, time_column,
    time_schema,
};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, Frequency, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::policy::{triage, FailureAction, InsufficientDataPolicy};
use crate::error::Result;
use crate::model::{Model, ModelOptions, ModelOutput, ValidityMask};
use crate::types::{ResultRow, SeriesKey};
use polars::prelude::*;
use std::sync::Arc;

const PADDED_MODEL_NAME: &str = "LastValue(padded)";

/// Future values for every group, stamped with dates past its last
/// observation.
pub struct ForecastOperator {
    layout: InputLayout,
    frequency: Frequency,
    model_options: ModelOptions,
    policy: InsufficientDataPolicy,
    model: Arc<dyn Model>,
}

impl ForecastOperator {
    pub fn bind(
        schema: &[ColumnSpec],
        options: &OperatorOptions,
        model: Arc<dyn Model>,
    ) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let horizon = options.fold_config()?.horizon;
        // Fails here, not mid-stream, if the frequency cannot apply to the column.
        let frequency = Frequency::resolve(options.frequency()?, &layout.time)?;
        let model_options = options.model_options(horizon)?;
        let policy = options.insufficient_data();

        log::info!(
            "forecast bound: horizon {}, method {}, frequency {:?}, insufficient data: {:?}",
            horizon,
            model_options.method,
            frequency,
            policy
        );

        Ok(Self {
            layout,
            frequency,
            model_options,
            policy,
            model,
        })
    }

    fn rows_from(
        &self,
        key: &SeriesKey,
        last: i64,
        point: &[f64],
        output: Option<&ModelOutput>,
        model_name: &str,
    ) -> Result<Vec<ResultRow>> {
        point
            .iter()
            .enumerate()
            .map(|(h, &value)| {
                let (lower, upper) = output.map_or((None, None), |o| o.interval_at(h));
                Ok(ResultRow {
                    fold_id: None,
                    key: key.clone(),
                    time: self.frequency.advance(&self.layout.time, last, h as u32 + 1)?,
                    step: Some(h + 1),
                    forecast: value,
                    actual: None,
                    lower,
                    upper,
                    score: None,
                    model_name: model_name.to_string(),
                })
            })
            .collect()
    }

    /// Flat forecast at the last valid value, without intervals.
    fn pad(&self, key: &SeriesKey, series: &SeriesBuffer, last: i64) -> Result<Vec<ResultRow>> {
        match series.valid_points().filter(|p| p.value.is_finite()).last() {
            Some(p) => {
                let point = vec![p.value; self.model_options.horizon];
                self.rows_from(key, last, &point, None, PADDED_MODEL_NAME)
            }
            None => {
                log::warn!("{}: nothing to pad from, omitted", key);
                Ok(Vec::new())
            }
        }
    }
}

impl GroupOperator for ForecastOperator {
    type Value = f64;
    type Plan = ();
    type Row = ResultRow;

    fn name(&self) -> &'static str {
        "forecast"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.push(ColumnSpec::new("forecast_step", DataType::Int64));
        schema.push(time_schema(&self.layout));
        schema.extend([
            ColumnSpec::new("point_forecast", DataType::Float64),
            ColumnSpec::new("lower", DataType::Float64),
            ColumnSpec::new("upper", DataType::Float64),
            ColumnSpec::new("model_name", DataType::String),
        ]);
        schema
    }

    fn release_strategy(&self) -> ReleaseStrategy {
        ReleaseStrategy::PerGroup
    }

    fn extract(&self, batch: &DataFrame) -> Result<Vec<IngestRow>> {
        let values = f64_values(batch, self.layout.value_index(0))?;
        extract_rows(&self.layout, batch, values)
    }

    fn plan(&self, _groups: &GroupBuffer) -> Result<()> {
        Ok(())
    }

    fn evaluate(&self, _plan: &(), key: &SeriesKey, series: &SeriesBuffer) -> Result<Vec<ResultRow>> {
        let Some(last) = series.last_time() else {
            return Ok(Vec::new());
        };
        let (values, flags) = series.model_input();
        let mask = ValidityMask::from_flags_if_sparse(&flags);

        match self.model.forecast(&values, mask.as_ref(), &self.model_options) {
            Ok(output) => {
                if output.point.iter().any(|p| !p.is_finite()) {
                    log::warn!("{}: non-finite forecast, omitted", key);
                    return Ok(Vec::new());
                }
                self.rows_from(key, last, &output.point, Some(&output), &output.metadata.name)
            }
            Err(failure) => match triage(&key.to_string(), failure)? {
                FailureAction::Insufficient(reason) => {
                    self.policy.apply(key, &reason, || self.pad(key, series, last))
                }
                FailureAction::Skip => Ok(Vec::new()),
            },
        }
    }

    fn to_frame(&self, rows: &[ResultRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();

        let mut columns = key_columns(&self.layout, &keys)?;
        columns.push(i64_column(
            "forecast_step",
            rows.iter().map(|r| r.step.unwrap_or(0) as i64).collect(),
        ));
        columns.push(time_column(&self.layout, &times)?);
        columns.push(f64_column("point_forecast", rows.iter().map(|r| r.forecast).collect()));
        columns.push(opt_f64_column("lower", rows.iter().map(|r| r.lower).collect()));
        columns.push(opt_f64_column("upper", rows.iter().map(|r| r.upper).collect()));
        columns.push(str_column(
            "model_name",
            rows.iter().map(|r| r.model_name.as_str()).collect(),
        ));

        Ok(DataFrame::new(columns)?)
    }
}
