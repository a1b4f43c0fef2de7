use super::frame::{
    f64_column, finite, key_columns, key_schema, opt_f64_column, opt_i64_column, time_column,
    time_schema,
};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, InputLayout};
use crate::engines::buffer::{
    extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer, SeriesPoint,
};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::policy::{triage, FailureAction, InsufficientDataPolicy};
use crate::error::{Result, TsfoldError};
use crate::model::{Decomposition, Model, ModelOptions};
use crate::types::SeriesKey;
use polars::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionRow {
    pub key: SeriesKey,
    pub time: i64,
    pub value: f64,
    pub trend: f64,
    pub seasonal: Option<f64>,
    pub remainder: f64,
    pub period: Option<usize>,
}

/// Trend, seasonal and remainder components for every observed point of
/// every group. Under `pad`, groups too short for their cycle get the trend
/// alone.
pub struct DecompositionOperator {
    layout: InputLayout,
    model_options: ModelOptions,
    policy: InsufficientDataPolicy,
    model: Arc<dyn Model>,
}

impl DecompositionOperator {
    pub fn bind(
        schema: &[ColumnSpec],
        options: &OperatorOptions,
        model: Arc<dyn Model>,
    ) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let model_options = options.model_options(1)?;
        let policy = options.insufficient_data();

        log::info!(
            "decomposition bound: seasonal period {}, insufficient data: {:?}",
            if model_options.auto_detect_seasonality {
                "auto".to_string()
            } else {
                model_options.seasonal_period.to_string()
            },
            policy
        );

        Ok(Self {
            layout,
            model_options,
            policy,
            model,
        })
    }

    fn value_name(&self) -> &str {
        &self.layout.values[0].name
    }

    fn rows_from(
        &self,
        key: &SeriesKey,
        points: &[&SeriesPoint],
        parts: Decomposition,
    ) -> Result<Vec<DecompositionRow>> {
        let n = points.len();
        let seasonal_len = parts.seasonal.as_ref().map_or(n, Vec::len);
        if parts.trend.len() != n || parts.remainder.len() != n || seasonal_len != n {
            return Err(TsfoldError::Computation(format!(
                "{}: decomposition returned {} trend values for {} points",
                key,
                parts.trend.len(),
                n
            )));
        }

        Ok(points
            .iter()
            .enumerate()
            .map(|(i, p)| DecompositionRow {
                key: key.clone(),
                time: p.time,
                value: p.value,
                trend: parts.trend[i],
                seasonal: parts.seasonal.as_ref().map(|s| s[i]),
                remainder: parts.remainder[i],
                period: parts.period,
            })
            .collect())
    }

    fn pad(
        &self,
        key: &SeriesKey,
        points: &[&SeriesPoint],
        values: &[f64],
    ) -> Result<Vec<DecompositionRow>> {
        let trend_only = ModelOptions {
            seasonal_period: 0,
            auto_detect_seasonality: false,
            ..self.model_options.clone()
        };
        match self.model.decompose(values, None, &trend_only) {
            Ok(parts) => self.rows_from(key, points, parts),
            Err(failure) => {
                if let FailureAction::Insufficient(reason) = triage(&key.to_string(), failure)? {
                    log::warn!("{}: nothing to pad from ({}), omitted", key, reason);
                }
                Ok(Vec::new())
            }
        }
    }
}

impl GroupOperator for DecompositionOperator {
    type Value = f64;
    type Plan = ();
    type Row = DecompositionRow;

    fn name(&self) -> &'static str {
        "decomposition"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.push(time_schema(&self.layout));
        schema.extend([
            ColumnSpec::new(self.value_name(), DataType::Float64),
            ColumnSpec::new("trend", DataType::Float64),
            ColumnSpec::new("seasonal", DataType::Float64),
            ColumnSpec::new("remainder", DataType::Float64),
            ColumnSpec::new("period", DataType::Int64),
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

    fn evaluate(
        &self,
        _plan: &(),
        key: &SeriesKey,
        series: &SeriesBuffer,
    ) -> Result<Vec<DecompositionRow>> {
        // Components line up with the observed points only.
        let points: Vec<&SeriesPoint> = series
            .valid_points()
            .filter(|p| p.value.is_finite())
            .collect();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();

        match self.model.decompose(&values, None, &self.model_options) {
            Ok(parts) => self.rows_from(key, &points, parts),
            Err(failure) => match triage(&key.to_string(), failure)? {
                FailureAction::Insufficient(reason) => {
                    self.policy.apply(key, &reason, || self.pad(key, &points, &values))
                }
                FailureAction::Skip => Ok(Vec::new()),
            },
        }
    }

    fn to_frame(&self, rows: &[DecompositionRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();

        let mut columns = key_columns(&self.layout, &keys)?;
        columns.push(time_column(&self.layout, &times)?);
        columns.push(f64_column(self.value_name(), rows.iter().map(|r| r.value).collect()));
        columns.push(opt_f64_column("trend", rows.iter().map(|r| finite(r.trend)).collect()));
        columns.push(opt_f64_column(
            "seasonal",
            rows.iter().map(|r| r.seasonal.and_then(finite)).collect(),
        ));
        columns.push(opt_f64_column(
            "remainder",
            rows.iter().map(|r| finite(r.remainder)).collect(),
        ));
        columns.push(opt_i64_column(
            "period",
            rows.iter().map(|r| r.period.map(|p| p as i64)).collect(),
        ));

        Ok(DataFrame::new(columns)?)
    }
}
