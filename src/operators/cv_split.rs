use super::frame::{i64_column, key_columns, key_schema, opt_f64_column, str_column, time_column, time_schema};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::folds::{planner_for, FoldConfig};
use crate::error::Result;
use crate::types::{FoldBoundary, SeriesKey, SplitRole};
use polars::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitRow {
    pub fold_id: usize,
    pub key: SeriesKey,
    pub time: i64,
    pub value: Option<f64>,
    pub role: SplitRole,
}

/// Labels every input row with the folds it belongs to, as train or test.
/// Rows outside every window are left out.
pub struct CvSplitOperator {
    layout: InputLayout,
    folds: FoldConfig,
    period: Option<i64>,
}

impl CvSplitOperator {
    pub fn bind(schema: &[ColumnSpec], options: &OperatorOptions) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let folds = options.fold_config()?;
        let period = match options.frequency()? {
            Some(frequency) => frequency.period(&layout.time)?,
            None => None,
        };
        log::info!(
            "cv_split bound: horizon {}, {} folds, {:?} window",
            folds.horizon,
            folds.n_folds,
            folds.window_type
        );
        Ok(Self { layout, folds, period })
    }

    fn value_name(&self) -> &str {
        &self.layout.values[0].name
    }
}

impl GroupOperator for CvSplitOperator {
    type Value = f64;
    type Plan = Vec<FoldBoundary>;
    type Row = SplitRow;

    fn name(&self) -> &'static str {
        "cv_split"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.push(time_schema(&self.layout));
        schema.extend([
            ColumnSpec::new(self.value_name(), DataType::Float64),
            ColumnSpec::new("fold_id", DataType::Int64),
            ColumnSpec::new("split", DataType::String),
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
        log::info!("cv_split: {} folds over {} distinct timestamps", folds.len(), axis.len());
        Ok(folds)
    }

    fn evaluate(
        &self,
        plan: &Vec<FoldBoundary>,
        key: &SeriesKey,
        series: &SeriesBuffer,
    ) -> Result<Vec<SplitRow>> {
        let mut rows = Vec::new();
        for fold in plan {
            for point in series.points() {
                let role = if fold.in_train(point.time) {
                    SplitRole::Train
                } else if fold.in_test(point.time) {
                    SplitRole::Test
                } else {
                    continue;
                };
                rows.push(SplitRow {
                    fold_id: fold.fold_id,
                    key: key.clone(),
                    time: point.time,
                    value: point.valid.then_some(point.value),
                    role,
                });
            }
        }
        Ok(rows)
    }

    fn to_frame(&self, rows: &[SplitRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();

        let mut columns = key_columns(&self.layout, &keys)?;
        columns.push(time_column(&self.layout, &times)?);
        columns.push(opt_f64_column(self.value_name(), rows.iter().map(|r| r.value).collect()));
        columns.push(i64_column("fold_id", rows.iter().map(|r| r.fold_id as i64).collect()));
        columns.push(str_column("split", rows.iter().map(|r| r.role.as_str()).collect()));

        Ok(DataFrame::new(columns)?)
    }
}
