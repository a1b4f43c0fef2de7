use super::frame::{i64_column, time_schema};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, InputLayout};
use crate::engines::buffer::{extract_rows, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::engines::folds::{planner_for, FoldConfig};
use crate::error::Result;
use crate::types::{FoldBoundary, SeriesKey};
use polars::prelude::*;

const BOUNDARY_COLUMNS: [&str; 4] = ["train_start", "train_end", "test_start", "test_end"];

/// The fold plan itself as a table: one row per fold, boundaries typed like
/// the input time column. Groups only contribute their timestamps.
pub struct CvFoldsOperator {
    layout: InputLayout,
    folds: FoldConfig,
    period: Option<i64>,
}

impl CvFoldsOperator {
    pub fn bind(schema: &[ColumnSpec], options: &OperatorOptions) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let folds = options.fold_config()?;
        let period = match options.frequency()? {
            Some(frequency) => frequency.period(&layout.time)?,
            None => None,
        };
        log::info!(
            "cv_folds bound: horizon {}, {} folds, {}",
            folds.horizon,
            folds.n_folds,
            if period.is_some() { "by date" } else { "by position" }
        );
        Ok(Self {
            layout,
            folds,
            period,
        })
    }
}

impl GroupOperator for CvFoldsOperator {
    type Value = ();
    type Plan = Vec<FoldBoundary>;
    type Row = FoldBoundary;

    fn name(&self) -> &'static str {
        "cv_folds"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let time = time_schema(&self.layout);
        let mut schema = vec![ColumnSpec::new("fold_id", DataType::Int64)];
        schema.extend(BOUNDARY_COLUMNS.iter().map(|c| ColumnSpec::new(*c, time.dtype.clone())));
        schema
    }

    fn release_strategy(&self) -> ReleaseStrategy {
        ReleaseStrategy::Bulk
    }

    /// Every timestamp counts, whatever its value.
    fn extract(&self, batch: &DataFrame) -> Result<Vec<IngestRow<()>>> {
        extract_rows(&self.layout, batch, vec![Some(()); batch.height()])
    }

    fn plan(&self, groups: &GroupBuffer<()>) -> Result<Vec<FoldBoundary>> {
        let axis = groups.distinct_times();
        let folds = planner_for(self.folds.clone(), self.period).plan(&axis);
        log::info!("cv_folds: {} folds over {} distinct timestamps", folds.len(), axis.len());
        Ok(folds)
    }

    fn evaluate(
        &self,
        _plan: &Vec<FoldBoundary>,
        _key: &SeriesKey,
        _series: &SeriesBuffer<()>,
    ) -> Result<Vec<FoldBoundary>> {
        Ok(Vec::new())
    }

    fn finish(&self, plan: &Vec<FoldBoundary>) -> Result<Vec<FoldBoundary>> {
        Ok(plan.clone())
    }

    fn to_frame(&self, rows: &[FoldBoundary]) -> Result<DataFrame> {
        let mut columns = vec![i64_column(
            "fold_id",
            rows.iter().map(|f| f.fold_id as i64).collect(),
        )];
        let bounds: [fn(&FoldBoundary) -> i64; 4] = [
            |f| f.train_start,
            |f| f.train_end,
            |f| f.test_start,
            |f| f.test_end,
        ];
        for (name, bound) in BOUNDARY_COLUMNS.iter().zip(bounds) {
            let times: Vec<i64> = rows.iter().map(bound).collect();
            columns.push(Column::from(self.layout.time.to_series(name, &times)?));
        }
        Ok(DataFrame::new(columns)?)
    }
}
