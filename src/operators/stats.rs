use super::frame::{i64_column, key_columns, key_schema, opt_f64_column};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::error::Result;
use crate::model::{describe, SeriesStats, ValidityMask};
use crate::types::SeriesKey;
use polars::prelude::*;

const COUNT_FIELDS: [&str; 7] = [
    "length",
    "n_nulls",
    "n_nan",
    "n_zeros",
    "n_positive",
    "n_negative",
    "n_unique_values",
];

const MOMENT_FIELDS: [&str; 10] = [
    "mean", "median", "std_dev", "variance", "min", "max", "range", "sum", "skewness", "kurtosis",
];

#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub key: SeriesKey,
    pub stats: SeriesStats,
}

impl StatsRow {
    fn counts(&self) -> [usize; 7] {
        let s = &self.stats;
        [
            s.length,
            s.n_nulls,
            s.n_nan,
            s.n_zeros,
            s.n_positive,
            s.n_negative,
            s.n_unique_values,
        ]
    }

    fn moments(&self) -> [Option<f64>; 10] {
        let s = &self.stats;
        [
            s.mean, s.median, s.std_dev, s.variance, s.min, s.max, s.range, s.sum, s.skewness,
            s.kurtosis,
        ]
    }
}

/// Descriptive statistics of every group. Every group gets a row; moments a
/// series is too short for are null.
pub struct StatsOperator {
    layout: InputLayout,
}

impl StatsOperator {
    /// Stats has no tunables; `options` is accepted for a uniform bind.
    pub fn bind(schema: &[ColumnSpec], options: &OperatorOptions) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        if options.contains("insufficient_data") {
            log::debug!("stats: insufficient_data has no effect, every group is described");
        }
        log::info!("stats bound: {} key column(s)", layout.keys.len());
        Ok(Self { layout })
    }
}

impl GroupOperator for StatsOperator {
    type Value = f64;
    type Plan = ();
    type Row = StatsRow;

    fn name(&self) -> &'static str {
        "stats"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.extend(COUNT_FIELDS.iter().map(|f| ColumnSpec::new(*f, DataType::Int64)));
        schema.push(ColumnSpec::new("is_constant", DataType::Boolean));
        schema.extend(MOMENT_FIELDS.iter().map(|f| ColumnSpec::new(*f, DataType::Float64)));
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

    fn evaluate(&self, _plan: &(), key: &SeriesKey, series: &SeriesBuffer) -> Result<Vec<StatsRow>> {
        let (values, flags) = series.model_input();
        let mask = ValidityMask::from_flags_if_sparse(&flags);
        Ok(vec![StatsRow {
            key: key.clone(),
            stats: describe(&values, mask.as_ref()),
        }])
    }

    fn to_frame(&self, rows: &[StatsRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let counts: Vec<[usize; 7]> = rows.iter().map(StatsRow::counts).collect();
        let moments: Vec<[Option<f64>; 10]> = rows.iter().map(StatsRow::moments).collect();

        let mut columns = key_columns(&self.layout, &keys)?;
        for (i, name) in COUNT_FIELDS.iter().enumerate() {
            columns.push(i64_column(name, counts.iter().map(|c| c[i] as i64).collect()));
        }
        let constant: Vec<bool> = rows.iter().map(|r| r.stats.is_constant).collect();
        columns.push(Column::from(Series::new("is_constant".into(), constant)));
        for (i, name) in MOMENT_FIELDS.iter().enumerate() {
            columns.push(opt_f64_column(name, moments.iter().map(|m| m[i]).collect()));
        }
        Ok(DataFrame::new(columns)?)
    }
}
