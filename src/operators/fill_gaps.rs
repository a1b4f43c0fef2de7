use super::frame::{key_columns, key_schema, opt_f64_column, time_column, time_schema};
use crate::config::OperatorOptions;
use crate::data::{ColumnSpec, Frequency, InputLayout};
use crate::engines::buffer::{extract_rows, f64_values, GroupBuffer, IngestRow, SeriesBuffer};
use crate::engines::execution::{GroupOperator, ReleaseStrategy};
use crate::error::{Result, TsfoldError};
use crate::types::SeriesKey;
use polars::prelude::*;

/// Upper bound on rows inserted into one group.
const MAX_FILLED_ROWS: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct FilledRow {
    pub key: SeriesKey,
    pub time: i64,
    /// `None` for inserted rows and for null input values.
    pub value: Option<f64>,
}

/// Completes every group to a regular time grid: missing steps between
/// observations come back as null values, and with `fill_until` the group is
/// extended forward to that time.
pub struct FillGapsOperator {
    layout: InputLayout,
    frequency: Frequency,
    fill_until: Option<i64>,
}

impl FillGapsOperator {
    pub fn bind(schema: &[ColumnSpec], options: &OperatorOptions) -> Result<Self> {
        let layout = InputLayout::resolve(schema, &["value"])?;
        let frequency = Frequency::resolve(options.frequency()?, &layout.time)?;
        let fill_until = match options.get_str("fill_until") {
            Some(raw) => Some(layout.time.parse_value(&raw).ok_or_else(|| {
                TsfoldError::config_parse(
                    "fill_until",
                    format!("'{}' is not a time for column '{}'", raw, layout.time_name),
                )
            })?),
            None => None,
        };

        log::info!(
            "fill_gaps bound: frequency {:?}, fill until {:?}",
            frequency,
            fill_until
        );
        Ok(Self {
            layout,
            frequency,
            fill_until,
        })
    }

    fn value_name(&self) -> &str {
        &self.layout.values[0].name
    }

    /// Grid steps after `from` while `keep(t)` holds.
    fn steps_after(
        &self,
        key: &SeriesKey,
        from: i64,
        keep: impl Fn(i64) -> bool,
        rows: &mut Vec<FilledRow>,
    ) -> Result<()> {
        for k in 1u32.. {
            let t = self.frequency.advance(&self.layout.time, from, k)?;
            if !keep(t) {
                return Ok(());
            }
            if rows.len() >= MAX_FILLED_ROWS {
                return Err(TsfoldError::Computation(format!(
                    "{}: filling would exceed {} rows, check the frequency",
                    key, MAX_FILLED_ROWS
                )));
            }
            rows.push(FilledRow {
                key: key.clone(),
                time: t,
                value: None,
            });
        }
        Ok(())
    }
}

impl GroupOperator for FillGapsOperator {
    type Value = f64;
    type Plan = ();
    type Row = FilledRow;

    fn name(&self) -> &'static str {
        "fill_gaps"
    }

    fn output_schema(&self) -> Vec<ColumnSpec> {
        let mut schema = key_schema(&self.layout);
        schema.push(time_schema(&self.layout));
        schema.push(ColumnSpec::new(self.value_name(), DataType::Float64));
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

    fn evaluate(&self, _plan: &(), key: &SeriesKey, series: &SeriesBuffer) -> Result<Vec<FilledRow>> {
        let mut rows = Vec::with_capacity(series.len());
        let mut previous: Option<i64> = None;
        for point in series.points() {
            if let Some(prev) = previous {
                if point.time == prev {
                    return Err(TsfoldError::Computation(format!(
                        "{}: duplicate time {} in group",
                        key, point.time
                    )));
                }
                self.steps_after(key, prev, |t| t < point.time, &mut rows)?;
            }
            rows.push(FilledRow {
                key: key.clone(),
                time: point.time,
                value: point.valid.then_some(point.value),
            });
            previous = Some(point.time);
        }

        if let (Some(last), Some(until)) = (previous, self.fill_until) {
            self.steps_after(key, last, |t| t <= until, &mut rows)?;
        }
        Ok(rows)
    }

    fn to_frame(&self, rows: &[FilledRow]) -> Result<DataFrame> {
        let keys: Vec<&SeriesKey> = rows.iter().map(|r| &r.key).collect();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();

        let mut columns = key_columns(&self.layout, &keys)?;
        columns.push(time_column(&self.layout, &times)?);
        columns.push(opt_f64_column(self.value_name(), rows.iter().map(|r| r.value).collect()));
        Ok(DataFrame::new(columns)?)
    }
}
