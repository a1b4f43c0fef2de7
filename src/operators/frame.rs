//! Output column builders shared by the operators.

use crate::data::{ColumnSpec, InputLayout};
use crate::error::Result;
use crate::types::SeriesKey;
use polars::prelude::*;

/// Key columns with their input names and types.
pub fn key_columns(layout: &InputLayout, keys: &[&SeriesKey]) -> Result<Vec<Column>> {
    layout
        .keys
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let parts: Vec<Option<&str>> = keys.iter().map(|k| k.part(i)).collect();
            let series = Series::new(spec.name.as_str().into(), parts).cast(&spec.dtype)?;
            Ok(Column::from(series))
        })
        .collect()
}

pub fn time_column(layout: &InputLayout, times: &[i64]) -> Result<Column> {
    Ok(Column::from(layout.time.to_series(&layout.time_name, times)?))
}

pub fn key_schema(layout: &InputLayout) -> Vec<ColumnSpec> {
    layout.keys.clone()
}

pub fn time_schema(layout: &InputLayout) -> ColumnSpec {
    ColumnSpec::new(layout.time_name.clone(), layout.time.output_dtype())
}

pub fn f64_column(name: &str, values: Vec<f64>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn opt_f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn i64_column(name: &str, values: Vec<i64>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn opt_i64_column(name: &str, values: Vec<Option<i64>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn str_column(name: &str, values: Vec<&str>) -> Column {
    Column::from(Series::new(name.into(), values))
}

/// NaN and infinities become nulls.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
