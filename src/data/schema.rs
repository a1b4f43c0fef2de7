use super::time::TimeColumn;
use crate::error::{Result, TsfoldError};
use polars::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: DataType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Ordered column names and types of an input relation.
pub fn schema_of(df: &DataFrame) -> Vec<ColumnSpec> {
    df.get_columns()
        .iter()
        .map(|c| ColumnSpec::new(c.name().as_str(), c.dtype().clone()))
        .collect()
}

/// Role of every input column: `[key_1 .. key_k, time, value_1 .. value_m]`.
#[derive(Debug, Clone)]
pub struct InputLayout {
    pub keys: Vec<ColumnSpec>,
    pub time_name: String,
    pub time: TimeColumn,
    pub values: Vec<ColumnSpec>,
}

impl InputLayout {
    /// Resolves the layout for an operator that reads the named value
    /// columns. Everything before the time column is a key.
    pub fn resolve(schema: &[ColumnSpec], value_roles: &[&str]) -> Result<Self> {
        let needed = value_roles.len() + 2;
        if schema.len() < needed {
            return Err(TsfoldError::Schema(format!(
                "expected at least {} columns (group key(s), time, {}), got {}",
                needed,
                value_roles.join(", "),
                schema.len()
            )));
        }

        let time_index = schema.len() - value_roles.len() - 1;
        let time_spec = &schema[time_index];
        let time = TimeColumn::from_dtype(&time_spec.dtype).ok_or_else(|| {
            TsfoldError::Schema(format!(
                "time column '{}' must be DATE, TIMESTAMP, INTEGER or BIGINT, got {}",
                time_spec.name, time_spec.dtype
            ))
        })?;

        let keys = schema[..time_index].to_vec();
        for spec in &keys {
            if !is_key_type(&spec.dtype) {
                return Err(TsfoldError::Schema(format!(
                    "group column '{}' must be a string or integer, got {}",
                    spec.name, spec.dtype
                )));
            }
        }

        let values = schema[time_index + 1..].to_vec();
        for (spec, role) in values.iter().zip(value_roles) {
            if !is_numeric(&spec.dtype) {
                return Err(TsfoldError::Schema(format!(
                    "{} column '{}' must be numeric, got {}",
                    role, spec.name, spec.dtype
                )));
            }
        }

        Ok(Self {
            keys,
            time_name: time_spec.name.clone(),
            time,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.keys.len() + 1 + self.values.len()
    }

    pub fn time_index(&self) -> usize {
        self.keys.len()
    }

    pub fn value_index(&self, i: usize) -> usize {
        self.keys.len() + 1 + i
    }

    /// Batches must keep the column count negotiated at bind.
    pub fn check_batch(&self, batch: &DataFrame) -> Result<()> {
        if batch.width() != self.width() {
            return Err(TsfoldError::Schema(format!(
                "batch has {} columns, layout expects {}",
                batch.width(),
                self.width()
            )));
        }
        Ok(())
    }
}

/// Key parts travel as strings, so only types that parse back losslessly
/// can group.
fn is_key_type(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String) || dtype.is_integer()
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
    )
}
