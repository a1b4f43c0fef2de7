use crate::error::{Result, TsfoldError};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Date,
    Timestamp,
    Int32,
    Int64,
}

/// A time column resolved at bind time. Temporal kinds are carried as
/// microseconds since the epoch, integer kinds as their raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeColumn {
    kind: TimeKind,
    source: DataType,
}

impl TimeColumn {
    pub fn from_dtype(dtype: &DataType) -> Option<Self> {
        let kind = match dtype {
            DataType::Date => TimeKind::Date,
            DataType::Datetime(_, _) => TimeKind::Timestamp,
            DataType::Int32 => TimeKind::Int32,
            DataType::Int64 => TimeKind::Int64,
            _ => return None,
        };
        Some(Self {
            kind,
            source: dtype.clone(),
        })
    }

    pub fn kind(&self) -> TimeKind {
        self.kind
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self.kind, TimeKind::Date | TimeKind::Timestamp)
    }

    /// Type the column is emitted with. Timestamps come back at microsecond
    /// precision with their original time zone.
    pub fn output_dtype(&self) -> DataType {
        match &self.source {
            DataType::Datetime(_, tz) => DataType::Datetime(TimeUnit::Microseconds, tz.clone()),
            other => other.clone(),
        }
    }

    /// A literal in this column's units: a raw integer for integer columns,
    /// `2024-03-01` or `2024-03-01 12:00:00` for temporal ones.
    pub fn parse_value(&self, raw: &str) -> Option<i64> {
        let raw = raw.trim();
        if !self.is_temporal() {
            return raw.parse().ok();
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_micros());
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|dt| dt.and_utc().timestamp_micros())
    }

    pub fn to_units(&self, column: &Column) -> Result<Vec<Option<i64>>> {
        match (self.kind, &self.source) {
            (TimeKind::Date, _) => {
                let days = column.cast(&DataType::Int32)?;
                Ok(days
                    .i32()?
                    .into_iter()
                    .map(|d| d.map(|d| d as i64 * MICROS_PER_DAY))
                    .collect())
            }
            (TimeKind::Timestamp, DataType::Datetime(unit, _)) => {
                let raw = column.cast(&DataType::Int64)?;
                let unit = *unit;
                raw.i64()?
                    .into_iter()
                    .map(|t| t.map(|t| to_micros(t, unit)).transpose())
                    .collect()
            }
            (TimeKind::Timestamp, other) => Err(TsfoldError::Schema(format!(
                "time column resolved as timestamp but has type {}",
                other
            ))),
            (TimeKind::Int32, _) | (TimeKind::Int64, _) => {
                let raw = column.cast(&DataType::Int64)?;
                Ok(raw.i64()?.into_iter().collect())
            }
        }
    }

    pub fn to_series(&self, name: &str, units: &[i64]) -> Result<Series> {
        let series = match self.kind {
            TimeKind::Date => {
                let days = units
                    .iter()
                    .map(|u| narrow(u.div_euclid(MICROS_PER_DAY), name))
                    .collect::<Result<Vec<i32>>>()?;
                Series::new(name.into(), days).cast(&DataType::Date)?
            }
            TimeKind::Timestamp => Series::new(name.into(), units.to_vec()).cast(&self.output_dtype())?,
            TimeKind::Int32 => {
                let raw = units
                    .iter()
                    .map(|u| narrow(*u, name))
                    .collect::<Result<Vec<i32>>>()?;
                Series::new(name.into(), raw)
            }
            TimeKind::Int64 => Series::new(name.into(), units.to_vec()),
        };
        Ok(series)
    }
}

fn to_micros(value: i64, unit: TimeUnit) -> Result<i64> {
    match unit {
        TimeUnit::Nanoseconds => Ok(value.div_euclid(1_000)),
        TimeUnit::Microseconds => Ok(value),
        TimeUnit::Milliseconds => value.checked_mul(1_000).ok_or_else(|| {
            TsfoldError::Computation(format!("timestamp {}ms overflows microseconds", value))
        }),
    }
}

/// Values that fall outside a 32-bit column are errors, not wrapped.
fn narrow(value: i64, name: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        TsfoldError::Computation(format!("{} overflows the 32-bit column '{}'", value, name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trips_through_micros() {
        let time = TimeColumn::from_dtype(&DataType::Date).unwrap();
        let dates = Series::new("date".into(), vec![0i32, 1, 19000])
            .cast(&DataType::Date)
            .unwrap();
        let units = time.to_units(&Column::from(dates)).unwrap();
        assert_eq!(units[1], Some(MICROS_PER_DAY));

        let flat: Vec<i64> = units.into_iter().flatten().collect();
        let back = time.to_series("date", &flat).unwrap();
        assert_eq!(back.dtype(), &DataType::Date);
        assert_eq!(back.len(), 3);
    }

    #[test]
    fn test_millisecond_timestamps_scale_to_micros() {
        let dtype = DataType::Datetime(TimeUnit::Milliseconds, None);
        let time = TimeColumn::from_dtype(&dtype).unwrap();
        let ts = Series::new("ts".into(), vec![1_500i64]).cast(&dtype).unwrap();
        assert_eq!(time.to_units(&Column::from(ts)).unwrap(), vec![Some(1_500_000)]);
        assert_eq!(
            time.output_dtype(),
            DataType::Datetime(TimeUnit::Microseconds, None)
        );
    }

    #[test]
    fn test_int32_output_past_range_is_an_error() {
        let time = TimeColumn::from_dtype(&DataType::Int32).unwrap();
        let ok = time.to_series("t", &[1, i32::MAX as i64]).unwrap();
        assert_eq!(ok.dtype(), &DataType::Int32);

        let err = time.to_series("t", &[i32::MAX as i64 + 1]).unwrap_err();
        assert!(matches!(err, TsfoldError::Computation(_)));
    }

    #[test]
    fn test_overflowing_milliseconds_are_errors() {
        let dtype = DataType::Datetime(TimeUnit::Milliseconds, None);
        let time = TimeColumn::from_dtype(&dtype).unwrap();
        let ts = Series::new("ts".into(), vec![i64::MAX / 10]).cast(&dtype).unwrap();
        assert!(time.to_units(&Column::from(ts)).is_err());
    }

    #[test]
    fn test_parse_value_in_column_units() {
        let date = TimeColumn::from_dtype(&DataType::Date).unwrap();
        assert_eq!(date.parse_value("1970-01-03"), Some(2 * MICROS_PER_DAY));
        assert_eq!(
            date.parse_value("1970-01-01 00:00:05"),
            Some(5 * MICROS_PER_SECOND)
        );
        assert_eq!(date.parse_value("next week"), None);

        let int = TimeColumn::from_dtype(&DataType::Int64).unwrap();
        assert_eq!(int.parse_value(" 42 "), Some(42));
        assert_eq!(int.parse_value("1970-01-03"), None);
    }

    #[test]
    fn test_rejects_non_time_types() {
        assert!(TimeColumn::from_dtype(&DataType::Float64).is_none());
        assert!(TimeColumn::from_dtype(&DataType::String).is_none());
        assert!(!TimeColumn::from_dtype(&DataType::Int64).unwrap().is_temporal());
    }
}
