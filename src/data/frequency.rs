use super::time::{TimeColumn, MICROS_PER_DAY, MICROS_PER_SECOND};
use crate::error::{Result, TsfoldError};
use chrono::{DateTime, Duration, Months, Utc};

/// Spacing between consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Fixed wall-clock duration.
    Fixed(Duration),
    /// Calendar months; one period is not a constant number of micros.
    Months(u32),
    /// Raw integer step. On temporal columns one step is one day.
    Steps(i64),
}

impl Frequency {
    /// Parses forms like `1d`, `7d`, `12h`, `30min`, `1w`, `1mo`, `1q`,
    /// `1y`, the names `daily`/`weekly`/`monthly`/..., or a bare integer.
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Err(TsfoldError::config_parse("frequency", "empty value"));
        }
        if let Ok(steps) = text.parse::<i64>() {
            if steps <= 0 {
                return Err(TsfoldError::config_parse(
                    "frequency",
                    format!("step must be positive, got {}", steps),
                ));
            }
            return Ok(Frequency::Steps(steps));
        }

        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (count, unit) = text.split_at(split);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| TsfoldError::config_parse("frequency", format!("bad count in '{}'", raw)))?
        };
        if count <= 0 {
            return Err(TsfoldError::config_parse(
                "frequency",
                format!("count must be positive in '{}'", raw),
            ));
        }

        let freq = match unit.trim() {
            "s" | "sec" | "second" | "seconds" => fixed(Duration::try_seconds(count), raw)?,
            "m" | "min" | "minute" | "minutes" => fixed(Duration::try_minutes(count), raw)?,
            "h" | "hour" | "hours" | "hourly" => fixed(Duration::try_hours(count), raw)?,
            "d" | "day" | "days" | "daily" => fixed(Duration::try_days(count), raw)?,
            "w" | "week" | "weeks" | "weekly" => fixed(Duration::try_weeks(count), raw)?,
            "mo" | "month" | "months" | "monthly" => Frequency::Months(months(count, 1, raw)?),
            "q" | "quarter" | "quarters" | "quarterly" => Frequency::Months(months(count, 3, raw)?),
            "y" | "year" | "years" | "yearly" | "annual" => Frequency::Months(months(count, 12, raw)?),
            _ => {
                return Err(TsfoldError::config_parse(
                    "frequency",
                    format!("unrecognized frequency '{}'", raw),
                ))
            }
        };
        Ok(freq)
    }

    /// The configured frequency, or one day on temporal columns and one
    /// step on integer ones. Fails if the frequency cannot apply to `time`.
    pub fn resolve(configured: Option<Frequency>, time: &TimeColumn) -> Result<Self> {
        let frequency = match configured {
            Some(f) => f,
            None if time.is_temporal() => Frequency::default(),
            None => Frequency::Steps(1),
        };
        frequency.period(time)?;
        Ok(frequency)
    }

    /// Length of one period in the column's units, or `None` when the
    /// frequency is calendar based.
    pub fn period(&self, time: &TimeColumn) -> Result<Option<i64>> {
        match (self, time.is_temporal()) {
            (Frequency::Fixed(d), true) => Ok(d.num_microseconds().map(Some).ok_or_else(|| {
                TsfoldError::Configuration("frequency overflows microsecond range".to_string())
            })?),
            (Frequency::Steps(n), true) => n.checked_mul(MICROS_PER_DAY).map(Some).ok_or_else(|| {
                TsfoldError::Configuration(format!("{} day steps overflow the time range", n))
            }),
            (Frequency::Steps(n), false) => Ok(Some(*n)),
            (Frequency::Months(_), true) => Ok(None),
            (_, false) => Err(TsfoldError::Configuration(
                "calendar and duration frequencies need a DATE or TIMESTAMP time column"
                    .to_string(),
            )),
        }
    }

    /// `t` moved forward by `k` periods.
    pub fn advance(&self, time: &TimeColumn, t: i64, k: u32) -> Result<i64> {
        match self {
            Frequency::Months(m) => {
                let start = DateTime::<Utc>::from_timestamp_micros(t).ok_or_else(|| {
                    TsfoldError::Computation(format!("timestamp {} out of range", t))
                })?;
                let shifted = start
                    .checked_add_months(Months::new(m * k))
                    .ok_or_else(|| TsfoldError::Computation("date overflow".to_string()))?;
                Ok(shifted.timestamp_micros())
            }
            _ => {
                let period = self.period(time)?.ok_or_else(|| {
                    TsfoldError::Computation("fixed frequency without a period".to_string())
                })?;
                period
                    .checked_mul(i64::from(k))
                    .and_then(|offset| t.checked_add(offset))
                    .ok_or_else(|| TsfoldError::Computation(format!("{} + {} periods overflows", t, k)))
            }
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Fixed(Duration::days(1))
    }
}

fn fixed(duration: Option<Duration>, raw: &str) -> Result<Frequency> {
    duration
        .map(Frequency::Fixed)
        .ok_or_else(|| TsfoldError::config_parse("frequency", format!("'{}' is out of range", raw)))
}

fn months(count: i64, per: u32, raw: &str) -> Result<u32> {
    u32::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(per))
        .ok_or_else(|| TsfoldError::config_parse("frequency", format!("'{}' is too large", raw)))
}

/// Whole seconds, used only for logging.
pub fn describe_period(period: i64, time: &TimeColumn) -> String {
    if time.is_temporal() {
        format!("{}s", period / MICROS_PER_SECOND)
    } else {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;

    fn date_column() -> TimeColumn {
        TimeColumn::from_dtype(&DataType::Date).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(Frequency::parse("1d").unwrap(), Frequency::Fixed(Duration::days(1)));
        assert_eq!(Frequency::parse("daily").unwrap(), Frequency::Fixed(Duration::days(1)));
        assert_eq!(Frequency::parse("30min").unwrap(), Frequency::Fixed(Duration::minutes(30)));
        assert_eq!(Frequency::parse("1mo").unwrap(), Frequency::Months(1));
        assert_eq!(Frequency::parse("2q").unwrap(), Frequency::Months(6));
        assert_eq!(Frequency::parse("Yearly").unwrap(), Frequency::Months(12));
        assert_eq!(Frequency::parse("7").unwrap(), Frequency::Steps(7));
        assert!(Frequency::parse("fortnightly").is_err());
        assert!(Frequency::parse("0d").is_err());
    }

    #[test]
    fn test_huge_counts_are_parse_errors() {
        for raw in ["200000000000000d", "9000000000000000s", "99999999999999w"] {
            assert!(matches!(
                Frequency::parse(raw),
                Err(TsfoldError::ConfigParse { .. })
            ));
        }
        assert!(Frequency::parse("99999999999mo").is_err());
    }

    #[test]
    fn test_oversized_steps_and_advances_are_errors() {
        let date = date_column();
        assert!(Frequency::Steps(i64::MAX / 2).period(&date).is_err());
        let int = TimeColumn::from_dtype(&DataType::Int64).unwrap();
        assert!(Frequency::Steps(i64::MAX / 2).advance(&int, 0, 3).is_err());
        assert_eq!(Frequency::Steps(2).advance(&int, 10, 3).unwrap(), 16);
    }

    #[test]
    fn test_period_depends_on_column() {
        let date = date_column();
        let int = TimeColumn::from_dtype(&DataType::Int64).unwrap();
        assert_eq!(Frequency::parse("1d").unwrap().period(&date).unwrap(), Some(MICROS_PER_DAY));
        assert_eq!(Frequency::parse("1mo").unwrap().period(&date).unwrap(), None);
        assert_eq!(Frequency::Steps(5).period(&int).unwrap(), Some(5));
        assert!(Frequency::parse("1d").unwrap().period(&int).is_err());
    }

    #[test]
    fn test_resolve_defaults_by_column() {
        let int = TimeColumn::from_dtype(&DataType::Int32).unwrap();
        assert_eq!(Frequency::resolve(None, &int).unwrap(), Frequency::Steps(1));
        assert_eq!(Frequency::resolve(None, &date_column()).unwrap(), Frequency::default());
        assert!(Frequency::resolve(Some(Frequency::Months(1)), &int).is_err());
    }

    #[test]
    fn test_month_advance_is_calendar_aware() {
        let date = date_column();
        // 2024-01-31T00:00:00Z
        let jan31 = 1_706_659_200 * MICROS_PER_SECOND;
        let feb = Frequency::Months(1).advance(&date, jan31, 1).unwrap();
        // Clamped to 2024-02-29.
        assert_eq!(feb, 1_709_164_800 * MICROS_PER_SECOND);
    }
}
