pub mod csv;
pub mod frequency;
pub mod schema;
pub mod time;

pub use csv::CsvConnector;
pub use frequency::{describe_period, Frequency};
pub use schema::{schema_of, ColumnSpec, InputLayout};
pub use time::{TimeColumn, TimeKind, MICROS_PER_DAY};
