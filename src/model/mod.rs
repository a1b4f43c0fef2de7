//! Numeric model contract plus a small reference library.
//!
//! Operators only ever talk to [`Model`]; the baseline forecasters, the
//! moving-average decomposition and [`describe`] exist so the engine can run
//! without an external library.

pub mod baseline;
pub mod stats;
pub mod types;

pub use baseline::{BaselineMethod, BaselineModels};
pub use stats::{describe, SeriesStats};
pub use types::{
    Decomposition, Model, ModelErrorCode, ModelFailure, ModelMetadata, ModelOptions, ModelOutput,
    ValidityMask,
};
