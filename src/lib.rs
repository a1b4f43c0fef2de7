pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod model;
pub mod operators;
pub mod types;

pub use error::{Result, TsfoldError};
