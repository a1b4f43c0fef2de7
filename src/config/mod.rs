pub mod engine;
pub mod job;
pub mod manager;
pub mod options;
pub mod traits;

pub use engine::EngineConfig;
pub use job::{JobConfig, OperatorKind};
pub use manager::{AppConfig, ConfigManager};
pub use options::OperatorOptions;
pub use traits::ConfigSection;
