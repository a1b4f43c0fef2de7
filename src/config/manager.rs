use super::{engine::EngineConfig, job::JobConfig, traits::ConfigSection};
use crate::error::TsfoldError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub job: JobConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), TsfoldError> {
        self.engine.validate()?;
        self.job.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Reads a TOML file, then applies `TSFOLD__SECTION__KEY` overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TsfoldError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TSFOLD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| TsfoldError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| TsfoldError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        log::info!(
            "loaded {} and {} sections from {}",
            EngineConfig::section_name(),
            JobConfig::section_name(),
            path.as_ref().display()
        );

        *self.config.write().map_err(|_| poisoned())? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TsfoldError> {
        let config = self.config.read().map_err(|_| poisoned())?;
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| TsfoldError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| TsfoldError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, TsfoldError> {
        Ok(self.config.read().map_err(|_| poisoned())?.clone())
    }

    /// Applies `f` and keeps the result only if it still validates.
    pub fn update<F>(&self, f: F) -> Result<(), TsfoldError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().map_err(|_| poisoned())?;
        let mut next = config.clone();
        f(&mut next);
        next.validate()?;
        *config = next;
        Ok(())
    }
}

fn poisoned() -> TsfoldError {
    TsfoldError::Configuration("config lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorKind;

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = std::env::temp_dir().join(format!("tsfold-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("job.toml");
        std::fs::write(
            &path,
            r#"
[engine]
workers = 2

[job]
operator = "cv_split"
input = "sales.csv"
columns = ["store", "date", "sales"]

[job.options]
horizon = 3
window_type = "sliding"
"#,
        )
        .unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get().unwrap();
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.batch_capacity, 2048);
        assert_eq!(config.job.operator, OperatorKind::CvSplit);
        assert_eq!(config.job.options["horizon"], serde_json::json!(3));

        let saved = dir.join("saved.toml");
        manager.save_to_file(&saved).unwrap();
        let text = std::fs::read_to_string(&saved).unwrap();
        assert!(text.contains("cv_split"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_update_rejects_invalid_values() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| {
            c.engine.workers = 0;
            c.job.input = "x.csv".into();
        });
        assert!(result.is_err());
        assert_eq!(manager.get().unwrap().engine.workers, 4);

        manager.update(|c| c.job.input = "override.csv".into()).unwrap();
        assert_eq!(manager.get().unwrap().job.input.to_str(), Some("override.csv"));
    }
}
