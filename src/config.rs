use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the auction lifecycle service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Lifecycle timing settings
    pub lifecycle: LifecycleSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// How long before `ends_at` the system sweep moves an active auction
    /// into `ending`
    pub ending_window_seconds: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            ending_window_seconds: 300, // 5 minutes
        }
    }
}

impl LifecycleSettings {
    /// The window as a duration, saturating at `Duration::MAX`
    pub fn ending_window(&self) -> chrono::Duration {
        i64::try_from(self.ending_window_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

pub const CONFIG_FILE: &str = "auction-lifecycle.toml";
pub const ENV_PREFIX: &str = "AUCTION_LIFECYCLE";

impl LifecycleConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. auction-lifecycle.toml in the working directory
    /// 3. Environment variables (AUCTION_LIFECYCLE_SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();

        let config = LifecycleConfig::load_from(&dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
        assert_eq!(config.lifecycle.ending_window_seconds, 300);
        assert_eq!(config.lifecycle.ending_window(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auction-lifecycle.toml");
        std::fs::write(
            &path,
            "[lifecycle]\nending_window_seconds = 60\n\n[observability]\njson_logs = true\n",
        )
        .unwrap();

        let config = LifecycleConfig::load_from(&path).unwrap();

        assert_eq!(config.lifecycle.ending_window_seconds, 60);
        assert!(config.observability.json_logs);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_oversized_window_saturates() {
        let mut settings = LifecycleSettings::default();

        settings.ending_window_seconds = u64::MAX;
        assert_eq!(settings.ending_window(), chrono::Duration::MAX);

        settings.ending_window_seconds = i64::MAX as u64 / 10;
        assert_eq!(settings.ending_window(), chrono::Duration::MAX);

        settings.ending_window_seconds = 86_400;
        assert_eq!(settings.ending_window(), chrono::Duration::days(1));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auction-lifecycle.toml");
        let mut config = LifecycleConfig::default();
        config.observability.log_level = "debug".to_string();

        config.save_to_file(&path).unwrap();
        let loaded = LifecycleConfig::load_from(&path).unwrap();

        assert_eq!(loaded.observability.log_level, "debug");
    }
}
