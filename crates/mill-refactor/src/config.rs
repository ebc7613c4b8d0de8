//! Configuration management for the refactoring engine

use crate::error::{RefactorError, RefactorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project-relative location of the TOML configuration file
pub const CONFIG_FILE: &str = ".typemill/refactor.toml";

/// Prefix for environment variable overrides (`TYPEMILL_REFACTOR__LOGGING__LEVEL=debug`)
pub const ENV_PREFIX: &str = "TYPEMILL_REFACTOR__";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Refactoring policy switches
    #[serde(default)]
    pub refactor: RefactorConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Policy switches consulted by the operation executors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorConfig {
    /// Export private helpers that must stay behind so moved code can import them
    #[serde(default)]
    pub export_shared_helpers: bool,
    /// Drop source imports that only the moved code used
    #[serde(default = "default_true")]
    pub prune_unused_imports: bool,
    /// Re-parse regenerated text and fail on syntax errors
    #[serde(default = "default_true")]
    pub validate_output: bool,
    /// Host-provided globals that are never reported as dependencies
    #[serde(default)]
    pub extra_globals: Vec<String>,
    /// Command schema versions accepted by the parser
    #[serde(default = "default_schema_versions")]
    pub supported_schema_versions: Vec<u32>,
}

impl Default for RefactorConfig {
    fn default() -> Self {
        Self {
            export_shared_helpers: false,
            prune_unused_imports: true,
            validate_output: true,
            extra_globals: Vec::new(),
            supported_schema_versions: default_schema_versions(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schema_versions() -> Vec<u32> {
    vec![crate::command::CURRENT_SCHEMA_VERSION]
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format for production
    Json,
}

impl EngineConfig {
    /// Load configuration from multiple sources in priority order:
    ///
    /// 1. Environment variables (`TYPEMILL_REFACTOR__*`)
    /// 2. `<project_root>/.typemill/refactor.toml`
    /// 3. Default values
    pub fn load(project_root: &Path) -> RefactorResult<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Toml},
            Figment,
        };

        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

        let toml_path = project_root.join(CONFIG_FILE);
        if toml_path.exists() {
            tracing::debug!(path = %toml_path.display(), "Loading TOML configuration");
            figment = figment.merge(Toml::file(&toml_path));
        }

        let figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .map(|k| k.as_str().replace("__", ".").to_lowercase().into()),
        );

        let config: EngineConfig = figment
            .extract()
            .map_err(|e| RefactorError::config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> RefactorResult<()> {
        if self.refactor.supported_schema_versions.is_empty() {
            return Err(RefactorError::config(
                "At least one supported schema version is required",
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(RefactorError::config(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.refactor.validate_output);
        assert!(config.refactor.prune_unused_imports);
        assert!(!config.refactor.export_shared_helpers);
        assert_eq!(config.refactor.supported_schema_versions, vec![1]);
    }

    #[test]
    fn loads_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".typemill")).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[refactor]\nexportSharedHelpers = true\nextraGlobals = [\"chrome\"]\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = EngineConfig::load(dir.path()).unwrap();
        assert!(config.refactor.export_shared_helpers);
        assert_eq!(config.refactor.extra_globals, vec!["chrome".to_string()]);
        assert_eq!(config.logging.level, "debug");
        assert!(config.refactor.validate_output);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = EngineConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(RefactorError::Config { .. })
        ));
    }
}
