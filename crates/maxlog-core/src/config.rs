//! # Configuration System
//!
//! YAML configuration for applications embedding the kernel:
//!
//! - Vector backend selection (auto-detect or forced)
//! - Backward normalization policy
//! - Trellis boundary states
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `MAXLOG_CONFIG` environment variable
//! 2. `./maxlog.yaml` (current directory)
//! 3. `~/.config/maxlog/config.yaml` (user config)
//! 4. `/etc/maxlog/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! backend: auto
//! normalization:
//!   policy: forward_capture
//! initial_state:
//!   kind: known
//!   state: 0
//! terminal_state:
//!   kind: unknown
//! logging:
//!   level: debug
//!   format: compact
//! ```

use crate::bcjr::NormPolicy;
use crate::logging::LogConfig;
use crate::simd::Backend;
use crate::trellis::{TrellisState, NUM_STATES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "MAXLOG_CONFIG";

const SUPPORTED_VERSION: &str = "1.0";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Backend requested by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Best backend of the running CPU
    #[default]
    Auto,
    Scalar,
    Ssse3,
    Sse41,
}

impl BackendChoice {
    pub fn resolve(self) -> Backend {
        match self {
            BackendChoice::Auto => Backend::detect(),
            BackendChoice::Scalar => Backend::Scalar,
            BackendChoice::Ssse3 => Backend::Ssse3,
            BackendChoice::Sse41 => Backend::Sse41,
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::Auto => f.write_str("auto"),
            other => f.write_str(other.resolve().name()),
        }
    }
}

/// Complete kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Configuration version
    pub version: String,
    pub backend: BackendChoice,
    /// Backward normalization policy
    pub normalization: NormPolicy,
    /// Encoder state at the start of every block
    pub initial_state: TrellisState,
    /// Encoder state at the end of every block
    pub terminal_state: TrellisState,
    pub logging: LogConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION.to_string(),
            backend: BackendChoice::Auto,
            normalization: NormPolicy::ForwardCapture,
            initial_state: TrellisState::Known(0),
            terminal_state: TrellisState::Unknown,
            logging: LogConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), backend = %config.backend, "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))
    }

    /// Candidate files after the environment variable, in search order.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./maxlog.yaml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "maxlog") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/maxlog/config.yaml"));
        paths
    }

    /// Validate the configuration.
    ///
    /// Backend availability depends on the CPU and is checked when a kernel
    /// is built, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::Validation(format!(
                "unsupported version '{}', expected '{}'",
                self.version, SUPPORTED_VERSION
            )));
        }

        for (name, state) in [
            ("initial_state", self.initial_state),
            ("terminal_state", self.terminal_state),
        ] {
            if let TrellisState::Known(s) = state {
                if s as usize >= NUM_STATES {
                    return Err(ConfigError::Validation(format!(
                        "{name} must be between 0 and {}, got {s}",
                        NUM_STATES - 1
                    )));
                }
            }
        }

        if let Some(filter) = &self.logging.filter {
            EnvFilter::try_new(filter)
                .map_err(|e| ConfigError::Validation(format!("logging.filter: {e}")))?;
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            normalization: NormPolicy::ForwardCapture,
            terminal_state: TrellisState::Known(0),
            logging: LogConfig::production(),
            ..Default::default()
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcjr::MapDecoder;
    use crate::logging::LogLevel;
    use crate::types::KernelError;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert_eq!(config.backend, BackendChoice::Auto);
        assert_eq!(config.initial_state, TrellisState::Known(0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
backend: scalar
normalization:
  policy: fixed
  value: 0
initial_state:
  kind: unknown
terminal_state:
  kind: known
  state: 0
logging:
  level: debug
"#;
        let config = KernelConfig::parse(yaml).unwrap();
        assert_eq!(config.backend, BackendChoice::Scalar);
        assert_eq!(config.normalization, NormPolicy::Fixed(0));
        assert_eq!(config.initial_state, TrellisState::Unknown);
        assert_eq!(config.terminal_state, TrellisState::Known(0));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = KernelConfig::parse("backend: sse41\n").unwrap();
        assert_eq!(config.backend, BackendChoice::Sse41);
        assert_eq!(config.version, "1.0");
        assert_eq!(config.normalization, NormPolicy::ForwardCapture);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            KernelConfig::parse("backend: avx9000\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = KernelConfig::default();
        config.terminal_state = TrellisState::Known(8);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = KernelConfig::default();
        config.version = "0.3".to_string();
        assert!(config.validate().is_err());

        let mut config = KernelConfig::default();
        config.logging.filter = Some("maxlog_core=loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_yaml() {
        let yaml = KernelConfig::example_yaml();
        assert!(yaml.contains("backend: auto"));
        let parsed = KernelConfig::parse(&yaml).unwrap();
        assert_eq!(parsed.terminal_state, TrellisState::Known(0));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("maxlog-config-{}.yaml", std::process::id()));
        let config = KernelConfig {
            backend: BackendChoice::Scalar,
            normalization: NormPolicy::Fixed(3),
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = KernelConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = KernelConfig::load_from(Path::new("/nonexistent/maxlog.yaml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read config"));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = KernelConfig::config_search_paths();
        assert!(paths[0].ends_with("maxlog.yaml"));
        assert!(paths.last().unwrap().starts_with("/etc/maxlog"));
    }

    #[test]
    fn test_decoder_from_config() {
        let config = KernelConfig {
            backend: BackendChoice::Scalar,
            normalization: NormPolicy::Fixed(0),
            ..Default::default()
        };
        let decoder = MapDecoder::from_config(&config).unwrap();
        assert_eq!(decoder.kernel().backend(), Backend::Scalar);
        assert_eq!(decoder.policy(), NormPolicy::Fixed(0));

        let mut bad = config;
        bad.initial_state = TrellisState::Known(11);
        assert!(matches!(
            MapDecoder::from_config(&bad),
            Err(KernelError::Config(ConfigError::Validation(_)))
        ));
    }

    #[test]
    fn test_backend_choice_display() {
        assert_eq!(BackendChoice::Auto.to_string(), "auto");
        assert_eq!(BackendChoice::Ssse3.to_string(), "ssse3");
    }
}
