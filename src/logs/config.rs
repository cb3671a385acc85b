//! Configuration for the logging facade

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Errors raised while turning a [`Config`] into a logger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("rotation settings must be given when output is \"file\"")]
    MissingRotation,
    #[error("unsupported output kind: {0:?}")]
    UnsupportedOutput(String),
}

/// Where records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    /// Colored, human-readable records on stdout
    #[default]
    Console,
    /// JSON records in a rotating file
    File,
}

impl Output {
    pub fn as_str(&self) -> &'static str {
        match self {
            Output::Console => "console",
            Output::File => "file",
        }
    }
}

impl FromStr for Output {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Output::Console),
            "file" => Ok(Output::File),
            _ => Err(ConfigError::UnsupportedOutput(s.to_string())),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the rotating file sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// File to write to. Backups are kept next to it.
    #[serde(default = "default_filename")]
    pub filename: PathBuf,

    /// Size in megabytes at which the file is rotated (default: 100)
    #[serde(default = "default_max_size_mb", alias = "maxsize")]
    pub max_size_mb: u64,

    /// Days to keep backups; 0 keeps them regardless of age
    #[serde(default, alias = "maxage")]
    pub max_age_days: u64,

    /// Number of backups to keep; 0 keeps all of them
    #[serde(default, alias = "maxbackups")]
    pub max_backups: usize,

    /// Gzip backups after rotation
    #[serde(default)]
    pub compress: bool,

    /// Use local time rather than UTC in backup names
    #[serde(default, alias = "localtime")]
    pub local_time: bool,
}

fn default_filename() -> PathBuf {
    let name = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "appkit".to_string());
    std::env::temp_dir().join(format!("{}.log", name))
}

fn default_max_size_mb() -> u64 {
    100
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            max_size_mb: default_max_size_mb(),
            max_age_days: 0,
            max_backups: 0,
            compress: false,
            local_time: false,
        }
    }
}

impl RotationConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Maximum file size in bytes. A size of 0 means the default of 100 MB.
    pub fn max_size_bytes(&self) -> u64 {
        let mb = match self.max_size_mb {
            0 => default_max_size_mb(),
            mb => mb,
        };
        mb.saturating_mul(1024 * 1024)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum severity name; unrecognized names mean "info"
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub output: Output,

    /// Required when `output` is `file`, ignored otherwise
    #[serde(default, alias = "lumberjack")]
    pub rotation: Option<RotationConfig>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: default_level(),
            output: Output::Console,
            rotation: None,
        }
    }
}

impl Config {
    /// Console configuration at the given level
    pub fn console(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            output: Output::Console,
            rotation: None,
        }
    }

    /// Rotating file configuration at the given level
    pub fn file(level: impl Into<String>, rotation: RotationConfig) -> Self {
        Self {
            level: level.into(),
            output: Output::File,
            rotation: Some(rotation),
        }
    }

    /// Check the output/rotation invariant
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.output, &self.rotation) {
            (Output::File, None) => Err(ConfigError::MissingRotation),
            _ => Ok(()),
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse logging config")
    }

    /// Load configuration from a TOML file, or return the default if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read logging config file")?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.output, Output::Console);
        assert!(config.rotation.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_without_rotation_is_invalid() {
        let config = Config {
            level: "info".to_string(),
            output: Output::File,
            rotation: None,
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingRotation));
    }

    #[test]
    fn test_console_with_rotation_is_valid() {
        let mut config = Config::console("debug");
        config.rotation = Some(RotationConfig::new("/tmp/ignored.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_from_str() {
        assert_eq!("console".parse::<Output>().unwrap(), Output::Console);
        assert_eq!("FILE".parse::<Output>().unwrap(), Output::File);
        assert_eq!(
            "syslog".parse::<Output>(),
            Err(ConfigError::UnsupportedOutput("syslog".to_string()))
        );
    }

    #[test]
    fn test_parse_toml_with_rotation() {
        let config = Config::from_toml_str(
            r#"
            level = "warn"
            output = "file"

            [rotation]
            filename = "./app.log"
            max_size_mb = 20
            max_age_days = 1
            max_backups = 3
            compress = true
            "#,
        )
        .unwrap();

        assert_eq!(config.level, "warn");
        assert_eq!(config.output, Output::File);
        let rotation = config.rotation.unwrap();
        assert_eq!(rotation.filename, PathBuf::from("./app.log"));
        assert_eq!(rotation.max_size_mb, 20);
        assert_eq!(rotation.max_age_days, 1);
        assert_eq!(rotation.max_backups, 3);
        assert!(rotation.compress);
        assert!(!rotation.local_time);
    }

    #[test]
    fn test_parse_toml_lumberjack_alias() {
        let config = Config::from_toml_str(
            r#"
            output = "file"

            [lumberjack]
            filename = "x.log"
            maxsize = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.rotation.unwrap().max_size_mb, 5);
    }

    #[test]
    fn test_parse_toml_rejects_unknown_output() {
        assert!(Config::from_toml_str("output = \"syslog\"").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::file("debug", RotationConfig::new("app.log"));
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&temp_dir.path().join("logs.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.toml");
        std::fs::write(&path, "level = \"error\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.level, "error");
    }

    #[test]
    fn test_max_size_bytes() {
        let mut rotation = RotationConfig::new("a.log");
        rotation.max_size_mb = 2;
        assert_eq!(rotation.max_size_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_zero_max_size_uses_default() {
        let mut rotation = RotationConfig::new("a.log");
        rotation.max_size_mb = 0;
        assert_eq!(rotation.max_size_bytes(), 100 * 1024 * 1024);
    }
}
