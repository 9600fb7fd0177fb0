//! Configuration file handling for sovd-scan

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sovd_scan::config::MockConfig;
use sovd_scan::{ExecuteOptions, TransportConfig};
use std::path::{Path, PathBuf};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Enumeration options; command-line flags override single values
    pub options: Option<ExecuteOptions>,
    /// Transport used when no transport flags are given
    pub transport: Option<TransportConfig>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        if let Some(options) = &config.options {
            options
                .validate()
                .with_context(|| format!("Invalid options in {}", path.display()))?;
        }
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("sovd-scan");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, output: Option<&str>, no_color: bool) -> MergedConfig {
        MergedConfig {
            output: output
                .map(String::from)
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| "table".to_string()),
            no_color: no_color || self.no_color.unwrap_or(false),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub output: String,
    pub no_color: bool,
}

/// Load a scripted mock transport description (`latency_ms`, `[[responses]]`)
pub fn load_mock(path: &Path) -> Result<MockConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mock file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse mock file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_file(
            r#"
output = "json"

[options]
timeout = 0.25
exit_if_service_not_supported = true

[transport]
type = "socketcan"
interface = "vcan0"
tx_id = "0x7E0"
rx_id = "0x7E8"
"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        let options = config.options.unwrap();
        assert_eq!(options.timeout, Duration::from_millis(250));
        assert!(options.exit_if_service_not_supported);
        assert!(matches!(config.transport, Some(TransportConfig::SocketCan(_))));

        let merged = Config {
            output: Some("json".into()),
            ..Default::default()
        }
        .merge_with_args(None, false);
        assert_eq!(merged.output, "json");
    }

    #[test]
    fn test_unknown_option_rejected() {
        let file = write_file("[options]\nretry_forever = true\n");
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_invalid_option_rejected() {
        let file = write_file("[options]\ntimeout = 0\n");
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_load_mock() {
        let file = write_file(
            r#"
latency_ms = 2

[[responses]]
request = "22 F1 90"
response = "62 F1 90 57 30"
"#,
        );
        let mock = load_mock(file.path()).unwrap();
        assert_eq!(mock.latency_ms, 2);
        assert_eq!(mock.responses[0].response, "62 F1 90 57 30");
    }
}
