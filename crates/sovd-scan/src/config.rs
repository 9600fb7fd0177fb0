//! Enumeration and transport configuration
//!
//! [`ExecuteOptions`] replaces a free-form keyword bag with an explicit set of
//! recognized options. Unknown keys are rejected when parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Execution Options
// =============================================================================

/// Options for one `execute` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExecuteOptions {
    /// Per-exchange response timeout (seconds)
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Wall-clock budget for one `execute` call (seconds)
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
    /// Stop when a request gets no answer
    pub exit_if_no_answer_received: bool,
    /// Mark the state completed and stop on "service not supported"
    pub exit_if_service_not_supported: bool,
    /// Resend a request once when the device reports busy
    pub retry_if_busy_returncode: bool,
    /// Terminate the whole enumerator on the first negative response
    pub exit_scan_on_first_negative_response: bool,
    /// Parameters passed to the request generator
    pub request: RequestOptions,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            execution_time: Duration::from_secs(1200),
            exit_if_no_answer_received: false,
            exit_if_service_not_supported: false,
            retry_if_busy_returncode: true,
            exit_scan_on_first_negative_response: false,
            request: RequestOptions::default(),
        }
    }
}

impl ExecuteOptions {
    /// Parse options from TOML and validate them
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn with_scan_range(mut self, start: u32, end: u32) -> Self {
        self.request.scan_range = Some(ScanRange { start, end });
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                option: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(range) = &self.request.scan_range {
            range.validate()?;
        }
        Ok(())
    }
}

/// Parameters for the initial-request generator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RequestOptions {
    /// Inclusive identifier range to enumerate; the catalog default if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_range: Option<ScanRange>,
}

/// Inclusive identifier range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanRange {
    pub start: u32,
    pub end: u32,
}

impl ScanRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::Invalid {
                option: "request.scan_range".to_string(),
                message: format!("start 0x{:X} is above end 0x{:X}", self.start, self.end),
            });
        }
        Ok(())
    }

    /// Parse `"start:end"`, each side decimal or `0x` hex
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let (start, end) = s.split_once(':').ok_or_else(|| ConfigError::Invalid {
            option: "scan_range".to_string(),
            message: format!("expected start:end, got '{}'", s),
        })?;
        let range = Self::new(parse_number(start)?, parse_number(end)?);
        range.validate()?;
        Ok(range)
    }
}

/// Parse a number from string (supports hex with 0x prefix)
fn parse_number(s: &str) -> Result<u32, ConfigError> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    u32::from_str_radix(digits, radix).map_err(|e| ConfigError::Invalid {
        option: "scan_range".to_string(),
        message: format!("invalid number '{}': {}", s, e),
    })
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// SocketCAN with ISO-TP (Linux only)
    SocketCan(SocketCanConfig),
    /// Scripted transport for testing and dry runs
    Mock(MockConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Mock(MockConfig::default())
    }
}

/// SocketCAN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketCanConfig {
    /// CAN interface name (e.g., "can0")
    pub interface: String,
    /// Transmit CAN ID (tester -> ECU)
    pub tx_id: String,
    /// Receive CAN ID (ECU -> tester)
    pub rx_id: String,
}

/// Mock transport configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Simulated latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
    /// Scripted answers; requests without an entry get no answer
    #[serde(default)]
    pub responses: Vec<MockResponseConfig>,
}

/// One scripted request/response pair (hex strings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponseConfig {
    pub request: String,
    pub response: String,
}
