use config::{Config, ConfigError, Environment, File};
use domain::DeviceInfo;
use domain::command::PayloadLimits;
use domain::driver::DriverType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriverConfig {
    #[serde(default)]
    pub r#type: DriverType,
    /// TCP port used when a network target carries none
    #[serde(default = "default_printer_port")]
    pub port: u16,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Required if type is "File"
    pub path: Option<String>,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            r#type: DriverType::default(),
            port: default_printer_port(),
            io_timeout_ms: default_io_timeout_ms(),
            path: None,
            simulator: SimulatorConfig::default(),
        }
    }
}

fn default_printer_port() -> u16 {
    9100
}
fn default_io_timeout_ms() -> u64 {
    5_000
}

/// Behaviour of the simulated printer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_job_latency_ms")]
    pub job_latency_ms: u64,
    /// When false, accepted jobs never report completion
    #[serde(default = "default_true")]
    pub complete_jobs: bool,
    /// Driver code every job fails with
    #[serde(default)]
    pub fail_jobs_with: Option<i32>,
    /// Driver code every connection attempt fails with
    #[serde(default)]
    pub fail_connect_with: Option<i32>,
    #[serde(default)]
    pub offline: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            job_latency_ms: default_job_latency_ms(),
            complete_jobs: true,
            fail_jobs_with: None,
            fail_connect_with: None,
            offline: false,
        }
    }
}

fn default_job_latency_ms() -> u64 {
    50
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Model name used when a caller names none or an unknown one
    #[serde(default = "default_series")]
    pub default_series: String,
    #[serde(default)]
    pub default_language: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            default_series: default_series(),
            default_language: 0,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    15_000
}
fn default_series() -> String {
    "TM-T88".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CommandConfig {
    /// Time an accepted job may stay in flight before it fails
    #[serde(default = "default_command_timeout_ms")]
    pub timeout_ms: u64,
    /// Refuse jobs while the printer reports it cannot print
    #[serde(default = "default_true")]
    pub check_status: bool,
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_max_raw_bytes")]
    pub max_raw_bytes: usize,
}

impl CommandConfig {
    pub fn limits(&self) -> PayloadLimits {
        PayloadLimits {
            max_text_chars: self.max_text_chars,
            max_image_bytes: self.max_image_bytes,
            max_raw_bytes: self.max_raw_bytes,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_command_timeout_ms(),
            check_status: true,
            max_text_chars: default_max_text_chars(),
            max_image_bytes: default_max_image_bytes(),
            max_raw_bytes: default_max_raw_bytes(),
        }
    }
}

fn default_command_timeout_ms() -> u64 {
    30_000
}
fn default_max_text_chars() -> usize {
    PayloadLimits::default().max_text_chars
}
fn default_max_image_bytes() -> usize {
    PayloadLimits::default().max_image_bytes
}
fn default_max_raw_bytes() -> usize {
    PayloadLimits::default().max_raw_bytes
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscoveryConfig {
    /// Scan ends on its own after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_stop_retry_limit")]
    pub stop_retry_limit: u32,
    #[serde(default = "default_stop_retry_delay_ms")]
    pub stop_retry_delay_ms: u64,
    /// Delay between devices reported by the simulated scanner
    #[serde(default = "default_scan_interval_ms")]
    pub interval_ms: u64,
    /// Devices reported by the simulated scanner
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            stop_retry_limit: default_stop_retry_limit(),
            stop_retry_delay_ms: default_stop_retry_delay_ms(),
            interval_ms: default_scan_interval_ms(),
            devices: Vec::new(),
        }
    }
}

fn default_stop_retry_limit() -> u32 {
    10
}
fn default_stop_retry_delay_ms() -> u64 {
    100
}
fn default_scan_interval_ms() -> u64 {
    200
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl BridgeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("driver.type", "Simulator")?
            // Base file, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per run mode overrides, e.g. config/production.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. EPOS__DRIVER__PORT=9101)
            .add_source(
                Environment::with_prefix("EPOS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
