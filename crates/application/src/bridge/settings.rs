use domain::command::PayloadLimits;
use infrastructure::BridgeConfig;
use std::time::Duration;

/// Runtime knobs of the bridge
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub connect_timeout: Duration,
    /// How long an accepted command may wait for completion
    pub command_timeout: Duration,
    /// Read printer status before each command
    pub check_status: bool,
    pub limits: PayloadLimits,
    /// Scans end on their own after this long
    pub discovery_timeout: Option<Duration>,
    pub stop_retry_limit: u32,
    pub stop_retry_delay: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

impl BridgeSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.session.connect_timeout_ms),
            command_timeout: Duration::from_millis(config.commands.timeout_ms),
            check_status: config.commands.check_status,
            limits: config.commands.limits(),
            discovery_timeout: config.discovery.timeout_secs.map(Duration::from_secs),
            stop_retry_limit: config.discovery.stop_retry_limit,
            stop_retry_delay: Duration::from_millis(config.discovery.stop_retry_delay_ms),
        }
    }
}
