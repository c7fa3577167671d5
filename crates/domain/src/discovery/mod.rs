use serde::{Deserialize, Serialize};

use crate::command::CallbackId;

/// Transport the scan is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PortType {
    #[default]
    All,
    Tcp,
    Bluetooth,
    Usb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceType {
    #[default]
    Printer,
    All,
}

/// Options forwarded to the driver when a scan starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryFilter {
    pub port_type: PortType,
    pub device_type: DeviceType,
    /// Only report devices whose name identifies them as Epson printers
    pub epson_only: bool,
    pub bonded_devices: bool,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self {
            port_type: PortType::All,
            device_type: DeviceType::Printer,
            epson_only: true,
            bonded_devices: true,
        }
    }
}

/// Device reported by a discovery scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    pub device_name: String,
    pub target: String,
    pub ip_address: String,
    pub mac_address: String,
    pub device_type: i32,
    pub bd_address: String,
}

impl DeviceInfo {
    /// Whether the device passes `filter` on the fields a driver reports
    pub fn matches(&self, filter: &DiscoveryFilter) -> bool {
        let port_ok = match filter.port_type {
            PortType::All => true,
            PortType::Tcp => self.target.to_ascii_uppercase().starts_with("TCP"),
            PortType::Bluetooth => {
                let t = self.target.to_ascii_uppercase();
                t.starts_with("BT:") || t.starts_with("BLE:")
            }
            PortType::Usb => self.target.to_ascii_uppercase().starts_with("USB:"),
        };
        let name_ok = !filter.epson_only || self.device_name.to_ascii_uppercase().starts_with("TM-");
        port_ok && name_ok
    }
}

/// Active discovery scan, at most one per bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub callback_id: CallbackId,
    pub active: bool,
}

/// Caller's token for a running scan, required to stop it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveryHandle(CallbackId);

impl DiscoveryHandle {
    pub fn new(callback_id: CallbackId) -> Self {
        Self(callback_id)
    }

    pub fn callback_id(&self) -> &CallbackId {
        &self.0
    }
}

impl std::fmt::Display for DiscoveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
