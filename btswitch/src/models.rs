/*!
 * Configuration records: devices, hosts, defaults, groups
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A Bluetooth peripheral. `mac` is the key for every driver call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    pub mac: String,
    pub name: String,
}

impl Device {
    pub fn new(mac: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Local,
    #[default]
    Ssh,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Local => "local",
            TransportKind::Ssh => "ssh",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(TransportKind::Local),
            "ssh" => Ok(TransportKind::Ssh),
            other => Err(Error::config(format!("Unsupported protocol: {other}"))),
        }
    }
}

/// Which peripheral-control backend a host runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Bluez,
    Macos,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Bluez => "bluez",
            BackendKind::Macos => "macos",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bluez" => Ok(BackendKind::Bluez),
            "macos" => Ok(BackendKind::Macos),
            other => Err(Error::config(format!("Unsupported driver: {other}"))),
        }
    }
}

/// A machine a device can be moved to or from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Host {
    pub address: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub protocol: TransportKind,
    #[serde(default)]
    pub driver_type: BackendKind,
}

impl Host {
    pub fn new(address: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            protocol: TransportKind::default(),
            driver_type: BackendKind::default(),
        }
    }

    /// The machine bt-switch is running on.
    pub fn local() -> Self {
        Self {
            address: "localhost".to_string(),
            user: String::new(),
            protocol: TransportKind::Local,
            driver_type: BackendKind::Bluez,
        }
    }

    /// ssh destination: `user@address`, or the bare address when no user is set.
    pub fn destination(&self) -> String {
        if self.user.is_empty() {
            self.address.clone()
        } else {
            format!("{}@{}", self.user, self.address)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DefaultSettings {
    /// Device alias or group alias.
    pub default_device: String,
    pub default_target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub devices: BTreeMap<String, Device>,
    #[serde(default)]
    pub hosts: BTreeMap<String, Host>,
    #[serde(default)]
    pub defaults: BTreeMap<String, DefaultSettings>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl AppConfig {
    /// Devices of a group in group order. Members that are not configured are skipped.
    pub fn group_devices(&self, group: &str) -> Option<Vec<Device>> {
        self.groups.get(group).map(|members| {
            members
                .iter()
                .filter_map(|alias| self.devices.get(alias).cloned())
                .collect()
        })
    }
}
