/*!
 * Run Planning
 * Resolves this host's defaults and overrides into devices and a target
 */

use crate::batch::{BatchReport, BatchSwitchService, Operation};
use crate::driver::{BluetoothDriver, DriverFactory};
use crate::error::{Error, Result};
use crate::events::ProgressSink;
use crate::models::{AppConfig, Device, Host};

/// Name this machine goes by in `[defaults]`.
pub fn local_hostname() -> Result<String> {
    let name = nix::unistd::gethostname()
        .map_err(|e| Error::config(format!("Could not determine hostname: {e}")))?;
    Ok(name.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPlan {
    pub target_alias: String,
    pub target: Host,
    /// Device or group alias the devices came from.
    pub device_alias: String,
    pub devices: Vec<Device>,
    self_target: bool,
}

impl SwitchPlan {
    pub fn resolve(
        config: &AppConfig,
        hostname: &str,
        target: Option<&str>,
        device: Option<&str>,
    ) -> Result<Self> {
        let defaults = config.defaults.get(hostname);
        let missing_defaults =
            || Error::config(format!("Hostname '{hostname}' not in [defaults]"));

        let target_alias = target
            .or_else(|| defaults.map(|d| d.default_target.as_str()))
            .ok_or_else(&missing_defaults)?;
        let device_alias = device
            .or_else(|| defaults.map(|d| d.default_device.as_str()))
            .ok_or_else(&missing_defaults)?;

        let host = config
            .hosts
            .get(target_alias)
            .ok_or_else(|| Error::config(format!("Target '{target_alias}' not in [hosts]")))?;

        let devices = match config.devices.get(device_alias) {
            Some(device) => vec![device.clone()],
            None => config.group_devices(device_alias).ok_or_else(|| {
                Error::config(format!("Device '{device_alias}' not in [devices]"))
            })?,
        };
        if devices.is_empty() {
            return Err(Error::config(format!(
                "Group '{device_alias}' has no configured devices"
            )));
        }

        Ok(Self {
            target_alias: target_alias.to_string(),
            target: host.clone(),
            device_alias: device_alias.to_string(),
            devices,
            self_target: host.address == hostname,
        })
    }

    /// Plan for an explicit set of device aliases, as picked in the dashboard.
    pub fn for_selection(
        config: &AppConfig,
        hostname: &str,
        target_alias: &str,
        device_aliases: &[String],
    ) -> Result<Self> {
        if device_aliases.is_empty() {
            return Err(Error::config("No devices selected"));
        }

        let host = config
            .hosts
            .get(target_alias)
            .ok_or_else(|| Error::config(format!("Target '{target_alias}' not in [hosts]")))?;

        let devices = device_aliases
            .iter()
            .map(|alias| {
                config
                    .devices
                    .get(alias)
                    .cloned()
                    .ok_or_else(|| Error::config(format!("Device '{alias}' not in [devices]")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            target_alias: target_alias.to_string(),
            target: host.clone(),
            device_alias: device_aliases.join(","),
            devices,
            self_target: host.address == hostname,
        })
    }

    /// The target is this machine; there is nothing to switch.
    pub fn is_self_target(&self) -> bool {
        self.self_target
    }

    /// Builds fresh drivers for this run and executes the batch.
    pub async fn execute(&self, operation: Operation, sink: &dyn ProgressSink) -> Result<BatchReport> {
        let local = DriverFactory::create_local()?;
        let remote = DriverFactory::create(&self.target, false)?;
        self.execute_with(local.as_ref(), remote.as_ref(), operation, sink)
            .await
    }

    pub async fn execute_with(
        &self,
        local: &dyn BluetoothDriver,
        remote: &dyn BluetoothDriver,
        operation: Operation,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport> {
        BatchSwitchService::new(local, remote, &self.target_alias, sink)
            .run(&self.devices, operation)
            .await
    }
}
