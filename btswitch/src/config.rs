/*!
 * Configuration file handling
 * TOML store for devices, hosts, groups and per-host defaults
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{AppConfig, DefaultSettings, Device, Host};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BT_SWITCH_CONFIG";

pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::config("Could not determine the user config directory"))?;
    Ok(dir.join("bt_switch").join("config.toml"))
}

/// Strict load for switching: the file has to exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(Error::config(format!(
            "Config not found at {}",
            path.display()
        )));
    }
    parse(&fs::read_to_string(path)?)
}

fn parse(content: &str) -> Result<AppConfig> {
    toml::from_str(content).map_err(|e| Error::config(format!("Config parse error: {e}")))
}

/// Read-modify-write access to the config file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }
        parse(&fs::read_to_string(&self.path)?)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(config)?)?;
        tracing::debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig) -> Result<()>,
    {
        let mut config = self.load()?;
        change(&mut config)?;
        self.save(&config)
    }

    // Devices

    pub fn list_devices(&self) -> Result<BTreeMap<String, Device>> {
        Ok(self.load()?.devices)
    }

    pub fn add_device(&self, alias: &str, mac: &str, name: &str) -> Result<()> {
        self.update(|config| {
            if config.devices.contains_key(alias) {
                return Err(Error::config(format!("Device '{alias}' already exists")));
            }
            config
                .devices
                .insert(alias.to_string(), Device::new(mac, name));
            Ok(())
        })
    }

    pub fn remove_device(&self, alias: &str) -> Result<()> {
        self.update(|config| {
            config
                .devices
                .remove(alias)
                .map(|_| ())
                .ok_or_else(|| Error::config(format!("Device '{alias}' not found")))
        })
    }

    // Hosts

    pub fn list_hosts(&self) -> Result<BTreeMap<String, Host>> {
        Ok(self.load()?.hosts)
    }

    pub fn add_host(&self, alias: &str, host: Host) -> Result<()> {
        self.update(|config| {
            if config.hosts.contains_key(alias) {
                return Err(Error::config(format!("Host '{alias}' already exists")));
            }
            config.hosts.insert(alias.to_string(), host);
            Ok(())
        })
    }

    pub fn remove_host(&self, alias: &str) -> Result<()> {
        self.update(|config| {
            config
                .hosts
                .remove(alias)
                .map(|_| ())
                .ok_or_else(|| Error::config(format!("Host '{alias}' not found")))
        })
    }

    // Groups

    pub fn list_groups(&self) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.load()?.groups)
    }

    pub fn add_group(&self, alias: &str, members: &[String]) -> Result<()> {
        self.update(|config| {
            if let Some(missing) = members.iter().find(|m| !config.devices.contains_key(*m)) {
                return Err(Error::config(format!(
                    "Device '{missing}' not found in configuration"
                )));
            }
            if config.groups.contains_key(alias) {
                return Err(Error::config(format!("Group '{alias}' already exists")));
            }
            config.groups.insert(alias.to_string(), members.to_vec());
            Ok(())
        })
    }

    pub fn remove_group(&self, alias: &str) -> Result<()> {
        self.update(|config| {
            config
                .groups
                .remove(alias)
                .map(|_| ())
                .ok_or_else(|| Error::config(format!("Group '{alias}' not found")))
        })
    }

    /// Replaces group `alias` with `new_alias` and `members` in one write.
    /// Nothing is saved if validation fails, so the old group stays intact.
    pub fn update_group(&self, alias: &str, new_alias: &str, members: &[String]) -> Result<()> {
        self.update(|config| {
            if !config.groups.contains_key(alias) {
                return Err(Error::config(format!("Group '{alias}' not found")));
            }
            if let Some(missing) = members.iter().find(|m| !config.devices.contains_key(*m)) {
                return Err(Error::config(format!(
                    "Device '{missing}' not found in configuration"
                )));
            }
            if new_alias != alias && config.groups.contains_key(new_alias) {
                return Err(Error::config(format!("Group '{new_alias}' already exists")));
            }
            config.groups.remove(alias);
            config.groups.insert(new_alias.to_string(), members.to_vec());
            Ok(())
        })
    }

    // Defaults

    pub fn list_defaults(&self) -> Result<BTreeMap<String, DefaultSettings>> {
        Ok(self.load()?.defaults)
    }

    /// `device` may name a device or a group.
    pub fn set_default(&self, hostname: &str, device: &str, target: &str) -> Result<()> {
        self.update(|config| {
            if !config.devices.contains_key(device) && !config.groups.contains_key(device) {
                return Err(Error::config(format!(
                    "Device '{device}' not found in configuration"
                )));
            }
            if !config.hosts.contains_key(target) {
                return Err(Error::config(format!(
                    "Host '{target}' not found in configuration"
                )));
            }
            config.defaults.insert(
                hostname.to_string(),
                DefaultSettings {
                    default_device: device.to_string(),
                    default_target: target.to_string(),
                },
            );
            Ok(())
        })
    }

    pub fn remove_default(&self, hostname: &str) -> Result<()> {
        self.update(|config| {
            config
                .defaults
                .remove(hostname)
                .map(|_| ())
                .ok_or_else(|| Error::config(format!("Defaults for '{hostname}' not found")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransportKind;
    use tempfile::TempDir;

    fn store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("bt_switch").join("config.toml"));
        (dir, store)
    }

    #[test]
    fn test_empty_config() {
        let (_dir, store) = store();
        assert!(store.list_devices().unwrap().is_empty());
        assert!(store.list_hosts().unwrap().is_empty());
        assert!(store.list_defaults().unwrap().is_empty());
        assert!(store.list_groups().unwrap().is_empty());
    }

    #[test]
    fn test_add_device_writes_file() {
        let (_dir, store) = store();
        store
            .add_device("headphones", "00:11:22:33:44:55", "My Headphones")
            .unwrap();

        let devices = store.list_devices().unwrap();
        assert_eq!(devices["headphones"].mac, "00:11:22:33:44:55");
        assert_eq!(devices["headphones"].name, "My Headphones");

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains(r#"mac = "00:11:22:33:44:55""#));
    }

    #[test]
    fn test_add_device_duplicate() {
        let (_dir, store) = store();
        store.add_device("d1", "aa", "n1").unwrap();
        let err = store.add_device("d1", "bb", "n2").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_remove_device() {
        let (_dir, store) = store();
        store.add_device("d1", "aa", "n1").unwrap();
        store.remove_device("d1").unwrap();
        assert!(!store.list_devices().unwrap().contains_key("d1"));

        let err = store.remove_device("nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "Device 'nonexistent' not found");
    }

    #[test]
    fn test_hosts() {
        let (_dir, store) = store();
        store.add_host("h1", Host::new("1.2.3.4", "root")).unwrap();

        let hosts = store.list_hosts().unwrap();
        assert_eq!(hosts["h1"].address, "1.2.3.4");
        assert_eq!(hosts["h1"].protocol, TransportKind::Ssh);

        let err = store.add_host("h1", Host::new("2.2.2.2", "u")).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        store.remove_host("h1").unwrap();
        assert!(store.list_hosts().unwrap().is_empty());
        assert!(store.remove_host("h1").is_err());
    }

    #[test]
    fn test_add_list_remove_group() {
        let (_dir, store) = store();
        store.add_device("dev1", "00:11:22:33:44:55", "Device 1").unwrap();
        store.add_device("dev2", "AA:BB:CC:DD:EE:FF", "Device 2").unwrap();

        store
            .add_group("my_group", &["dev1".to_string(), "dev2".to_string()])
            .unwrap();
        let groups = store.list_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["my_group"], ["dev1", "dev2"]);

        store.remove_group("my_group").unwrap();
        assert!(store.list_groups().unwrap().is_empty());
    }

    #[test]
    fn test_group_errors() {
        let (_dir, store) = store();
        let err = store
            .add_group("group1", &["fake_dev".to_string()])
            .unwrap_err();
        assert_eq!(err.to_string(), "Device 'fake_dev' not found in configuration");

        store.add_device("dev1", "00:11", "Device 1").unwrap();
        store.add_group("group1", &["dev1".to_string()]).unwrap();
        let err = store.add_group("group1", &["dev1".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Group 'group1' already exists");

        let err = store.remove_group("fake_group").unwrap_err();
        assert_eq!(err.to_string(), "Group 'fake_group' not found");
    }

    #[test]
    fn test_update_group_edits_and_renames() {
        let (_dir, store) = store();
        store.add_device("dev1", "00:11", "Device 1").unwrap();
        store.add_device("dev2", "00:22", "Device 2").unwrap();
        store.add_group("g1", &["dev1".to_string()]).unwrap();
        store.add_group("g2", &["dev2".to_string()]).unwrap();

        store
            .update_group("g1", "g1", &["dev1".to_string(), "dev2".to_string()])
            .unwrap();
        assert_eq!(store.list_groups().unwrap()["g1"], ["dev1", "dev2"]);

        store.update_group("g1", "desk", &["dev2".to_string()]).unwrap();
        let groups = store.list_groups().unwrap();
        assert!(!groups.contains_key("g1"));
        assert_eq!(groups["desk"], ["dev2"]);
    }

    #[test]
    fn test_update_group_failure_keeps_old_group() {
        let (_dir, store) = store();
        store.add_device("dev1", "00:11", "Device 1").unwrap();
        store.add_group("g1", &["dev1".to_string()]).unwrap();
        store.add_group("g2", &["dev1".to_string()]).unwrap();

        let err = store
            .update_group("g1", "g1", &["ghost".to_string()])
            .unwrap_err();
        assert_eq!(err.to_string(), "Device 'ghost' not found in configuration");

        let err = store.update_group("g1", "g2", &["dev1".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Group 'g2' already exists");

        let err = store.update_group("nope", "x", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Group 'nope' not found");

        assert_eq!(store.list_groups().unwrap()["g1"], ["dev1"]);
    }

    #[test]
    fn test_set_default() {
        let (_dir, store) = store();
        store.add_device("d1", "aa", "n1").unwrap();
        store.add_host("h1", Host::new("1.1", "u")).unwrap();

        store.set_default("myhost", "d1", "h1").unwrap();
        let defaults = store.list_defaults().unwrap();
        assert_eq!(defaults["myhost"].default_device, "d1");
        assert_eq!(defaults["myhost"].default_target, "h1");

        store.remove_default("myhost").unwrap();
        let err = store.remove_default("myhost").unwrap_err();
        assert_eq!(err.to_string(), "Defaults for 'myhost' not found");
    }

    #[test]
    fn test_set_default_accepts_group_and_validates_refs() {
        let (_dir, store) = store();
        store.add_device("d1", "aa", "n1").unwrap();
        store.add_host("h1", Host::new("1.1", "u")).unwrap();
        store.add_group("g", &["d1".to_string()]).unwrap();

        store.set_default("myhost", "g", "h1").unwrap();

        let err = store.set_default("myhost", "ghost", "h1").unwrap_err();
        assert_eq!(err.to_string(), "Device 'ghost' not found in configuration");
        let err = store.set_default("myhost", "d1", "nowhere").unwrap_err();
        assert_eq!(err.to_string(), "Host 'nowhere' not found in configuration");
    }

    #[test]
    fn test_load_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("nonexistent.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Config not found at"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "invalid toml content [").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().starts_with("Config parse error"));
    }

    #[test]
    fn test_load_config_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [devices.d1]
            mac = "00:11:22:33:44:55"
            name = "Test Device"

            [hosts.h1]
            address = "1.2.3.4"
            user = "u1"

            [defaults.myhost]
            default_device = "d1"
            default_target = "h1"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.devices["d1"].name, "Test Device");
        assert_eq!(config.hosts["h1"].user, "u1");
        assert!(config.groups.is_empty());
    }
}
