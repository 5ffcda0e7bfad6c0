use async_trait::async_trait;
use std::sync::Mutex;

use btswitch::{
    load_config, AppConfig, BackendKind, BluetoothDriver, ConfigStore, DefaultSettings, Device,
    Direction, Error, Host, Operation, ProgressSink, Result, SwitchEvent, SwitchPlan,
    TransportKind,
};

fn sample_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.devices.insert(
        "headphones".into(),
        Device::new("00:11:22:33:44:55", "Test Headphones"),
    );
    config
        .devices
        .insert("mouse".into(), Device::new("AA:BB:CC:DD:EE:FF", "Test Mouse"));
    config
        .hosts
        .insert("desktop".into(), Host::new("192.168.1.10", "jean"));
    config.hosts.insert(
        "laptop".into(),
        Host {
            address: "localhost".into(),
            user: "jean".into(),
            protocol: TransportKind::Local,
            driver_type: BackendKind::Bluez,
        },
    );
    config.defaults.insert(
        "laptop".into(),
        DefaultSettings {
            default_device: "headphones".into(),
            default_target: "desktop".into(),
        },
    );
    config
}

#[test]
fn resolves_host_defaults() {
    let plan = SwitchPlan::resolve(&sample_config(), "laptop", None, None).unwrap();

    assert_eq!(plan.target_alias, "desktop");
    assert_eq!(plan.target.address, "192.168.1.10");
    assert_eq!(plan.device_alias, "headphones");
    assert_eq!(plan.devices, [Device::new("00:11:22:33:44:55", "Test Headphones")]);
    assert!(!plan.is_self_target());
}

#[test]
fn unknown_hostname_is_a_configuration_error() {
    let err = SwitchPlan::resolve(&sample_config(), "stranger", None, None).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(err.to_string(), "Hostname 'stranger' not in [defaults]");
}

#[test]
fn explicit_overrides_do_not_need_defaults() {
    let plan =
        SwitchPlan::resolve(&sample_config(), "stranger", Some("desktop"), Some("mouse")).unwrap();
    assert_eq!(plan.devices[0].name, "Test Mouse");
}

#[test]
fn overrides_win_over_defaults() {
    let plan =
        SwitchPlan::resolve(&sample_config(), "laptop", Some("desktop"), Some("mouse")).unwrap();
    assert_eq!(plan.target_alias, "desktop");
    assert_eq!(plan.devices.len(), 1);
    assert_eq!(plan.devices[0].name, "Test Mouse");
}

#[test]
fn targeting_this_machine_is_a_no_op() {
    let mut config = sample_config();
    let laptop_defaults = config.defaults["laptop"].clone();
    config.defaults.insert("localhost".into(), laptop_defaults);

    let plan = SwitchPlan::resolve(&config, "localhost", Some("laptop"), None).unwrap();
    assert!(plan.is_self_target());
}

#[test]
fn device_alias_falls_back_to_group() {
    let mut config = sample_config();
    config
        .groups
        .insert("mygroup".into(), vec!["headphones".into(), "mouse".into()]);

    let plan = SwitchPlan::resolve(&config, "laptop", None, Some("mygroup")).unwrap();
    let names: Vec<&str> = plan.devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Test Headphones", "Test Mouse"]);
}

#[test]
fn default_device_may_be_a_group() {
    let mut config = sample_config();
    config
        .groups
        .insert("mygroup".into(), vec!["headphones".into()]);
    config.defaults.get_mut("laptop").unwrap().default_device = "mygroup".into();

    let plan = SwitchPlan::resolve(&config, "laptop", None, None).unwrap();
    assert_eq!(plan.devices.len(), 1);
    assert_eq!(plan.devices[0].name, "Test Headphones");
}

#[test]
fn unknown_aliases_are_rejected() {
    let config = sample_config();

    let err = SwitchPlan::resolve(&config, "laptop", Some("mars"), None).unwrap_err();
    assert_eq!(err.to_string(), "Target 'mars' not in [hosts]");

    let err = SwitchPlan::resolve(&config, "laptop", None, Some("keyboard")).unwrap_err();
    assert_eq!(err.to_string(), "Device 'keyboard' not in [devices]");
}

#[test]
fn empty_group_is_rejected() {
    let mut config = sample_config();
    config.groups.insert("ghosts".into(), vec!["gone".into()]);

    let err = SwitchPlan::resolve(&config, "laptop", None, Some("ghosts")).unwrap_err();
    assert_eq!(err.to_string(), "Group 'ghosts' has no configured devices");
}

#[test]
fn selection_plan_keeps_pick_order() {
    let plan = SwitchPlan::for_selection(
        &sample_config(),
        "laptop",
        "desktop",
        &["mouse".to_string(), "headphones".to_string()],
    )
    .unwrap();

    let names: Vec<&str> = plan.devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Test Mouse", "Test Headphones"]);
    assert_eq!(plan.device_alias, "mouse,headphones");
}

#[test]
fn selection_plan_needs_devices_and_known_aliases() {
    let config = sample_config();

    let err = SwitchPlan::for_selection(&config, "laptop", "desktop", &[]).unwrap_err();
    assert_eq!(err.to_string(), "No devices selected");

    let err = SwitchPlan::for_selection(&config, "laptop", "desktop", &["pen".to_string()])
        .unwrap_err();
    assert_eq!(err.to_string(), "Device 'pen' not in [devices]");

    let err = SwitchPlan::for_selection(&config, "laptop", "moon", &["mouse".to_string()])
        .unwrap_err();
    assert_eq!(err.to_string(), "Target 'moon' not in [hosts]");
}

#[test]
fn store_and_loader_agree() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let store = ConfigStore::new(&path);

    store.add_device("buds", "00:11:22:33:44:55", "Buds").unwrap();
    store.add_device("mouse", "AA:BB:CC:DD:EE:FF", "Mouse").unwrap();
    store.add_host("desk", Host::new("10.0.0.2", "jean")).unwrap();
    store
        .add_group("kit", &["buds".to_string(), "mouse".to_string()])
        .unwrap();
    store.set_default("laptop", "kit", "desk").unwrap();

    let config = load_config(&path).unwrap();
    let plan = SwitchPlan::resolve(&config, "laptop", None, None).unwrap();
    assert_eq!(plan.target.destination(), "jean@10.0.0.2");
    assert_eq!(plan.devices.len(), 2);
}

/// Connected set is fixed; every operation succeeds.
struct StaticDriver {
    connected: Vec<String>,
    connects: Mutex<Vec<String>>,
}

impl StaticDriver {
    fn new(connected: &[&str]) -> Self {
        Self {
            connected: connected.iter().map(|s| s.to_string()).collect(),
            connects: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BluetoothDriver for StaticDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Bluez
    }

    async fn is_connected(&self, mac: &str) -> Result<bool> {
        Ok(self.connected.iter().any(|c| c == mac))
    }

    async fn connect(&self, mac: &str) -> Result<()> {
        self.connects.lock().unwrap().push(mac.to_string());
        Ok(())
    }

    async fn disconnect(&self, _mac: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Collect(Mutex<Vec<SwitchEvent>>);

impl ProgressSink for Collect {
    fn emit(&self, event: SwitchEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn executes_a_group_plan_with_one_direction() {
    let mut config = sample_config();
    config
        .groups
        .insert("kit".into(), vec!["headphones".into(), "mouse".into()]);
    let plan = SwitchPlan::resolve(&config, "laptop", None, Some("kit")).unwrap();

    // only the mouse is here, which is enough to push both
    let local = StaticDriver::new(&["AA:BB:CC:DD:EE:FF"]);
    let remote = StaticDriver::new(&[]);
    let sink = Collect::default();

    let report = plan
        .execute_with(&local, &remote, Operation::Switch, &sink)
        .await
        .unwrap();

    assert_eq!(report.direction, Direction::Push);
    assert!(report.all_succeeded());
    assert_eq!(
        *remote.connects.lock().unwrap(),
        ["00:11:22:33:44:55", "AA:BB:CC:DD:EE:FF"]
    );

    let events = sink.0.lock().unwrap();
    assert!(events.contains(&SwitchEvent::BatchStarted {
        direction: Direction::Push,
        count: 2
    }));
}
