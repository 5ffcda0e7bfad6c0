/*!
 * bt-switch
 * Moves a Bluetooth peripheral between this machine and remote hosts
 */

pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod executor;
pub mod models;
pub mod plan;
pub mod switch;

pub use batch::{BatchReport, BatchSwitchService, Operation};
pub use config::{default_config_path, load_config, ConfigStore, CONFIG_ENV};
pub use driver::{BluetoothDriver, BluezDriver, DriverFactory};
pub use error::{Error, ExecutionFailure, FailureKind, Result};
pub use events::{ProgressSink, Side, SwitchEvent, TracingSink};
pub use executor::{Executor, LocalExecutor, SshExecutor};
pub use models::{AppConfig, BackendKind, DefaultSettings, Device, Host, TransportKind};
pub use plan::{local_hostname, SwitchPlan};
pub use switch::{Direction, SwitchOutcome, SwitchService, SwitchStatus};
