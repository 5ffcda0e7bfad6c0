pub mod bluez;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::executor::{Executor, LocalExecutor, SshExecutor};
use crate::models::{BackendKind, Host, TransportKind};

pub use bluez::BluezDriver;

/// The three operations every peripheral backend has to provide.
#[async_trait]
pub trait BluetoothDriver: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// `false` when the status query itself fails: no information means not connected.
    async fn is_connected(&self, mac: &str) -> Result<bool>;

    async fn connect(&self, mac: &str) -> Result<()>;

    /// Succeeds when the backend reports the device is already gone.
    async fn disconnect(&self, mac: &str) -> Result<()>;
}

pub struct DriverFactory;

impl DriverFactory {
    /// Picks executor and driver for `host`. No I/O happens here.
    pub fn create(host: &Host, is_local: bool) -> Result<Box<dyn BluetoothDriver>> {
        let executor: Box<dyn Executor> = if is_local {
            Box::new(LocalExecutor::new())
        } else {
            match host.protocol {
                TransportKind::Ssh => Box::new(SshExecutor::new(host)),
                TransportKind::Local => Box::new(LocalExecutor::new()),
            }
        };

        match host.driver_type {
            BackendKind::Bluez => Ok(Box::new(BluezDriver::new(executor))),
            other => Err(Error::config(format!("Unsupported driver: {other}"))),
        }
    }

    pub fn create_local() -> Result<Box<dyn BluetoothDriver>> {
        Self::create(&Host::local(), true)
    }
}
