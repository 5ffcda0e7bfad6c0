/*!
 * BlueZ Backend
 * Drives `bluetoothctl` through an executor
 */

use async_trait::async_trait;
use std::time::Duration;

use super::BluetoothDriver;
use crate::error::{Error, ExecutionFailure, Result};
use crate::executor::Executor;
use crate::models::BackendKind;

const BLUETOOTHCTL: &str = "bluetoothctl";

pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(8);

const CONNECTED_MARKER: &str = "Connected: yes";
const NOT_AVAILABLE_MARKER: &str = "not available";

pub struct BluezDriver {
    executor: Box<dyn Executor>,
}

impl BluezDriver {
    pub fn new(executor: Box<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Classifies a failed disconnect: true when bluetoothctl says the device
    /// is not there to disconnect from.
    pub fn is_already_disconnected(failure: &ExecutionFailure) -> bool {
        failure
            .diagnostic
            .to_lowercase()
            .contains(NOT_AVAILABLE_MARKER)
    }
}

#[async_trait]
impl BluetoothDriver for BluezDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Bluez
    }

    async fn is_connected(&self, mac: &str) -> Result<bool> {
        match self
            .executor
            .run(&[BLUETOOTHCTL, "info", mac], STATUS_TIMEOUT)
            .await
        {
            Ok(output) => Ok(output.contains(CONNECTED_MARKER)),
            Err(Error::Execution(failure)) => {
                tracing::debug!(mac, error = %failure.diagnostic, "Status query failed, assuming not connected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn connect(&self, mac: &str) -> Result<()> {
        self.executor
            .run(&[BLUETOOTHCTL, "connect", mac], CONNECT_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn disconnect(&self, mac: &str) -> Result<()> {
        match self
            .executor
            .run(&[BLUETOOTHCTL, "disconnect", mac], DISCONNECT_TIMEOUT)
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Execution(failure)) if Self::is_already_disconnected(&failure) => {
                tracing::debug!(mac, "Device not available, treating disconnect as done");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
