//! Recording in-memory driver for orchestrator tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::BluetoothDriver;
use crate::error::{Error, ExecutionFailure, FailureKind, Result};
use crate::models::BackendKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    IsConnected,
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub side: Side,
    pub op: Op,
    pub mac: String,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct FakeDriver {
    side: Side,
    log: CallLog,
    connected: HashSet<String>,
    failing_connect: HashSet<String>,
    failing_disconnect: HashSet<String>,
    broken: HashSet<String>,
}

impl FakeDriver {
    fn new(side: Side, log: CallLog) -> Self {
        Self {
            side,
            log,
            connected: HashSet::new(),
            failing_connect: HashSet::new(),
            failing_disconnect: HashSet::new(),
            broken: HashSet::new(),
        }
    }

    pub fn connected(mut self, mac: &str) -> Self {
        self.connected.insert(mac.to_string());
        self
    }

    pub fn failing_connect(mut self, mac: &str) -> Self {
        self.failing_connect.insert(mac.to_string());
        self
    }

    pub fn failing_disconnect(mut self, mac: &str) -> Self {
        self.failing_disconnect.insert(mac.to_string());
        self
    }

    /// Every operation on `mac` fails with a spawn error.
    pub fn broken(mut self, mac: &str) -> Self {
        self.broken.insert(mac.to_string());
        self
    }

    fn record(&self, op: Op, mac: &str) -> Result<()> {
        self.log.lock().unwrap().push(Call {
            side: self.side,
            op,
            mac: mac.to_string(),
        });
        if self.broken.contains(mac) {
            return Err(Error::Spawn {
                command: "bluetoothctl".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "bluetoothctl missing"),
            });
        }
        Ok(())
    }
}

fn fail(op: &str, mac: &str) -> Error {
    ExecutionFailure::new(
        &["bluetoothctl", op, mac],
        FailureKind::NonZeroExit { code: Some(1) },
        "Fail",
    )
    .into()
}

/// A local and a remote fake that share one call log.
pub fn pair() -> (FakeDriver, FakeDriver, CallLog) {
    let log = CallLog::default();
    (
        FakeDriver::new(Side::Local, log.clone()),
        FakeDriver::new(Side::Remote, log.clone()),
        log,
    )
}

/// Macs passed to `op` on `side`, in call order.
pub fn calls(log: &CallLog, side: Side, op: Op) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|c| c.side == side && c.op == op)
        .map(|c| c.mac.clone())
        .collect()
}

#[async_trait]
impl BluetoothDriver for FakeDriver {
    fn backend(&self) -> BackendKind {
        BackendKind::Bluez
    }

    async fn is_connected(&self, mac: &str) -> Result<bool> {
        self.record(Op::IsConnected, mac)?;
        Ok(self.connected.contains(mac))
    }

    async fn connect(&self, mac: &str) -> Result<()> {
        self.record(Op::Connect, mac)?;
        if self.failing_connect.contains(mac) {
            return Err(fail("connect", mac));
        }
        Ok(())
    }

    async fn disconnect(&self, mac: &str) -> Result<()> {
        self.record(Op::Disconnect, mac)?;
        if self.failing_disconnect.contains(mac) {
            return Err(fail("disconnect", mac));
        }
        Ok(())
    }
}
