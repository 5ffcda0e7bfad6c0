/*!
 * Batch Switching
 * One direction for the whole set, best effort per device
 */

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::driver::BluetoothDriver;
use crate::error::{Error, Result};
use crate::events::{ProgressSink, SwitchEvent};
use crate::models::Device;
use crate::switch::{Direction, SwitchOutcome, SwitchService};

/// What the caller asked for. `Switch` lets the batch pick the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Switch,
    Push,
    Pull,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Switch => "switch",
            Operation::Push => "push",
            Operation::Pull => "pull",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "switch" => Ok(Operation::Switch),
            "push" => Ok(Operation::Push),
            "pull" => Ok(Operation::Pull),
            other => Err(Error::config(format!("Unsupported operation: {other}"))),
        }
    }
}

/// Per-device outcomes of a batch run, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub direction: Direction,
    pub outcomes: Vec<SwitchOutcome>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(SwitchOutcome::succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SwitchOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

pub struct BatchSwitchService<'a> {
    local: &'a dyn BluetoothDriver,
    sink: &'a dyn ProgressSink,
    service: SwitchService<'a>,
}

impl<'a> BatchSwitchService<'a> {
    pub fn new(
        local: &'a dyn BluetoothDriver,
        remote: &'a dyn BluetoothDriver,
        target: &'a str,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            local,
            sink,
            service: SwitchService::new(local, remote, target, sink),
        }
    }

    /// Runs `operation` over `devices` one at a time. A device that errors is
    /// recorded as failed and the loop moves on; nothing is rolled back across
    /// devices. Only a failing consensus poll aborts the whole batch.
    pub async fn run(&self, devices: &[Device], operation: Operation) -> Result<BatchReport> {
        let direction = match operation {
            Operation::Switch => self.resolve_direction(devices).await?,
            Operation::Push => Direction::Push,
            Operation::Pull => Direction::Pull,
        };

        let total = devices.len();
        self.sink.emit(SwitchEvent::BatchStarted {
            direction,
            count: total,
        });

        let mut outcomes = Vec::with_capacity(total);
        for (i, device) in devices.iter().enumerate() {
            self.sink.emit(SwitchEvent::DeviceStarted {
                index: i + 1,
                total,
                name: device.name.clone(),
            });

            let result = match direction {
                Direction::Push => self.service.push(device).await,
                Direction::Pull => self.service.pull(device).await,
            };

            let outcome = result.unwrap_or_else(|e| {
                self.sink.emit(SwitchEvent::DeviceFailed {
                    name: device.name.clone(),
                    error: e.to_string(),
                });
                SwitchOutcome::failed(device, direction, &e)
            });
            outcomes.push(outcome);
        }

        Ok(BatchReport {
            direction,
            outcomes,
        })
    }

    /// Push if any device is connected here, pull if none is. Stops polling at
    /// the first connected device.
    pub async fn resolve_direction(&self, devices: &[Device]) -> Result<Direction> {
        let mut direction = Direction::Pull;
        for device in devices {
            if self.local.is_connected(&device.mac).await? {
                direction = Direction::Push;
                break;
            }
        }

        self.sink.emit(SwitchEvent::ConsensusResolved { direction });
        Ok(direction)
    }
}
