/*!
 * Switch Orchestration
 * Two-phase disconnect/connect for a single device, with rollback on push
 */

use serde::Serialize;
use std::fmt;

use crate::driver::BluetoothDriver;
use crate::error::{Error, ExecutionFailure, Result};
use crate::events::{ProgressSink, Side, SwitchEvent};
use crate::models::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local machine -> target.
    Push,
    /// Target -> local machine.
    Pull,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Push => "push",
            Direction::Pull => "pull",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwitchStatus {
    Completed,
    /// Remote connect failed; the device was reconnected locally.
    RolledBack { cause: ExecutionFailure },
    /// Remote connect failed and so did the local reconnect. The device is
    /// connected nowhere.
    RollbackFailed {
        cause: ExecutionFailure,
        rollback: String,
    },
    /// Processing raised an error (batch runs only).
    Failed { error: String },
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchStatus::Completed => write!(f, "completed"),
            SwitchStatus::RolledBack { cause } => {
                write!(f, "rolled back to local ({})", cause.diagnostic)
            }
            SwitchStatus::RollbackFailed { cause, rollback } => write!(
                f,
                "rollback failed ({}; then {rollback})",
                cause.diagnostic
            ),
            SwitchStatus::Failed { error } => write!(f, "failed ({error})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub mac: String,
    pub name: String,
    pub direction: Direction,
    #[serde(flatten)]
    pub status: SwitchStatus,
}

impl SwitchOutcome {
    fn new(device: &Device, direction: Direction, status: SwitchStatus) -> Self {
        Self {
            mac: device.mac.clone(),
            name: device.name.clone(),
            direction,
            status,
        }
    }

    pub(crate) fn failed(device: &Device, direction: Direction, error: &Error) -> Self {
        Self::new(
            device,
            direction,
            SwitchStatus::Failed {
                error: error.to_string(),
            },
        )
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, SwitchStatus::Completed)
    }

    pub fn rollback_attempted(&self) -> bool {
        matches!(
            self.status,
            SwitchStatus::RolledBack { .. } | SwitchStatus::RollbackFailed { .. }
        )
    }
}

/// Moves one device between the local machine and `target`.
///
/// Drivers are borrowed for the duration of the run only.
pub struct SwitchService<'a> {
    local: &'a dyn BluetoothDriver,
    remote: &'a dyn BluetoothDriver,
    target: &'a str,
    sink: &'a dyn ProgressSink,
}

impl<'a> SwitchService<'a> {
    pub fn new(
        local: &'a dyn BluetoothDriver,
        remote: &'a dyn BluetoothDriver,
        target: &'a str,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            local,
            remote,
            target,
            sink,
        }
    }

    /// Push when the device is connected here, pull otherwise.
    pub async fn run(&self, device: &Device) -> Result<SwitchOutcome> {
        self.sink.emit(SwitchEvent::CheckingStatus {
            name: device.name.clone(),
            mac: device.mac.clone(),
        });

        if self.local.is_connected(&device.mac).await? {
            self.push(device).await
        } else {
            self.pull(device).await
        }
    }

    /// Local disconnect, then remote connect. A failed remote connect is rolled
    /// back by reconnecting locally; a failed local disconnect aborts.
    pub async fn push(&self, device: &Device) -> Result<SwitchOutcome> {
        let mac = device.mac.as_str();
        self.emit_direction(Direction::Push);

        self.sink.emit(SwitchEvent::Disconnecting {
            side: Side::Local,
            target: self.target.to_string(),
        });
        self.local.disconnect(mac).await?;

        self.sink.emit(SwitchEvent::Connecting {
            side: Side::Remote,
            target: self.target.to_string(),
        });
        let status = match self.remote.connect(mac).await {
            Ok(()) => {
                self.emit_completed(device, Direction::Push);
                SwitchStatus::Completed
            }
            Err(Error::Execution(cause)) => self.roll_back(device, cause).await,
            Err(e) => return Err(e),
        };

        Ok(SwitchOutcome::new(device, Direction::Push, status))
    }

    /// Remote disconnect (advisory), then local connect. Only a command that ran
    /// and failed is skipped over; a remote that cannot be reached at all
    /// (spawn or I/O error) aborts the pull.
    pub async fn pull(&self, device: &Device) -> Result<SwitchOutcome> {
        let mac = device.mac.as_str();
        self.emit_direction(Direction::Pull);

        self.sink.emit(SwitchEvent::Disconnecting {
            side: Side::Remote,
            target: self.target.to_string(),
        });
        match self.remote.disconnect(mac).await {
            Ok(()) => {}
            Err(Error::Execution(failure)) => {
                self.sink.emit(SwitchEvent::RemoteDisconnectSkipped {
                    target: self.target.to_string(),
                    error: failure.diagnostic,
                });
            }
            Err(e) => return Err(e),
        }

        self.sink.emit(SwitchEvent::Connecting {
            side: Side::Local,
            target: self.target.to_string(),
        });
        self.local.connect(mac).await?;
        self.emit_completed(device, Direction::Pull);

        Ok(SwitchOutcome::new(device, Direction::Pull, SwitchStatus::Completed))
    }

    async fn roll_back(&self, device: &Device, cause: ExecutionFailure) -> SwitchStatus {
        self.sink.emit(SwitchEvent::RemoteConnectFailed {
            target: self.target.to_string(),
            error: cause.diagnostic.clone(),
        });
        self.sink.emit(SwitchEvent::RollingBack {
            name: device.name.clone(),
        });

        match self.local.connect(&device.mac).await {
            Ok(()) => SwitchStatus::RolledBack { cause },
            Err(e) => {
                self.sink.emit(SwitchEvent::RollbackFailed {
                    name: device.name.clone(),
                    error: e.to_string(),
                });
                SwitchStatus::RollbackFailed {
                    cause,
                    rollback: e.to_string(),
                }
            }
        }
    }

    fn emit_direction(&self, direction: Direction) {
        self.sink.emit(SwitchEvent::DirectionChosen {
            direction,
            target: self.target.to_string(),
        });
    }

    fn emit_completed(&self, device: &Device, direction: Direction) {
        self.sink.emit(SwitchEvent::Completed {
            name: device.name.clone(),
            direction,
            target: self.target.to_string(),
        });
    }
}
