/*!
 * Progress Events
 * Orchestrators report each phase through an injected sink
 */

use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Level;

use crate::switch::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    CheckingStatus { name: String, mac: String },
    DirectionChosen { direction: Direction, target: String },
    Disconnecting { side: Side, target: String },
    Connecting { side: Side, target: String },
    RemoteDisconnectSkipped { target: String, error: String },
    RemoteConnectFailed { target: String, error: String },
    RollingBack { name: String },
    RollbackFailed { name: String, error: String },
    Completed { name: String, direction: Direction, target: String },
    ConsensusResolved { direction: Direction },
    BatchStarted { direction: Direction, count: usize },
    DeviceStarted { index: usize, total: usize, name: String },
    DeviceFailed { name: String, error: String },
}

impl SwitchEvent {
    pub fn level(&self) -> Level {
        match self {
            SwitchEvent::Disconnecting {
                side: Side::Remote, ..
            } => Level::DEBUG,
            SwitchEvent::RemoteDisconnectSkipped { .. } | SwitchEvent::RollingBack { .. } => {
                Level::WARN
            }
            SwitchEvent::RemoteConnectFailed { .. }
            | SwitchEvent::RollbackFailed { .. }
            | SwitchEvent::DeviceFailed { .. } => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

impl fmt::Display for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchEvent::CheckingStatus { name, mac } => {
                write!(f, "Checking connection status for {name} ({mac})...")
            }
            SwitchEvent::DirectionChosen {
                direction: Direction::Push,
                ..
            } => write!(f, "Device connected locally. Initiating PUSH."),
            SwitchEvent::DirectionChosen {
                direction: Direction::Pull,
                target,
            } => write!(f, "Device not local. Initiating PULL from {target}."),
            SwitchEvent::Disconnecting {
                side: Side::Local, ..
            } => write!(f, "Disconnecting local..."),
            SwitchEvent::Disconnecting {
                side: Side::Remote,
                target,
            } => write!(f, "Ensuring disconnect on {target}..."),
            SwitchEvent::Connecting {
                side: Side::Local, ..
            } => write!(f, "Connecting local..."),
            SwitchEvent::Connecting {
                side: Side::Remote,
                target,
            } => write!(f, "Connecting remote ({target})..."),
            SwitchEvent::RemoteDisconnectSkipped { target, error } => write!(
                f,
                "Could not verify disconnect on {target}, proceeding anyway: {error}"
            ),
            SwitchEvent::RemoteConnectFailed { target, error } => {
                write!(f, "Failed to connect remote ({target}): {error}")
            }
            SwitchEvent::RollingBack { name } => {
                write!(f, "Reverting local connection for {name}...")
            }
            SwitchEvent::RollbackFailed { name, error } => write!(
                f,
                "Rollback failed, {name} is not connected anywhere: {error}"
            ),
            SwitchEvent::Completed {
                name,
                direction: Direction::Push,
                target,
            } => write!(f, "Successfully pushed {name} to {target}"),
            SwitchEvent::Completed {
                name,
                direction: Direction::Pull,
                ..
            } => write!(f, "Successfully pulled {name} to local machine"),
            SwitchEvent::ConsensusResolved {
                direction: Direction::Push,
            } => write!(
                f,
                "Smart Switch: Detected local connection(s). Deciding to PUSH ALL."
            ),
            SwitchEvent::ConsensusResolved {
                direction: Direction::Pull,
            } => write!(
                f,
                "Smart Switch: No local connections detected. Deciding to PULL ALL."
            ),
            SwitchEvent::BatchStarted { direction, count } => write!(
                f,
                "Batch Operation: {} on {count} devices.",
                direction.as_str().to_uppercase()
            ),
            SwitchEvent::DeviceStarted { index, total, name } => {
                write!(f, "[{index}/{total}] Processing {name}...")
            }
            SwitchEvent::DeviceFailed { name, error } => {
                write!(f, "Failed to process {name}: {error}")
            }
        }
    }
}

/// Receives progress events from a switch run.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: SwitchEvent);
}

/// Forwards events to `tracing` at the event's level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: SwitchEvent) {
        let level = event.level();
        if level == Level::ERROR {
            tracing::error!("{event}");
        } else if level == Level::WARN {
            tracing::warn!("{event}");
        } else if level == Level::DEBUG {
            tracing::debug!("{event}");
        } else {
            tracing::info!("{event}");
        }
    }
}

impl ProgressSink for UnboundedSender<SwitchEvent> {
    fn emit(&self, event: SwitchEvent) {
        // receiver gone means nobody is watching anymore
        let _ = self.send(event);
    }
}
