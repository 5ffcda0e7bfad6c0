/*!
 * Background switch runs
 * One batch at a time on its own task, progress over a channel
 */

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use btswitch::{BatchReport, Operation, Result, SwitchEvent, SwitchPlan};

pub type Job = JoinHandle<Result<BatchReport>>;

/// Runs `plan` on a fresh task. Drivers are built inside the task and dropped
/// with it.
pub fn spawn(plan: SwitchPlan, operation: Operation, events: UnboundedSender<SwitchEvent>) -> Job {
    tokio::spawn(async move {
        debug!(
            "{operation}: {} device(s) -> {}",
            plan.devices.len(),
            plan.target_alias
        );
        plan.execute(operation, &events).await
    })
}
