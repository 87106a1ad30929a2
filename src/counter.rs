use std::time::Duration;

use tokio::{select, sync::mpsc::Sender, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;
use crate::session::Command;
use crate::Program;

/// Run the pre-run step counter in the background.
///
/// A fresh engine performs a silent dry run under the given budget; the total
/// feeds back into the session and enables navigation by step index. Budget
/// overrun or cancellation is non-fatal: jump navigation simply stays
/// disabled.
pub(crate) fn spawn_count<E: Engine>(
    mut engine: E,
    program: Program,
    budget: Duration,
    cancel_token: CancellationToken,
    commands: Sender<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let counted = select! {
            _ = cancel_token.cancelled() => return,
            r = tokio::time::timeout(budget, engine.count(program)) => r,
        };
        match counted {
            Ok(Ok(total)) => {
                let _ = commands.send(Command::TotalSteps(total)).await;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "step counting failed; jump navigation stays disabled");
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    "step counting exceeded its budget; jump navigation stays disabled"
                );
            }
        }
    })
}
