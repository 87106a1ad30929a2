use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{Checkpoint, Error, Program, Result};

/// Identifies one run, so events from a replaced run can never leak into the
/// next run's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunId(Uuid);

impl RunId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// The controller's reply to one checkpoint delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Advance past the checkpoint. The step was counted: when reversing,
    /// the engine must undo back to this checkpoint and re-present it.
    Forward,
    /// Advance past the checkpoint without a reverse hook. Reversal skips
    /// such checkpoints silently, folding them into the next counted undo.
    ForwardUncounted,
    /// Undo execution back to the most recent counted checkpoint and
    /// re-present it through [`EnginePort::reverse_checkpoint`].
    Backward,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Normal completion, with the rendered return value.
    Return(String),
    /// The user program raised an exception; a terminal result, distinct
    /// from faults of the engine itself.
    Error(String),
    /// Reverse navigation undid the very first step; the run is back in the
    /// not-started state.
    Rewound,
}

#[derive(Debug)]
pub(crate) enum Arrival {
    Forward,
    Reverse,
}

pub(crate) enum RunEvent {
    Checkpoint {
        run: RunId,
        checkpoint: Checkpoint,
        stack_depth: usize,
        arrival: Arrival,
        reply: oneshot::Sender<Resume>,
    },
    Finished {
        run: RunId,
        outcome: Result<Outcome>,
    },
}

/// The engine's side of the two-way checkpoint channel.
///
/// One port is handed to the engine per run. At every line boundary the
/// engine delivers a checkpoint and suspends on the reply; the reply is the
/// controller's decision. While the session keeps the reply pending the run
/// is paused; dropping it (session stop or shutdown) surfaces here as
/// [`Error::RunCancelled`], which the engine should propagate to unwind.
pub struct EnginePort {
    run: RunId,
    events: mpsc::Sender<RunEvent>,
}

impl EnginePort {
    pub(crate) fn new(run: RunId, events: mpsc::Sender<RunEvent>) -> Self {
        Self { run, events }
    }

    /// Deliver a checkpoint crossed by forward execution and wait for the
    /// decision.
    pub async fn checkpoint(&self, checkpoint: Checkpoint, stack_depth: usize) -> Result<Resume> {
        self.deliver(checkpoint, stack_depth, Arrival::Forward).await
    }

    /// Re-present a previously counted checkpoint after undoing one step,
    /// and wait for the decision.
    pub async fn reverse_checkpoint(
        &self,
        checkpoint: Checkpoint,
        stack_depth: usize,
    ) -> Result<Resume> {
        self.deliver(checkpoint, stack_depth, Arrival::Reverse).await
    }

    async fn deliver(
        &self,
        checkpoint: Checkpoint,
        stack_depth: usize,
        arrival: Arrival,
    ) -> Result<Resume> {
        let (reply, decision) = oneshot::channel();
        self.events
            .send(RunEvent::Checkpoint {
                run: self.run,
                checkpoint,
                stack_depth,
                arrival,
                reply,
            })
            .await
            .map_err(|_| Error::RunCancelled)?;
        decision.await.map_err(|_| Error::RunCancelled)
    }
}

/// A reversible execution engine.
///
/// The controller never assumes how reversibility is implemented; a replay
/// log that re-executes from the start is as valid as true in-place undo.
/// What it does depend on:
///
/// - checkpoints for one run are delivered in true execution order;
/// - a [`Resume::Backward`] reply undoes exactly one counted step and
///   re-presents that checkpoint via `reverse_checkpoint`;
/// - each delivery gets exactly one reply, and the engine suspends until it
///   arrives;
/// - undoing past the first counted checkpoint ends the run with
///   [`Outcome::Rewound`];
/// - a failure in support scripts aborts the run with
///   [`Error::SupportCode`](crate::Error::SupportCode) before any monitored
///   checkpoint is delivered.
#[async_trait]
pub trait Engine: Send + 'static {
    /// Drive one full run, reporting every line boundary through the port.
    async fn run(&mut self, program: Program, port: EnginePort) -> Result<Outcome>;

    /// Silent dry run: the number of checkpoints a full run crosses in the
    /// counted scripts. Used only to bound jump navigation.
    async fn count(&mut self, program: Program) -> Result<u64>;
}
