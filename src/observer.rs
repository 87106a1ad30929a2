use std::time::Duration;

use crate::{Checkpoint, Error, NavState, Outcome};

/// Side effects to run immediately before the next raw engine undo.
///
/// Returned from [`Observer::on_update`] to compose higher-level undo
/// semantics around the engine's own reversal. The hook is installed on the
/// pause it was returned for and discarded if that pause resumes forward.
pub type ReverseHook = Box<dyn FnOnce() + Send>;

/// Snapshot emitted on every pause and on run completion.
#[derive(Debug, Clone)]
pub struct Update {
    /// The checkpoint paused at; `None` on run completion and reset.
    pub checkpoint: Option<Checkpoint>,
    pub state: NavState,
    /// Doubles as the progress value, `-1..=total`.
    pub step_count: i64,
    pub stack_depth: usize,
    pub is_paused: bool,
    /// Suggested highlight transition duration.
    pub transition: Duration,
}

/// Consumer-facing notifications from a session.
///
/// All methods default to no-ops; implement the ones the control surface
/// cares about. Methods are invoked from the session's worker task.
pub trait Observer: Send {
    /// A pause was entered or the run ended. Return a hook to run right
    /// before the next raw engine undo.
    #[allow(unused_variables)]
    fn on_update(&mut self, update: &Update) -> Option<ReverseHook> {
        None
    }

    /// Source-view boundary: highlight a line, or clear with `None`. At most
    /// one line is highlighted at a time.
    #[allow(unused_variables)]
    fn on_highlight(&mut self, line: Option<u32>) {}

    /// The pre-run step counter finished; `total` bounds jump navigation.
    #[allow(unused_variables)]
    fn on_total_steps(&mut self, total: u64) {}

    /// The run reached a terminal result.
    #[allow(unused_variables)]
    fn on_finished(&mut self, outcome: &Outcome) {}

    /// A fatal internal-consistency fault aborted the run. Surfaced
    /// distinctly from user-program errors.
    #[allow(unused_variables)]
    fn on_fault(&mut self, error: &Error) {}
}
