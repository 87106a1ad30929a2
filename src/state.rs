/// Navigation states of a debug session.
///
/// Exactly one state is active at a time. User commands transition the state;
/// the pause decision in [`Controller`](crate::Controller) consults it at
/// every checkpoint to choose between resuming and pausing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavState {
    /// No run in progress, or the run was terminated.
    Stopped,
    /// Run freely until completion.
    Running,
    /// Suspended at a checkpoint, waiting for a command.
    Paused,
    /// Pause at the next new pause line, regardless of depth.
    StepInto,
    /// Pause at the next new pause line at or above the paused depth.
    StepOver,
    /// Pause only once the stack is shallower than at the last pause.
    StepOut,
    /// Timer-paced forward navigation with speed-dependent skipping.
    Animate,
    /// Navigating to an absolute step index, forward or backward.
    Jump,
    /// Reversing by exactly one step.
    StepBack,
}

impl std::fmt::Display for NavState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NavState::Stopped => "stopped",
            NavState::Running => "running",
            NavState::Paused => "paused",
            NavState::StepInto => "step-into",
            NavState::StepOver => "step-over",
            NavState::StepOut => "step-out",
            NavState::Animate => "animate",
            NavState::Jump => "jump",
            NavState::StepBack => "step-back",
        };
        write!(f, "{name}")
    }
}
