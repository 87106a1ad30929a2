#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine's backward handle did not undo exactly one checkpoint.
    /// Indicates a broken reversibility contract; aborts the run.
    #[error("step count mismatch in reverse execution: expected {expected}, found {found}")]
    StepCountMismatch { expected: i64, found: i64 },

    /// A reverse checkpoint arrived with no recorded step to undo.
    #[error("reverse checkpoint delivered with no recorded step to undo")]
    ReversalWithoutTrail,

    /// Support code failed while the run was being set up.
    #[error("support code failed during run setup: {0}")]
    SupportCode(String),

    /// The engine reported a failure of its own machinery.
    #[error("engine fault: {0}")]
    Engine(String),

    /// The run was discarded while the engine was waiting to resume.
    #[error("the run was cancelled before the engine could resume")]
    RunCancelled,

    /// The session worker is gone; no further commands can be delivered.
    #[error("the session has been shut down")]
    SessionClosed,

    #[error("session task join error: {0}")]
    SessionJoinError(#[from] tokio::task::JoinError),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::SessionClosed
    }
}
