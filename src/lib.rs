//! Retrace: bidirectional, steppable execution control.
//!
//! A controller that drives forward and backward navigation of a running
//! program under the supervision of a reversible execution engine. The
//! engine surfaces execution as line-boundary checkpoints; at each one the
//! controller decides whether to resume forward, undo one step, or pause,
//! and builds step-into/over/out, run, step-back, jump-to-step and animate
//! on top of those primitives.
//!
//! The decision core ([`Controller`]) is synchronous and I/O-free; the
//! [`Session`] wraps it in a Tokio worker task that owns the stored
//! continuations, the animate timer and the engine run task, exchanging
//! checkpoints and resume decisions with the engine over channels.

mod checkpoint;
mod config;
mod controller;
mod counter;
mod engine;
mod error;
mod ledger;
mod observer;
mod pacer;
mod session;
mod state;

pub use checkpoint::{Checkpoint, Program, Script, MONITORED_LABEL};
pub use config::Config;
pub use controller::{Controller, Decision, JumpPlan, PauseInfo};
pub use engine::{Engine, EnginePort, Outcome, Resume};
pub use error::Error;
pub use ledger::{Ledger, StepClass};
pub use observer::{Observer, ReverseHook, Update};
pub use pacer::{Pace, Pacer};
pub use session::Session;
pub use state::NavState;

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::checkpoint::{Checkpoint, Program, Script};
    pub use crate::config::Config;
    pub use crate::engine::{Engine, EnginePort, Outcome, Resume};
    pub use crate::error::Error as RetraceError;
    pub use crate::observer::{Observer, Update};
    pub use crate::session::Session;
    pub use crate::state::NavState;
}
