use std::time::Duration;

use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::controller::{Controller, Decision, JumpPlan, PauseInfo};
use crate::counter::spawn_count;
use crate::engine::{Arrival, Engine, EnginePort, Outcome, Resume, RunEvent, RunId};
use crate::observer::{Observer, ReverseHook, Update};
use crate::{Checkpoint, Config, Error, NavState, Program, Result};

#[derive(Debug)]
pub(crate) enum Command {
    Run,
    StepInto,
    StepOver,
    StepOut,
    Back,
    Pause,
    Stop,
    Animate,
    JumpTo(i64),
    SetSpeed(u8),
    /// Internal: an animate auto-resume timer fired.
    AnimateTick(RunId),
    /// Internal: the pre-run step counter finished.
    TotalSteps(u64),
}

/// A handle to a running debug session.
///
/// Spawning a session starts its worker task, which owns the controller, the
/// stored continuation, the animate timer and the engine run task, and serves
/// commands until [`shutdown`](Session::shutdown). Commands are fire-and-
/// forget: their effects surface through the session's [`Observer`].
pub struct Session {
    commands: mpsc::Sender<Command>,
    cancel_token: CancellationToken,
    worker: JoinHandle<Result<()>>,
}

impl Session {
    /// Spawn a session for one program.
    ///
    /// `factory` builds a fresh engine for every run (and for the pre-run
    /// step counter, which starts immediately): a new run replaces the
    /// previous interpreter instance entirely instead of resetting it in
    /// place. Must be called within a Tokio runtime.
    pub fn spawn<E, F, O>(program: Program, config: Config, factory: F, observer: O) -> Session
    where
        E: Engine,
        F: Fn() -> E + Send + 'static,
        O: Observer + 'static,
    {
        let (commands, command_rx) = mpsc::channel(config.channel_size);
        let (event_tx, events) = mpsc::channel(config.channel_size);
        let cancel_token = CancellationToken::new();

        let controller = Controller::new(program.monitored.clone(), config.speed);
        let worker = SessionWorker {
            program,
            count_budget: config.count_budget,
            factory,
            observer,
            controller,
            commands: command_rx,
            command_feed: commands.clone(),
            events,
            event_tx,
            cancel_token: cancel_token.clone(),
            count_cancel: cancel_token.child_token(),
            run: None,
            pending: None,
            timer: None,
            total_steps: None,
        };
        let worker = tokio::spawn(worker.run());

        Session {
            commands,
            cancel_token,
            worker,
        }
    }

    /// Resume or start free-running execution.
    pub async fn run(&self) -> Result<()> {
        self.send(Command::Run).await
    }

    pub async fn step_into(&self) -> Result<()> {
        self.send(Command::StepInto).await
    }

    pub async fn step_over(&self) -> Result<()> {
        self.send(Command::StepOver).await
    }

    pub async fn step_out(&self) -> Result<()> {
        self.send(Command::StepOut).await
    }

    /// Reverse by one step. A no-op unless paused with a stored backward
    /// continuation.
    pub async fn back(&self) -> Result<()> {
        self.send(Command::Back).await
    }

    /// Request a pause; takes effect at the next checkpoint.
    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    /// Terminate the run from any state and reset the ledger.
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// Toggle animate mode: start timer-paced stepping, or drop back to
    /// paused when already animating.
    pub async fn animate(&self) -> Result<()> {
        self.send(Command::Animate).await
    }

    /// Navigate to an absolute step index, forward or backward. Disabled
    /// until the pre-run step counter has produced a total.
    pub async fn jump_to_step(&self, target: i64) -> Result<()> {
        self.send(Command::JumpTo(target)).await
    }

    /// Set the animate speed, `0..=100`.
    pub async fn set_speed(&self, speed: u8) -> Result<()> {
        self.send(Command::SetSpeed(speed)).await
    }

    /// Shut the session down and wait for its worker to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel_token.cancel();
        self.worker.await?
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.commands.send(cmd).await?;
        Ok(())
    }
}

/// The stored continuation pair for the current pause: replying `Forward`
/// advances past the paused checkpoint, replying `Backward` undoes the step
/// before it. Consuming it in either direction clears it.
struct PendingResume {
    reply: oneshot::Sender<Resume>,
    hook: Option<ReverseHook>,
}

struct SessionWorker<F, O> {
    program: Program,
    count_budget: Duration,
    factory: F,
    observer: O,
    controller: Controller,
    commands: mpsc::Receiver<Command>,
    command_feed: mpsc::Sender<Command>,
    events: mpsc::Receiver<RunEvent>,
    event_tx: mpsc::Sender<RunEvent>,
    cancel_token: CancellationToken,
    count_cancel: CancellationToken,
    run: Option<RunId>,
    pending: Option<PendingResume>,
    timer: Option<CancellationToken>,
    total_steps: Option<u64>,
}

impl<E, F, O> SessionWorker<F, O>
where
    E: Engine,
    F: Fn() -> E + Send + 'static,
    O: Observer,
{
    async fn run(mut self) -> Result<()> {
        spawn_count(
            (self.factory)(),
            self.program.clone(),
            self.count_budget,
            self.count_cancel.clone(),
            self.command_feed.clone(),
        );

        loop {
            select! {
                _ = self.cancel_token.cancelled() => break,
                Some(cmd) = self.commands.recv() => self.handle_command(cmd),
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }
        self.cancel_timer();
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Run => self.continue_with(NavState::Running),
            Command::StepInto => self.continue_with(NavState::StepInto),
            Command::StepOver => self.continue_with(NavState::StepOver),
            Command::StepOut => self.continue_with(NavState::StepOut),
            Command::Back => self.step_back(),
            Command::Pause => {
                self.cancel_timer();
                self.controller.set_state(NavState::Paused);
            }
            Command::Stop => self.stop(),
            Command::Animate => {
                if self.controller.state() == NavState::Animate {
                    self.cancel_timer();
                    self.controller.set_state(NavState::Paused);
                } else {
                    self.continue_with(NavState::Animate);
                }
            }
            Command::JumpTo(target) => self.jump_to(target),
            Command::SetSpeed(speed) => self.controller.set_speed(speed),
            Command::AnimateTick(run) => {
                // An idempotent continue: ignore ticks from replaced runs or
                // after animate mode was left.
                if self.run == Some(run)
                    && self.controller.state() == NavState::Animate
                    && self.pending.is_some()
                {
                    self.continue_with(NavState::Animate);
                }
            }
            Command::TotalSteps(total) => {
                tracing::debug!(total, "pre-run step count available");
                self.total_steps = Some(total);
                self.observer.on_total_steps(total);
            }
        }
    }

    fn handle_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Checkpoint {
                run,
                checkpoint,
                stack_depth,
                arrival,
                reply,
            } => {
                if self.run != Some(run) {
                    // A stale run: dropping the reply unwinds its engine.
                    return;
                }
                let decision = match arrival {
                    Arrival::Forward => self.controller.on_checkpoint(&checkpoint, stack_depth),
                    Arrival::Reverse => match self.controller.on_reverse(&checkpoint, stack_depth) {
                        Ok(decision) => decision,
                        Err(e) => {
                            self.abort_run(e);
                            return;
                        }
                    },
                };
                match decision {
                    Decision::Forward => {
                        let _ = reply.send(Resume::Forward);
                    }
                    Decision::ForwardUncounted => {
                        let _ = reply.send(Resume::ForwardUncounted);
                    }
                    Decision::Backward => {
                        let _ = reply.send(Resume::Backward);
                    }
                    Decision::Hold => drop(reply),
                    Decision::Pause(info) => self.enter_pause(run, checkpoint, info, reply),
                }
            }
            RunEvent::Finished { run, outcome } => {
                if self.run != Some(run) {
                    return;
                }
                self.run = None;
                self.cancel_timer();
                self.pending = None;
                match outcome {
                    Ok(Outcome::Rewound) => {
                        tracing::debug!("run rewound past its first step");
                        self.controller.reset();
                        self.observer.on_highlight(None);
                        self.emit_update(None, false, Duration::from_millis(100));
                        self.observer.on_finished(&Outcome::Rewound);
                    }
                    Ok(outcome) => {
                        tracing::debug!(steps = self.controller.step_count(), "run finished");
                        self.controller.finish();
                        self.observer.on_highlight(None);
                        self.emit_update(None, false, Duration::from_millis(100));
                        self.observer.on_finished(&outcome);
                    }
                    Err(Error::RunCancelled) => {
                        // The run was discarded on purpose; nothing to report.
                    }
                    Err(e) => self.abort_run(e),
                }
            }
        }
    }

    /// Resume the stored continuation forward in the given state, or start a
    /// fresh run when none is in flight.
    fn continue_with(&mut self, state: NavState) {
        self.cancel_timer();
        if let Some(pending) = self.pending.take() {
            self.controller.set_state(state);
            self.controller.resume_forward();
            self.observer.on_highlight(None);
            let _ = pending.reply.send(Resume::Forward);
        } else if self.run.is_none() {
            self.start_run(state);
        } else {
            tracing::debug!(%state, "command ignored while the engine is busy");
        }
    }

    fn start_run(&mut self, state: NavState) {
        let run = RunId::new();
        tracing::debug!(%state, "starting a fresh run");
        self.run = Some(run);
        self.controller.begin_run(state);

        let mut engine = (self.factory)();
        let port = EnginePort::new(run, self.event_tx.clone());
        let program = self.program.clone();
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = engine.run(program, port).await;
            let _ = events.send(RunEvent::Finished { run, outcome }).await;
        });
    }

    fn step_back(&mut self) {
        if !self.controller.has_pending() {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.cancel_timer();
        self.controller.begin_back();
        if let Some(hook) = pending.hook {
            hook();
        }
        let _ = pending.reply.send(Resume::Backward);
    }

    fn jump_to(&mut self, target: i64) {
        let Some(total) = self.total_steps else {
            tracing::debug!("total step count unknown; jump navigation is disabled");
            return;
        };
        let busy = self.run.is_some() && self.pending.is_none();
        if busy && self.controller.state() != NavState::Jump {
            tracing::debug!("jump ignored while the engine is busy");
            return;
        }
        let target = target.clamp(-1, total as i64);
        match self.controller.command_jump(target) {
            JumpPlan::Forward => {
                self.cancel_timer();
                if let Some(pending) = self.pending.take() {
                    self.controller.resume_forward();
                    self.observer.on_highlight(None);
                    let _ = pending.reply.send(Resume::Forward);
                } else if self.run.is_none() {
                    self.start_run(NavState::Jump);
                }
            }
            JumpPlan::Backward => {
                self.cancel_timer();
                if let Some(pending) = self.pending.take() {
                    if let Some(hook) = pending.hook {
                        hook();
                    }
                    let _ = pending.reply.send(Resume::Backward);
                }
            }
            JumpPlan::Coalesced | JumpPlan::Noop => {}
        }
    }

    /// Terminate the run: cancel the timer and any outstanding counting
    /// task, drop the stored continuation (the suspended engine unwinds),
    /// and restore the not-started ledger.
    fn stop(&mut self) {
        tracing::debug!("stopping the run");
        self.cancel_timer();
        self.count_cancel.cancel();
        self.run = None;
        self.pending = None;
        self.controller.reset();
        self.observer.on_highlight(None);
        self.emit_update(None, false, Duration::from_millis(100));
    }

    /// A fatal fault: abort the run, keep the session serving commands.
    fn abort_run(&mut self, error: Error) {
        tracing::error!(%error, "aborting the run");
        self.cancel_timer();
        self.run = None;
        self.pending = None;
        self.controller.reset();
        self.observer.on_highlight(None);
        self.observer.on_fault(&error);
    }

    fn enter_pause(
        &mut self,
        run: RunId,
        checkpoint: Checkpoint,
        info: PauseInfo,
        reply: oneshot::Sender<Resume>,
    ) {
        self.pending = Some(PendingResume { reply, hook: None });
        if let Some(after) = info.resume_after {
            self.schedule_animate_tick(run, after);
        }
        self.observer.on_highlight(Some(info.line));
        let hook = self.emit_update(Some(checkpoint), true, info.transition);
        if let Some(pending) = self.pending.as_mut() {
            pending.hook = hook;
        }
    }

    fn emit_update(
        &mut self,
        checkpoint: Option<Checkpoint>,
        is_paused: bool,
        transition: Duration,
    ) -> Option<ReverseHook> {
        let update = Update {
            checkpoint,
            state: self.controller.state(),
            step_count: self.controller.step_count(),
            stack_depth: self.controller.ledger().stack_depth,
            is_paused,
            transition,
        };
        self.observer.on_update(&update)
    }

    fn schedule_animate_tick(&mut self, run: RunId, after: Duration) {
        self.cancel_timer();
        let token = self.cancel_token.child_token();
        let commands = self.command_feed.clone();
        self.timer = Some(token.clone());
        tokio::spawn(async move {
            select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = commands.send(Command::AnimateTick(run)).await;
                }
            }
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
