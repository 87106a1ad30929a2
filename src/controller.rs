use std::sync::Arc;
use std::time::Duration;

use crate::{Checkpoint, Error, Ledger, NavState, Pace, Pacer, Result};

/// The controller's answer to one checkpoint delivery.
#[derive(Debug)]
pub enum Decision {
    /// Resume forward; the step was counted and can be reversed later.
    Forward,
    /// Resume forward without counting; invisible to reverse navigation.
    ForwardUncounted,
    /// Undo one counted step.
    Backward,
    /// Invoke neither direction; execution stays frozen.
    Hold,
    /// Suspend at this checkpoint until a later command resumes it.
    Pause(PauseInfo),
}

/// Metadata for a pause decision.
#[derive(Debug, Clone)]
pub struct PauseInfo {
    pub line: u32,
    pub depth: usize,
    /// Set while animating: schedule an automatic resume after this delay.
    pub resume_after: Option<Duration>,
    /// Suggested highlight transition duration for the control surface.
    pub transition: Duration,
}

/// How the session should act on a `jump_to_step` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPlan {
    /// Already mid-jump; only the target moved.
    Coalesced,
    /// Navigate forward, resuming the pending pause or starting a run.
    Forward,
    /// Navigate backward through the stored continuation.
    Backward,
    /// Already at the target.
    Noop,
}

/// A counted step that can be undone: the checkpoint it crossed and the step
/// count before crossing it.
#[derive(Debug, Clone, Copy)]
struct StepRecord {
    line: u32,
    depth: usize,
    step_before: i64,
}

/// A suspended checkpoint whose resumption is held by the session.
#[derive(Debug, Clone, Copy)]
struct Pending {
    line: u32,
    depth: usize,
    step: i64,
}

/// The pause decision engine for one run.
///
/// Synchronous and free of I/O: it is fed checkpoint arrivals and user
/// commands, and answers with [`Decision`]s the async session translates into
/// channel replies. The trail of counted steps is what makes reverse
/// navigation land exactly where forward navigation did: each record
/// restores the ledger to its pre-step values and re-applies the pause test.
///
/// Most users drive a `Controller` indirectly through
/// [`Session`](crate::Session); it is public so the decision core can be
/// exercised directly against a scripted engine.
#[derive(Debug)]
pub struct Controller {
    state: NavState,
    ledger: Ledger,
    pacer: Pacer,
    monitored: Arc<str>,
    jump_target: i64,
    trail: Vec<StepRecord>,
    pending: Option<Pending>,
}

impl Controller {
    pub fn new(monitored: Arc<str>, speed: u8) -> Self {
        Self {
            state: NavState::Stopped,
            ledger: Ledger::new(),
            pacer: Pacer::new(speed),
            monitored,
            jump_target: -1,
            trail: Vec::new(),
            pending: None,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn set_state(&mut self, state: NavState) {
        self.state = state;
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn step_count(&self) -> i64 {
        self.ledger.step_count
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.pacer.set_speed(speed);
    }

    pub fn speed(&self) -> u8 {
        self.pacer.speed()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Initialise the ledger and trail for a fresh run in the given state.
    pub fn begin_run(&mut self, state: NavState) {
        self.state = state;
        self.ledger.begin_run();
        self.trail.clear();
        self.pending = None;
    }

    /// Decide what to do with a forward checkpoint arrival.
    pub fn on_checkpoint(&mut self, checkpoint: &Checkpoint, depth: usize) -> Decision {
        if checkpoint.script != self.monitored {
            return Decision::ForwardUncounted;
        }

        let class = self.ledger.classify(checkpoint.line, depth);
        if !class.new_line {
            return Decision::ForwardUncounted;
        }

        self.ledger.current_line = i64::from(checkpoint.line);
        self.ledger.stack_depth = depth;

        if self.state == NavState::Jump {
            return if self.ledger.step_count == self.jump_target {
                self.pause_at(checkpoint.line, depth, NavState::Paused, None)
            } else if self.ledger.step_count > self.jump_target {
                Decision::Backward
            } else {
                self.advance(checkpoint.line, depth)
            };
        }

        if !class.new_pause_line {
            return self.advance(checkpoint.line, depth);
        }

        match self.state {
            NavState::StepInto | NavState::Paused | NavState::StepBack => {
                self.pause_at(checkpoint.line, depth, NavState::Paused, None)
            }
            NavState::StepOver if class.paused_stack_delta <= 0 => {
                self.pause_at(checkpoint.line, depth, NavState::Paused, None)
            }
            NavState::StepOut if class.paused_stack_delta < 0 => {
                self.pause_at(checkpoint.line, depth, NavState::Paused, None)
            }
            NavState::StepOver | NavState::StepOut => self.advance(checkpoint.line, depth),
            NavState::Stopped => Decision::Hold,
            NavState::Running => self.advance(checkpoint.line, depth),
            NavState::Animate => match self.pacer.plan(self.ledger.step_count) {
                Pace::Skip => self.advance(checkpoint.line, depth),
                Pace::Pause { resume_after } => self.pause_at(
                    checkpoint.line,
                    depth,
                    NavState::Animate,
                    Some(resume_after),
                ),
            },
            // Handled above; kept for exhaustiveness.
            NavState::Jump => self.advance(checkpoint.line, depth),
        }
    }

    /// Decide what to do after the engine undid one counted step and
    /// re-presented the checkpoint before it.
    ///
    /// Fails when the reverse delivery does not line up with the recorded
    /// step, meaning the reversible-execution contract was violated and the run must
    /// abort rather than desynchronize the ledger.
    pub fn on_reverse(&mut self, _checkpoint: &Checkpoint, _depth: usize) -> Result<Decision> {
        let record = self.trail.pop().ok_or(Error::ReversalWithoutTrail)?;
        if self.ledger.step_count - 1 != record.step_before {
            return Err(Error::StepCountMismatch {
                expected: record.step_before,
                found: self.ledger.step_count - 1,
            });
        }

        self.ledger.step_count = record.step_before;
        self.ledger.current_line = i64::from(record.line);
        self.ledger.stack_depth = record.depth;

        if self.state == NavState::StepBack
            || (self.state == NavState::Jump && self.ledger.step_count == self.jump_target)
        {
            Ok(self.pause_at(record.line, record.depth, NavState::Paused, None))
        } else {
            Ok(Decision::Backward)
        }
    }

    /// Book the pending pause as a crossed step; called when the session
    /// resumes the stored continuation forward.
    pub fn resume_forward(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.trail.push(StepRecord {
                line: pending.line,
                depth: pending.depth,
                step_before: pending.step,
            });
            self.ledger.step_count = pending.step + 1;
        }
    }

    /// Consume the pending pause for reverse navigation; the ledger is
    /// restored by the reverse arrival itself.
    pub fn resume_backward(&mut self) {
        self.pending = None;
    }

    /// Transition for a `back` command. Returns false when there is nothing
    /// to step back from.
    pub fn begin_back(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.state = NavState::StepBack;
        self.resume_backward();
        true
    }

    /// Transition for a `jump_to_step` command.
    pub fn command_jump(&mut self, target: i64) -> JumpPlan {
        if self.state == NavState::Jump && target >= 0 {
            self.jump_target = target;
            return JumpPlan::Coalesced;
        }
        self.jump_target = target;
        if self.ledger.step_count < target {
            self.state = NavState::Jump;
            JumpPlan::Forward
        } else if self.pending.is_some() && self.ledger.step_count > target {
            self.state = NavState::Jump;
            self.resume_backward();
            JumpPlan::Backward
        } else {
            JumpPlan::Noop
        }
    }

    pub fn jump_target(&self) -> i64 {
        self.jump_target
    }

    /// The run completed; keep the counters for the progress surface but
    /// drop every stored continuation.
    pub fn finish(&mut self) {
        self.state = NavState::Stopped;
        self.pending = None;
        self.trail.clear();
    }

    /// Terminate the run and restore the not-started ledger.
    pub fn reset(&mut self) {
        self.state = NavState::Stopped;
        self.ledger.reset();
        self.pending = None;
        self.trail.clear();
    }

    fn advance(&mut self, line: u32, depth: usize) -> Decision {
        self.trail.push(StepRecord {
            line,
            depth,
            step_before: self.ledger.step_count,
        });
        self.ledger.step_count += 1;
        Decision::Forward
    }

    fn pause_at(
        &mut self,
        line: u32,
        depth: usize,
        next_state: NavState,
        resume_after: Option<Duration>,
    ) -> Decision {
        let was_jumping = self.state == NavState::Jump;
        self.state = next_state;
        self.ledger.mark_pause(line, depth);
        self.pending = Some(Pending {
            line,
            depth,
            step: self.ledger.step_count,
        });
        let transition = if was_jumping {
            Duration::ZERO
        } else {
            self.pacer.transition()
        };
        Decision::Pause(PauseInfo {
            line,
            depth,
            resume_after,
            transition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(state: NavState) -> Controller {
        let mut c = Controller::new(Arc::from("source"), 50);
        c.begin_run(state);
        c
    }

    fn cp(line: u32) -> Checkpoint {
        Checkpoint::new("source", line)
    }

    #[test]
    fn foreign_script_is_resumed_uncounted() {
        let mut c = controller(NavState::StepInto);
        let decision = c.on_checkpoint(&Checkpoint::new("_support", 3), 0);
        assert!(matches!(decision, Decision::ForwardUncounted));
        assert_eq!(c.step_count(), 0);
    }

    #[test]
    fn revisit_of_the_current_line_is_invisible() {
        let mut c = controller(NavState::Running);
        assert!(matches!(c.on_checkpoint(&cp(1), 0), Decision::Forward));
        assert!(matches!(
            c.on_checkpoint(&cp(1), 0),
            Decision::ForwardUncounted
        ));
        assert_eq!(c.step_count(), 1);
    }

    #[test]
    fn step_into_pauses_on_the_first_new_line() {
        let mut c = controller(NavState::StepInto);
        match c.on_checkpoint(&cp(1), 0) {
            Decision::Pause(info) => {
                assert_eq!(info.line, 1);
                assert_eq!(info.resume_after, None);
            }
            other => panic!("expected a pause, got {other:?}"),
        }
        assert_eq!(c.state(), NavState::Paused);
        assert_eq!(c.step_count(), 0);
        assert!(c.has_pending());
    }

    #[test]
    fn resume_forward_counts_the_paused_step() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(1), 0);
        c.set_state(NavState::StepInto);
        c.resume_forward();
        assert_eq!(c.step_count(), 1);
        assert!(!c.has_pending());
    }

    #[test]
    fn step_over_skips_deeper_frames() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(2), 0);
        c.set_state(NavState::StepOver);
        c.resume_forward();
        // Inside a call: deeper than the pause, resumed through.
        assert!(matches!(c.on_checkpoint(&cp(10), 1), Decision::Forward));
        assert!(matches!(c.on_checkpoint(&cp(11), 1), Decision::Forward));
        // Back at the pause depth.
        assert!(matches!(c.on_checkpoint(&cp(3), 0), Decision::Pause(_)));
    }

    #[test]
    fn step_out_needs_a_shallower_frame() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(10), 1);
        c.set_state(NavState::StepOut);
        c.resume_forward();
        // Same depth as the pause: not out yet.
        assert!(matches!(c.on_checkpoint(&cp(11), 1), Decision::Forward));
        assert!(matches!(c.on_checkpoint(&cp(3), 0), Decision::Pause(_)));
    }

    #[test]
    fn pause_request_waits_for_a_new_pause_line() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(6), 0);
        c.set_state(NavState::Running);
        c.resume_forward();
        assert!(matches!(c.on_checkpoint(&cp(7), 0), Decision::Forward));
        // A pause request lands on the next checkpoint, unless that
        // checkpoint revisits the last paused line at the paused depth.
        c.set_state(NavState::Paused);
        assert!(matches!(c.on_checkpoint(&cp(6), 0), Decision::Forward));
        assert!(matches!(c.on_checkpoint(&cp(8), 0), Decision::Pause(_)));
    }

    #[test]
    fn stopped_state_freezes_execution() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(1), 0);
        c.set_state(NavState::Stopped);
        c.resume_forward();
        assert!(matches!(c.on_checkpoint(&cp(2), 0), Decision::Hold));
    }

    #[test]
    fn reverse_restores_the_recorded_step() {
        let mut c = controller(NavState::Running);
        c.on_checkpoint(&cp(1), 0);
        c.on_checkpoint(&cp(2), 0);
        assert_eq!(c.step_count(), 2);
        c.set_state(NavState::StepBack);
        let decision = c.on_reverse(&cp(2), 0).unwrap();
        assert!(matches!(decision, Decision::Pause(_)));
        assert_eq!(c.step_count(), 1);
        assert_eq!(c.ledger().current_line, 2);
    }

    #[test]
    fn reverse_without_a_trail_is_a_fault() {
        let mut c = controller(NavState::StepBack);
        assert!(matches!(
            c.on_reverse(&cp(1), 0),
            Err(Error::ReversalWithoutTrail)
        ));
    }

    #[test]
    fn desynchronized_reversal_is_a_fault() {
        let mut c = controller(NavState::Running);
        c.on_checkpoint(&cp(1), 0);
        c.on_checkpoint(&cp(2), 0);
        c.set_state(NavState::StepBack);
        // Simulate an engine that skipped a step while unwinding.
        c.ledger.step_count = 3;
        match c.on_reverse(&cp(2), 0) {
            Err(Error::StepCountMismatch { expected, found }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected a step count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn jump_retargets_while_already_jumping() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(1), 0);
        assert_eq!(c.command_jump(5), JumpPlan::Forward);
        assert_eq!(c.state(), NavState::Jump);
        assert_eq!(c.command_jump(3), JumpPlan::Coalesced);
        assert_eq!(c.jump_target(), 3);
    }

    #[test]
    fn jump_to_the_current_step_is_a_noop() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(1), 0);
        assert_eq!(c.command_jump(0), JumpPlan::Noop);
        assert!(c.has_pending());
    }

    #[test]
    fn jump_pause_has_no_transition() {
        let mut c = controller(NavState::StepInto);
        c.on_checkpoint(&cp(1), 0);
        c.command_jump(2);
        c.resume_forward();
        assert!(matches!(c.on_checkpoint(&cp(2), 0), Decision::Forward));
        match c.on_checkpoint(&cp(3), 0) {
            Decision::Pause(info) => assert_eq!(info.transition, Duration::ZERO),
            other => panic!("expected a pause, got {other:?}"),
        }
        assert_eq!(c.state(), NavState::Paused);
        assert_eq!(c.step_count(), 2);
    }

    #[test]
    fn jump_overshoot_reverses() {
        let mut c = controller(NavState::Running);
        c.on_checkpoint(&cp(1), 0);
        c.on_checkpoint(&cp(2), 0);
        c.on_checkpoint(&cp(3), 0);
        c.set_state(NavState::Jump);
        // A forward arrival while past the target turns around.
        assert_eq!(c.command_jump(1), JumpPlan::Coalesced);
        assert!(matches!(c.on_checkpoint(&cp(4), 0), Decision::Backward));
    }

    #[test]
    fn animate_full_speed_skips_most_checkpoints() {
        let mut c = controller(NavState::Animate);
        c.set_speed(100);
        let mut pauses = 0;
        for line in 0..50u32 {
            match c.on_checkpoint(&cp(line + 1), 0) {
                Decision::Pause(info) => {
                    assert_eq!(info.resume_after, Some(Duration::ZERO));
                    pauses += 1;
                    assert_eq!(c.state(), NavState::Animate);
                    c.resume_forward();
                }
                Decision::Forward => {}
                other => panic!("unexpected decision {other:?}"),
            }
        }
        assert_eq!(pauses, 4);
    }

    #[test]
    fn finish_keeps_the_count_reset_clears_it() {
        let mut c = controller(NavState::Running);
        c.on_checkpoint(&cp(1), 0);
        c.on_checkpoint(&cp(2), 0);
        c.finish();
        assert_eq!(c.state(), NavState::Stopped);
        assert_eq!(c.step_count(), 2);
        c.reset();
        assert_eq!(c.step_count(), -1);
        assert_eq!(c.ledger().current_line, -1);
    }
}
