/// Step bookkeeping for one run.
///
/// `stack_depth` and `current_line` track the last checkpoint seen and decide
/// whether a checkpoint is a new line at all; `paused_line` and
/// `paused_stack_depth` track the last position the user stopped on and drive
/// the step-over/step-out depth tests. A `step_count` of -1 means the run has
/// not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub step_count: i64,
    pub current_line: i64,
    pub stack_depth: usize,
    pub paused_line: i64,
    pub paused_stack_depth: usize,
}

/// Classification of one checkpoint against the ledger.
#[derive(Debug, Clone, Copy)]
pub struct StepClass {
    /// The checkpoint differs from the previous one by line or depth.
    pub new_line: bool,
    /// The checkpoint differs from the last pause by line or depth.
    pub new_pause_line: bool,
    /// Stack depth relative to the last pause.
    pub paused_stack_delta: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            step_count: -1,
            current_line: -1,
            stack_depth: 0,
            paused_line: -1,
            paused_stack_depth: 0,
        }
    }

    /// Restore the not-started state.
    pub fn reset(&mut self) {
        *self = Ledger::new();
    }

    /// Initialise the counters for a fresh run.
    pub fn begin_run(&mut self) {
        self.reset();
        self.step_count = 0;
    }

    pub fn classify(&self, line: u32, depth: usize) -> StepClass {
        let stack_delta = depth as i64 - self.stack_depth as i64;
        let paused_stack_delta = depth as i64 - self.paused_stack_depth as i64;
        StepClass {
            new_line: self.current_line != i64::from(line) || stack_delta != 0,
            new_pause_line: self.paused_line != i64::from(line) || paused_stack_delta != 0,
            paused_stack_delta,
        }
    }

    /// Record the position of a pause.
    pub fn mark_pause(&mut self, line: u32, depth: usize) {
        self.paused_line = i64::from(line);
        self.paused_stack_depth = depth;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_run_counts_from_zero() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.step_count, -1);
        ledger.begin_run();
        assert_eq!(ledger.step_count, 0);
        assert_eq!(ledger.current_line, -1);
    }

    #[test]
    fn revisit_of_same_line_and_depth_is_not_a_new_line() {
        let mut ledger = Ledger::new();
        ledger.begin_run();
        ledger.current_line = 4;
        ledger.stack_depth = 2;
        let class = ledger.classify(4, 2);
        assert!(!class.new_line);
        assert!(ledger.classify(4, 3).new_line);
        assert!(ledger.classify(5, 2).new_line);
    }

    #[test]
    fn pause_line_test_uses_the_last_pause_not_the_last_checkpoint() {
        let mut ledger = Ledger::new();
        ledger.begin_run();
        ledger.mark_pause(7, 1);
        ledger.current_line = 9;
        ledger.stack_depth = 2;

        // Back on the paused line at the paused depth: new line, but not a
        // new pause line.
        let class = ledger.classify(7, 1);
        assert!(class.new_line);
        assert!(!class.new_pause_line);
        assert_eq!(class.paused_stack_delta, 0);

        let deeper = ledger.classify(7, 3);
        assert!(deeper.new_pause_line);
        assert_eq!(deeper.paused_stack_delta, 2);
    }
}
