use std::time::Duration;

/// Animate pauses skip all but every `round(-delay)`-th-of-11 checkpoints
/// once the delay goes negative.
const SKIP_MODULUS: i64 = 11;

/// What to do with a checkpoint while animating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Too fast to pause on this checkpoint; resume straight through.
    Skip,
    /// Pause, then auto-resume after the given delay.
    Pause { resume_after: Duration },
}

/// Maps the animate speed to a per-step delay and a skip plan.
///
/// Speed lives in `0..=100`. The delay curve is quadratic on the slow side
/// and linear above: 300 at speed 0, 75 at 15, 0 at 90, and -10 at full
/// speed. A negative delay means a scheduled per-step pause can no longer
/// keep up, so the pacer stops pausing on most checkpoints instead.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    speed: u8,
}

impl Pacer {
    pub fn new(speed: u8) -> Self {
        Self {
            speed: speed.min(100),
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.min(100);
    }

    /// Delay units for the current speed; one unit is 10 ms.
    pub fn delay(&self) -> i64 {
        let d = 90 - i64::from(self.speed);
        if d > 75 { (d - 75) * (d - 75) + 75 } else { d }
    }

    pub fn plan(&self, step_count: i64) -> Pace {
        let delay = self.delay();
        if delay < 0 && step_count.rem_euclid(SKIP_MODULUS) < -delay {
            Pace::Skip
        } else {
            Pace::Pause {
                resume_after: Duration::from_millis((delay.max(0) * 10) as u64),
            }
        }
    }

    /// Highlight transition duration for a pause, clamped to 0..=100 ms.
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.delay().clamp(0, 10) as u64 * 10)
    }
}
