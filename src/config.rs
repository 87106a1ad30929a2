use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the command and engine event channels.
    pub channel_size: usize,
    /// Time budget for the pre-run step counter before it is cancelled.
    pub count_budget: Duration,
    /// Initial animate speed, `0..=100`.
    pub speed: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel_size: 128,
            count_budget: Duration::from_secs(10),
            speed: 50,
        }
    }
}

impl Config {
    pub fn with_channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    pub fn with_count_budget(mut self, budget: Duration) -> Self {
        self.count_budget = budget;
        self
    }

    pub fn with_speed(mut self, speed: u8) -> Self {
        self.speed = speed.min(100);
        self
    }
}
