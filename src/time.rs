use std::fmt;
use std::time::Instant;

/// Training time of a model
///
/// Tracks the current epoch, the step within the current epoch and the
/// total number of steps ever taken, plus wall-clock durations. A fresh
/// clock sits before the first epoch with every counter at `-1`.
#[derive(Debug, Clone)]
pub struct Time {
    epoch: i32,
    index: i64,
    absolute_index: i64,
    started: Instant,
    epoch_started: Instant,
}

impl Time {
    pub fn new() -> Self {
        Self::at(-1, -1, -1)
    }

    /// A clock positioned at the given counters
    pub fn at(epoch: i32, index: i64, absolute_index: i64) -> Self {
        let now = Instant::now();
        Self {
            epoch,
            index,
            absolute_index,
            started: now,
            epoch_started: now,
        }
    }

    /// Current epoch, `-1` before the first epoch
    pub fn epoch(&self) -> i32 {
        self.epoch
    }

    /// Step within the current epoch, `-1` before its first tick
    pub fn index(&self) -> i64 {
        self.index
    }

    /// Number of steps ever taken, minus one
    pub fn absolute_index(&self) -> i64 {
        self.absolute_index
    }

    /// Seconds elapsed since this clock was created
    pub fn absolute_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Seconds elapsed since the current epoch began
    pub fn seconds_since_last_epoch(&self) -> f64 {
        self.epoch_started.elapsed().as_secs_f64()
    }

    /// Advance by one example
    pub fn tick(&mut self) {
        self.index += 1;
        self.absolute_index += 1;
    }

    /// Start the next epoch
    pub fn new_epoch(&mut self) {
        self.epoch += 1;
        self.index = -1;
        self.epoch_started = Instant::now();
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{};{}", self.epoch, self.index, self.absolute_index)
    }
}
