//! [`SyncClock`]: simulated time versus the next synchronization point.

/// Synchronization clock owned by the [`SteppingEngine`](crate::SteppingEngine).
///
/// Starts at `current_time = 0`, `next_sync_point = step_size`. The
/// synchronization point moves forward by exactly one step per cycle,
/// whether or not the cycle's step succeeded, so no cycle is silently
/// skipped. Sync points are computed as `(cycles + 1) * step_size` so
/// that repeated additions do not accumulate rounding drift.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncClock {
    current_time: f64,
    step_size: f64,
    next_sync_point: f64,
    cycles: u64,
}

impl SyncClock {
    /// A fresh clock at time zero.
    pub fn new(step_size: f64) -> Self {
        Self {
            current_time: 0.0,
            step_size,
            next_sync_point: step_size,
            cycles: 0,
        }
    }

    /// Simulated time most recently reached by the model.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Simulated interval per cycle.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Target time of the next cycle.
    pub fn next_sync_point(&self) -> f64 {
        self.next_sync_point
    }

    /// Number of cycles the clock has advanced through.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub(crate) fn record_time(&mut self, t: f64) {
        self.current_time = t;
    }

    pub(crate) fn advance(&mut self) {
        self.cycles += 1;
        self.next_sync_point = (self.cycles + 1) as f64 * self.step_size;
    }
}
