//! Per-cycle and cumulative driver metrics.
//!
//! [`CycleMetrics`] captures timing and sub-step data for a single
//! synchronization cycle. [`DriverMetrics`] is a point-in-time copy of
//! the driver's cumulative counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Timing and sub-step data collected during one cycle.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleMetrics {
    /// Wall-clock time for the whole cycle.
    pub total_us: u64,
    /// Time spent reading inputs from the store.
    pub read_us: u64,
    /// Time spent inside the model (inputs, events, integration, outputs).
    pub step_us: u64,
    /// Time spent publishing outputs to the store.
    pub publish_us: u64,
    /// Number of `integrate` calls needed to reach the target.
    pub sub_steps: u32,
    /// Number of discrete event evaluations.
    pub event_evaluations: u32,
    /// The synchronization point targeted.
    pub target_time: f64,
    /// Simulated time actually reached.
    pub reached_time: f64,
}

/// Snapshot of the driver's cumulative counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverMetrics {
    /// Timer firings, including skipped ones.
    pub firings: u64,
    /// Firings dropped because a cycle was still in flight.
    pub firings_skipped: u64,
    /// Cycles whose outputs were published.
    pub cycles_completed: u64,
    /// Cycles that failed (stale outputs retained).
    pub cycles_failed: u64,
    /// Cycles that ran with stale inputs after a store read failed.
    pub stale_input_cycles: u64,
    /// Duration of the most recent cycle, in microseconds.
    pub last_cycle_us: u64,
    /// Longest cycle so far, in microseconds.
    pub max_cycle_us: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DriverCounters {
    firings: AtomicU64,
    firings_skipped: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    stale_input_cycles: AtomicU64,
    last_cycle_us: AtomicU64,
    max_cycle_us: AtomicU64,
}

impl DriverCounters {
    pub fn record_firing(&self) {
        self.firings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.firings_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `n` grid periods that passed without a firing.
    pub fn record_missed(&self, n: u64) {
        self.firings.fetch_add(n, Ordering::Relaxed);
        self.firings_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, ok: bool, stale_inputs: bool, total_us: u64) {
        if ok {
            self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        }
        if stale_inputs {
            self.stale_input_cycles.fetch_add(1, Ordering::Relaxed);
        }
        self.last_cycle_us.store(total_us, Ordering::Relaxed);
        self.max_cycle_us.fetch_max(total_us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DriverMetrics {
        DriverMetrics {
            firings: self.firings.load(Ordering::Relaxed),
            firings_skipped: self.firings_skipped.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            stale_input_cycles: self.stale_input_cycles.load(Ordering::Relaxed),
            last_cycle_us: self.last_cycle_us.load(Ordering::Relaxed),
            max_cycle_us: self.max_cycle_us.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        assert_eq!(DriverCounters::default().snapshot(), DriverMetrics::default());
        let m = CycleMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.sub_steps, 0);
    }

    #[test]
    fn counters_accumulate() {
        let c = DriverCounters::default();
        c.record_firing();
        c.record_firing();
        c.record_skip();
        c.record_missed(3);
        c.record_cycle(true, false, 40);
        c.record_cycle(false, true, 25);
        let m = c.snapshot();
        assert_eq!(m.firings, 5);
        assert_eq!(m.firings_skipped, 4);
        assert_eq!(m.cycles_completed, 1);
        assert_eq!(m.cycles_failed, 1);
        assert_eq!(m.stale_input_cycles, 1);
        assert_eq!(m.last_cycle_us, 25);
        assert_eq!(m.max_cycle_us, 40);
    }
}
