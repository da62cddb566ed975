//! Timer and worker loops behind [`SyncDriver`](crate::SyncDriver).
//!
//! The timer thread fires on a fixed wall-clock grid and hands each firing
//! to the worker through a capacity-1 channel. The worker owns the
//! [`SteppingEngine`] exclusively (moved in at spawn) and returns it on
//! exit so the driver can recover it via `JoinHandle<SteppingEngine>`.
//!
//! The `in_flight` flag is set by the timer when it hands over a firing
//! and cleared by the worker once the cycle has finished, so a firing
//! that lands while a cycle is scheduled or running is dropped, never
//! queued. A worker that unwinds out of a cycle clears the flag through
//! [`InFlightGuard`] and marks itself lost, which stops the timer.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, warn};
use twinsync_store::VariableStore;

use crate::cycle::run_cycle;
use crate::driver::DriverState;
use crate::metrics::DriverCounters;
use crate::stepping::SteppingEngine;

/// State shared between the driver handle, the timer, and the worker.
#[derive(Debug)]
pub(crate) struct DriverShared {
    state: AtomicU8,
    in_flight: AtomicBool,
    shutdown: AtomicBool,
    worker_lost: AtomicBool,
    pub counters: DriverCounters,
}

impl DriverShared {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(DriverState::Idle as u8),
            in_flight: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            worker_lost: AtomicBool::new(false),
            counters: DriverCounters::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        DriverState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: DriverState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to` only if nothing else changed the state.
    fn transition(&self, from: DriverState, to: DriverState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Set once the worker thread has unwound out of a cycle.
    pub fn worker_lost(&self) -> bool {
        self.worker_lost.load(Ordering::Acquire)
    }

    /// Raise the shutdown flag. Returns `true` for the first request.
    pub fn request_shutdown(&self) -> bool {
        let first = !self.shutdown.swap(true, Ordering::AcqRel);
        if first {
            self.set_state(DriverState::ShuttingDown);
        }
        first
    }
}

/// Timer thread: fires every `period` until shutdown.
///
/// Sleeps with `park_timeout` so that a shutdown request can wake it
/// immediately via `unpark()`. Dropping `tx` on exit disconnects the
/// worker.
pub(crate) fn timer_loop(
    shared: Arc<DriverShared>,
    tx: Sender<()>,
    period: Duration,
    poll_interval: Duration,
) {
    let mut next_fire = Instant::now() + period;
    let mut skipping = false;
    loop {
        if shared.shutdown_requested() {
            break;
        }
        if shared.worker_lost() {
            error!("cycle worker lost, timer stopping");
            break;
        }

        let now = Instant::now();
        if now < next_fire {
            std::thread::park_timeout(poll_interval.min(next_fire - now));
            continue;
        }

        shared.counters.record_firing();
        if shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            shared.transition(DriverState::Idle, DriverState::Scheduled);
            match tx.try_send(()) {
                Ok(()) => skipping = false,
                Err(TrySendError::Full(())) => {
                    // Unreachable while in_flight guards the channel.
                    shared.in_flight.store(false, Ordering::Release);
                    shared.counters.record_skip();
                }
                Err(TrySendError::Disconnected(())) => {
                    warn!("cycle worker disconnected, timer stopping");
                    break;
                }
            }
        } else {
            shared.counters.record_skip();
            if skipping {
                debug!("previous cycle still in flight, firing skipped");
            } else {
                warn!("previous cycle still in flight, firing skipped");
                skipping = true;
            }
        }

        // Keep the grid. Periods missed while this thread was descheduled
        // count as skipped firings.
        next_fire += period;
        if next_fire <= now {
            let missed = missed_periods(now - next_fire, period);
            shared.counters.record_missed(missed);
            next_fire += scale(period, missed);
        }
    }
    debug!("timer thread stopped");
}

/// Whole periods elapsed in `lag`, counting the one starting at zero.
fn missed_periods(lag: Duration, period: Duration) -> u64 {
    let n = lag.as_nanos() / period.as_nanos().max(1) + 1;
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn scale(period: Duration, n: u64) -> Duration {
    let nanos = period.as_nanos().saturating_mul(u128::from(n));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Clears `in_flight` when a cycle ends, including by unwinding.
///
/// On unwind it also marks the worker lost so the timer stops instead of
/// counting every later firing as skipped.
struct InFlightGuard<'a>(&'a DriverShared);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("cycle worker panicked mid-cycle, no further cycles will run");
            self.0.worker_lost.store(true, Ordering::Release);
        }
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Worker thread: runs one cycle per handed-over firing.
///
/// Consumes the engine and returns it when the channel disconnects or a
/// firing arrives after shutdown was requested.
pub(crate) fn worker_loop(
    mut engine: SteppingEngine,
    store: Arc<VariableStore>,
    shared: Arc<DriverShared>,
    rx: Receiver<()>,
) -> SteppingEngine {
    while rx.recv().is_ok() {
        if shared.shutdown_requested() {
            // Scheduled but not started: drop it.
            shared.in_flight.store(false, Ordering::Release);
            break;
        }

        let _in_flight = InFlightGuard(&shared);
        shared.transition(DriverState::Scheduled, DriverState::Stepping);
        let report = run_cycle(&mut engine, &store);
        shared.counters.record_cycle(
            report.is_ok(),
            report.stale_inputs,
            report.metrics.total_us,
        );

        // Idle before the guard clears in_flight, so the next firing's
        // Idle -> Scheduled transition succeeds.
        shared.transition(DriverState::Stepping, DriverState::Idle);
    }
    debug!(
        sim_time = engine.clock().current_time(),
        "cycle worker stopped"
    );
    engine
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;

    use super::*;

    #[test]
    fn first_shutdown_request_wins() {
        let shared = DriverShared::new();
        assert_eq!(shared.state(), DriverState::Idle);
        assert!(shared.request_shutdown());
        assert!(!shared.request_shutdown());
        assert!(shared.shutdown_requested());
        assert_eq!(shared.state(), DriverState::ShuttingDown);
    }

    #[test]
    fn transitions_do_not_override_shutdown() {
        let shared = DriverShared::new();
        shared.request_shutdown();
        assert!(!shared.transition(DriverState::Idle, DriverState::Scheduled));
        assert!(!shared.transition(DriverState::Stepping, DriverState::Idle));
        assert_eq!(shared.state(), DriverState::ShuttingDown);
    }

    #[test]
    fn missed_periods_are_counted_without_iterating() {
        let period = Duration::from_nanos(4);
        assert_eq!(missed_periods(Duration::ZERO, period), 1);
        assert_eq!(missed_periods(Duration::from_nanos(3), period), 1);
        assert_eq!(missed_periods(Duration::from_nanos(4), period), 2);
        assert_eq!(missed_periods(Duration::from_secs(1), period), 250_000_001);
        assert_eq!(scale(period, 3), Duration::from_nanos(12));
        assert_eq!(scale(Duration::from_secs(u64::MAX), 2), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn unwinding_cycle_clears_in_flight_and_marks_worker_lost() {
        let shared = DriverShared::new();
        shared.in_flight.store(true, Ordering::Release);
        drop(InFlightGuard(&shared));
        assert!(!shared.in_flight.load(Ordering::Acquire));
        assert!(!shared.worker_lost());

        shared.in_flight.store(true, Ordering::Release);
        let unwound = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = InFlightGuard(&shared);
            panic!("cycle failed hard");
        }));
        assert!(unwound.is_err());
        assert!(!shared.in_flight.load(Ordering::Acquire));
        assert!(shared.worker_lost());
    }

    #[test]
    fn timer_stops_once_the_worker_is_lost() {
        let shared = Arc::new(DriverShared::new());
        let (tx, _rx) = crossbeam_channel::bounded(1);
        shared.worker_lost.store(true, Ordering::Release);
        let timer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                timer_loop(shared, tx, Duration::from_millis(1), Duration::from_millis(1))
            })
        };
        timer.join().unwrap();
        assert_eq!(shared.counters.snapshot().firings, 0);
    }

    #[test]
    fn timer_exits_promptly_on_shutdown() {
        let shared = Arc::new(DriverShared::new());
        let (tx, rx) = crossbeam_channel::bounded(1);
        let timer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                timer_loop(shared, tx, Duration::from_secs(60), Duration::from_secs(1))
            })
        };
        shared.request_shutdown();
        timer.thread().unpark();
        let start = Instant::now();
        timer.join().unwrap();
        assert!(start.elapsed() < Duration::from_millis(900));
        // The sender is gone with the timer.
        assert!(rx.recv().is_err());
    }
}
