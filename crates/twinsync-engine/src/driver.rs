//! [`SyncDriver`]: periodic real-time dispatch and the shutdown state machine.
//!
//! # Architecture
//!
//! ```text
//! Caller                 Timer Thread                Worker Thread
//!   |                        |                            |
//!   |--start()-------------->| park_timeout(poll)         |
//!   |                        | every step_size:           |
//!   |                        |   in_flight? skip          |
//!   |                        |   tx.try_send(()) -------->| rx.recv()
//!   |                        |   [bounded(1)]             | store.read_all(inputs)
//!   |                        |                            | engine.sync_cycle()
//!   |                        |                            | store.write_outputs()
//!   |                        |                            | in_flight = false
//!   |--shutdown()----------->| unpark, exit, drop tx ---->| finish cycle, exit
//!   |<--ShutdownReport-------|----------------------------|--engine recovered
//! ```
//!
//! External request handlers share the [`VariableStore`] through the same
//! `Arc` and never touch the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::Instant;

use tracing::{info, warn};
use twinsync_store::VariableStore;

use crate::config::{ConfigError, SyncConfig};
use crate::cycle_thread::{timer_loop, worker_loop, DriverShared};
use crate::metrics::DriverMetrics;
use crate::stepping::SteppingEngine;

// ── DriverState ──────────────────────────────────────────────────

/// Lifecycle of the driver.
///
/// `Idle -> Scheduled -> Stepping -> Idle` per cycle;
/// `ShuttingDown -> Stopped` once shutdown is requested. `ShuttingDown`
/// waits for an in-flight `Stepping` cycle to finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DriverState {
    /// Waiting for the next timer firing.
    Idle = 0,
    /// A firing was handed to the worker.
    Scheduled = 1,
    /// The worker is running a cycle.
    Stepping = 2,
    /// Shutdown requested; threads are winding down.
    ShuttingDown = 3,
    /// Threads joined; no further cycles run.
    Stopped = 4,
}

impl DriverState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Scheduled,
            2 => Self::Stepping,
            3 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`SyncDriver::shutdown`].
#[derive(Clone, Debug)]
pub struct ShutdownReport {
    /// Time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Whether the timer thread was joined successfully.
    pub timer_joined: bool,
    /// Whether the worker thread was joined and the engine recovered.
    pub worker_joined: bool,
    /// Cumulative counters at shutdown.
    pub metrics: DriverMetrics,
    /// Simulated time reached, if the engine was recovered.
    pub sim_time: Option<f64>,
    /// Next synchronization point, if the engine was recovered.
    pub next_sync_point: Option<f64>,
}

// ── ShutdownHandle ───────────────────────────────────────────────

/// Cloneable handle that requests shutdown from another thread, such as a
/// signal handler.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    shared: Arc<DriverShared>,
    timer: Thread,
}

impl ShutdownHandle {
    /// Ask the driver to stop. Idempotent; returns immediately.
    ///
    /// The in-flight cycle, if any, still runs to completion.
    pub fn request(&self) {
        if self.shared.request_shutdown() {
            info!("shutdown requested");
        }
        self.timer.unpark();
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.shared.shutdown_requested()
    }
}

// ── SyncDriver ───────────────────────────────────────────────────

/// Runs one synchronization cycle per wall-clock period on a background
/// worker, dropping firings while a cycle is in flight.
pub struct SyncDriver {
    shared: Arc<DriverShared>,
    store: Arc<VariableStore>,
    timer_thread: Option<JoinHandle<()>>,
    worker_thread: Option<JoinHandle<SteppingEngine>>,
    timer: Thread,
    recovered_engine: Option<SteppingEngine>,
    config: SyncConfig,
}

impl SyncDriver {
    /// Spawn the timer and worker threads.
    ///
    /// The engine is moved to the worker. Every engine input must be a
    /// writable store variable and every engine output a read-only one.
    pub fn start(
        engine: SteppingEngine,
        store: Arc<VariableStore>,
        config: SyncConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_layout(&engine, &store)?;

        let shared = Arc::new(DriverShared::new());
        let (tx, rx) = crossbeam_channel::bounded(1);
        let period = config.period();
        let poll_interval = config.resolved_poll_interval();

        let worker_shared = Arc::clone(&shared);
        let worker_store = Arc::clone(&store);
        let worker_thread = thread::Builder::new()
            .name("twinsync-worker".into())
            .spawn(move || worker_loop(engine, worker_store, worker_shared, rx))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("worker: {e}"),
            })?;

        let timer_shared = Arc::clone(&shared);
        let timer_thread = match thread::Builder::new()
            .name("twinsync-timer".into())
            .spawn(move || timer_loop(timer_shared, tx, period, poll_interval))
        {
            Ok(handle) => handle,
            Err(e) => {
                // The sender died with the closure; the worker exits.
                let _ = worker_thread.join();
                return Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("timer: {e}"),
                });
            }
        };

        info!(
            step_size = config.step_size,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "sync driver started"
        );

        Ok(Self {
            shared,
            store,
            timer: timer_thread.thread().clone(),
            timer_thread: Some(timer_thread),
            worker_thread: Some(worker_thread),
            recovered_engine: None,
            config,
        })
    }

    /// Current lifecycle state (lock-free read).
    pub fn state(&self) -> DriverState {
        self.shared.state()
    }

    /// Snapshot of cumulative counters.
    pub fn metrics(&self) -> DriverMetrics {
        self.shared.counters.snapshot()
    }

    /// The store shared with external request handlers.
    pub fn store(&self) -> &Arc<VariableStore> {
        &self.store
    }

    /// The configuration the driver was started with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// A handle for requesting shutdown from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shared: Arc::clone(&self.shared),
            timer: self.timer.clone(),
        }
    }

    /// Stop the driver.
    ///
    /// 1. **Idle/Stepping → ShuttingDown:** raise the shutdown flag and
    ///    unpark the timer so it exits without waiting out its poll.
    /// 2. Join the timer; its exit disconnects the worker channel.
    /// 3. Join the worker, which finishes any in-flight cycle first and
    ///    skips a scheduled one that has not started.
    /// 4. **ShuttingDown → Stopped.**
    ///
    /// Calling it again returns a report without re-joining anything.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let start = Instant::now();
        if self.shared.request_shutdown() {
            info!("shutdown requested");
        }
        self.timer.unpark();
        self.finish(start)
    }

    /// Block until another thread requests shutdown through a
    /// [`ShutdownHandle`], then complete the shutdown sequence.
    ///
    /// Also returns, with `worker_joined == false`, if the worker thread
    /// panicked.
    pub fn run_until_shutdown(mut self) -> ShutdownReport {
        // The timer exits after a shutdown request or once the worker is lost.
        let timer_joined = self.join_timer();
        let mut report = self.finish(Instant::now());
        report.timer_joined &= timer_joined;
        report
    }

    /// Shut down and recover the engine.
    pub fn into_engine(mut self) -> Option<SteppingEngine> {
        self.shutdown();
        self.recovered_engine.take()
    }

    fn join_timer(&mut self) -> bool {
        match self.timer_thread.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }

    fn finish(&mut self, start: Instant) -> ShutdownReport {
        let timer_joined = self.join_timer();

        let worker_joined = match self.worker_thread.take() {
            Some(handle) => match handle.join() {
                Ok(engine) => {
                    self.recovered_engine = Some(engine);
                    true
                }
                Err(_) => {
                    warn!("cycle worker panicked; engine lost");
                    false
                }
            },
            None => self.recovered_engine.is_some(),
        };

        let first_stop = self.shared.state() != DriverState::Stopped;
        self.shared.set_state(DriverState::Stopped);

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            timer_joined,
            worker_joined,
            metrics: self.metrics(),
            sim_time: self
                .recovered_engine
                .as_ref()
                .map(|e| e.clock().current_time()),
            next_sync_point: self
                .recovered_engine
                .as_ref()
                .map(|e| e.clock().next_sync_point()),
        };
        if first_stop {
            info!(
                total_ms = report.total_ms,
                cycles_completed = report.metrics.cycles_completed,
                cycles_failed = report.metrics.cycles_failed,
                firings_skipped = report.metrics.firings_skipped,
                sim_time = report.sim_time,
                "sync driver stopped"
            );
        }
        report
    }
}

impl Drop for SyncDriver {
    fn drop(&mut self) {
        if self.shared.state() != DriverState::Stopped {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for SyncDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDriver")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_layout(engine: &SteppingEngine, store: &VariableStore) -> Result<(), ConfigError> {
    for name in engine.input_names() {
        if !store.definition(name).is_some_and(|d| d.writable) {
            return Err(ConfigError::InputNotInStore { name: name.clone() });
        }
    }
    for name in engine.output_names() {
        if !store.definition(name).is_some_and(|d| !d.writable) {
            return Err(ConfigError::OutputNotInStore { name: name.clone() });
        }
    }
    Ok(())
}
