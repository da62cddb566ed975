//! Real-time synchronization engine.
//!
//! Keeps a continuous-time simulation model in step with wall-clock time:
//! the [`SteppingEngine`] advances the model to each synchronization point
//! (resuming across model-internal events), and the [`SyncDriver`] fires
//! one exchange-and-step cycle per wall-clock period on a dedicated worker,
//! skipping firings while a cycle is still in flight.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod cycle;
pub mod driver;
pub mod metrics;
pub mod startup;
pub mod stepping;

mod cycle_thread;

pub use clock::SyncClock;
pub use config::{ConfigError, SyncConfig};
pub use cycle::{run_cycle, CycleError, CycleReport};
pub use driver::{DriverState, ShutdownHandle, ShutdownReport, SyncDriver};
pub use metrics::{CycleMetrics, DriverMetrics};
pub use startup::{bootstrap, start, StartupError};
pub use stepping::SteppingEngine;
