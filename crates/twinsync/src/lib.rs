//! twinsync: keep a continuous-time simulation model in step with
//! wall-clock time and expose its inputs and outputs through a shared,
//! typed variable store.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all twinsync sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use twinsync::prelude::*;
//! use twinsync::models::teststand;
//!
//! let store = VariableStore::new(teststand::layout()).unwrap();
//! store
//!     .write(teststand::DELTA_P_PRIMARY_SET, Value::Real(100_000.0))
//!     .unwrap();
//!
//! let config = SyncConfig::with_step_size(10.0);
//! let mut engine = bootstrap(
//!     &SubstationProvider::default(),
//!     teststand::MODEL_REF,
//!     &store,
//!     &config,
//! )
//! .unwrap();
//!
//! // One cycle by hand; `SyncDriver::start` runs them in real time.
//! let report = run_cycle(&mut engine, &store);
//! assert!(report.is_ok());
//! assert_eq!(engine.clock().next_sync_point(), 20.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `twinsync-core` | Values, variable definitions, model traits, errors |
//! | [`store`] | `twinsync-store` | Variable store and access control |
//! | [`engine`] | `twinsync-engine` | Stepping engine, cycle, driver, configuration |
//! | [`models`] | `twinsync-models` | Reference substation model and test stand layout |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and errors (`twinsync-core`).
pub use twinsync_core as types;

/// Variable store and access control (`twinsync-store`).
pub use twinsync_store as store;

/// Synchronization engine (`twinsync-engine`).
///
/// [`engine::SteppingEngine`] advances a model to a sync point;
/// [`engine::SyncDriver`] runs cycles against wall-clock time.
pub use twinsync_engine as engine;

/// Reference models (`twinsync-models`).
pub use twinsync_models as models;

/// Common imports for typical twinsync usage.
///
/// ```rust
/// use twinsync::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use twinsync_core::{
        ExchangeSnapshot, ModelProvider, SimulationModel, Value, VariableDef, VariableKind,
    };

    // Errors
    pub use twinsync_core::{InitError, ModelError, StepError, StoreError};

    // Store
    pub use twinsync_store::{AccessGate, Session, UserDatabase, VariableStore};

    // Engine
    pub use twinsync_engine::{
        bootstrap, run_cycle, start, CycleReport, DriverState, ShutdownHandle, SteppingEngine,
        SyncConfig, SyncDriver,
    };

    // Models
    pub use twinsync_models::{SubstationModel, SubstationProvider};
}
