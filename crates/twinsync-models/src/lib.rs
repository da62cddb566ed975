//! Reference simulation models for twinsync.
//!
//! [`SubstationModel`] is a lumped district-heating substation test stand:
//! a counter-flow heat exchanger with a lagged secondary supply
//! temperature and a primary valve under optional PI control. Valve
//! saturation changes are reported as integration events, so the model
//! exercises the engine's event loop. [`teststand::layout()`] gives the
//! matching store layout and [`SubstationProvider`] instantiates it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod hex;
pub mod params;
pub mod provider;
pub mod substation;
pub mod teststand;

pub use params::SubstationParams;
pub use provider::SubstationProvider;
pub use substation::{SubstationModel, ValveMode};
