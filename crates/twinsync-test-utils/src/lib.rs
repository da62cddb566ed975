//! Test utilities and scripted model fixtures for twinsync development.
//!
//! [`ScriptedModel`] is a minimal [`SimulationModel`](twinsync_core::SimulationModel)
//! integrating `y' = u` whose behaviour (early stops at events, stalls,
//! failures, slow steps, input range checks) is configured per test.
//! [`ModelProbe`] counts calls from outside the engine, and
//! [`FixtureProvider`] plugs fixtures into the startup path.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{fixture_layout, FixtureProvider, ModelProbe, ScriptedModel};
