//! Core types and traits for the twinsync real-time simulation bridge.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the variable store, the stepping engine and
//! model implementations: typed values, variable definitions, exchange
//! snapshots, the model capability traits, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod snapshot;
pub mod value;
pub mod variable;

pub use error::{InitError, ModelError, StepError, StoreError};
pub use model::{ModelProvider, SimulationModel};
pub use snapshot::ExchangeSnapshot;
pub use value::{Value, VariableKind};
pub use variable::VariableDef;
