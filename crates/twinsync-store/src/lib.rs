//! Variable store: the only shared-mutable-state boundary between the
//! synchronization engine and the external variable interface.
//!
//! [`VariableStore`] holds typed values behind a short critical section
//! with a bounded wait. [`AccessGate`] hands out [`Session`]s that gate
//! writes on a credential check.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod store;

pub use access::{AccessGate, Session, UserDatabase};
pub use store::{VariableStore, DEFAULT_LOCK_TIMEOUT};
