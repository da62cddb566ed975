//! Capability traits for simulation models and their providers.
//!
//! The stepping engine depends only on these traits, never on a specific
//! modeling standard or packaging format. A model is an opaque, stateful
//! instance that accepts inputs, processes discrete events, integrates its
//! continuous state toward a target time (possibly stopping early), and
//! exposes outputs.

use crate::error::ModelError;
use crate::value::Value;

/// An instantiated, stateful simulation model.
///
/// Implementations must be `Send` so the engine can move the instance
/// onto its worker thread. They need not be `Sync`: the engine guarantees
/// exclusive access and never calls into a model from two threads.
///
/// # Call protocol
///
/// 1. [`set_input`](Self::set_input) for every declared input.
/// 2. [`initialize`](Self::initialize) once.
/// 3. Per cycle: `set_input`* → [`evaluate_events`](Self::evaluate_events)
///    → [`integrate`](Self::integrate) (repeated until the target is
///    reached) → [`get_output`](Self::get_output)*.
pub trait SimulationModel: Send + 'static {
    /// Human-readable instance name for logging.
    fn name(&self) -> &str;

    /// Set an input slot. Fails if the slot is unknown, has another kind,
    /// or the value is outside the model's accepted range.
    fn set_input(&mut self, name: &str, value: Value) -> Result<(), ModelError>;

    /// Run model initialization with the inputs set so far.
    fn initialize(&mut self) -> Result<(), ModelError>;

    /// Process pending discrete transitions at the current time.
    ///
    /// May change output values without advancing time.
    fn evaluate_events(&mut self) -> Result<(), ModelError>;

    /// Integrate continuous state toward `target_time`.
    ///
    /// Returns the time actually reached. A model may stop before
    /// `target_time` at an internal event boundary; the caller is then
    /// expected to call [`evaluate_events`](Self::evaluate_events) and
    /// integrate again.
    fn integrate(&mut self, target_time: f64) -> Result<f64, ModelError>;

    /// Read an output (or input) slot.
    fn get_output(&self, name: &str) -> Result<Value, ModelError>;

    /// Current internal simulation time.
    fn time(&self) -> f64;
}

/// Creates ready-to-initialize model instances from an opaque reference.
///
/// Loading and unpacking a packaged model description is the provider's
/// concern; the engine only sees the returned [`SimulationModel`].
pub trait ModelProvider {
    /// Instantiate the model identified by `model_ref`, naming the
    /// instance `instance_name`.
    fn instantiate(
        &self,
        model_ref: &str,
        instance_name: &str,
    ) -> Result<Box<dyn SimulationModel>, ModelError>;
}
