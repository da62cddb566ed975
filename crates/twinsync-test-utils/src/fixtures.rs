//! Scripted model fixtures.
//!
//! - [`ScriptedModel`]: integrates `y' = u`, configurable per test.
//! - [`ModelProbe`]: shared call counters, readable while the model is
//!   owned by the engine.
//! - [`FixtureProvider`]: [`ModelProvider`] handing out scripted models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use twinsync_core::{ModelError, ModelProvider, SimulationModel, Value, VariableDef, VariableKind};

/// Variable layout matching [`ScriptedModel`]'s slots.
///
/// Inputs: `u` (real, 1.0), `enabled` (boolean, true).
/// Outputs: `y`, `time` (real).
pub fn fixture_layout() -> Vec<VariableDef> {
    vec![
        VariableDef::input("u", Value::Real(1.0)),
        VariableDef::input("enabled", Value::Boolean(true)),
        VariableDef::output("y", VariableKind::Real),
        VariableDef::output("time", VariableKind::Real),
    ]
}

/// Call counters shared between a [`ScriptedModel`] and the test body.
#[derive(Debug, Default)]
pub struct ModelProbe {
    set_input_calls: AtomicUsize,
    initialize_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
    integrate_calls: AtomicUsize,
    active_integrations: AtomicUsize,
    max_concurrent_integrations: AtomicUsize,
    integrate_starts: Mutex<Vec<Instant>>,
}

impl ModelProbe {
    pub fn set_input_calls(&self) -> usize {
        self.set_input_calls.load(Ordering::SeqCst)
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    pub fn integrate_calls(&self) -> usize {
        self.integrate_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `integrate` calls observed running at once.
    pub fn max_concurrent_integrations(&self) -> usize {
        self.max_concurrent_integrations.load(Ordering::SeqCst)
    }

    /// Wall-clock instants at which each `integrate` call began.
    pub fn integrate_starts(&self) -> Vec<Instant> {
        self.integrate_starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A model integrating `y' = u` (only while `enabled`), with scripted
/// misbehaviour.
pub struct ScriptedModel {
    name: String,
    time: f64,
    u: f64,
    enabled: bool,
    y: f64,
    initialized: bool,
    event_spacing: Option<f64>,
    stall: bool,
    fail_after_integrations: Option<usize>,
    panic_after_integrations: Option<usize>,
    fail_initialize: bool,
    step_delay: Option<Duration>,
    first_step_delay: Option<Duration>,
    input_range: Option<(f64, f64)>,
    probe: Arc<ModelProbe>,
}

impl ScriptedModel {
    /// A well-behaved model that always reaches the requested target.
    pub fn ramp() -> Self {
        Self {
            name: "scripted".to_string(),
            time: 0.0,
            u: 0.0,
            enabled: true,
            y: 0.0,
            initialized: false,
            event_spacing: None,
            stall: false,
            fail_after_integrations: None,
            panic_after_integrations: None,
            fail_initialize: false,
            step_delay: None,
            first_step_delay: None,
            input_range: None,
            probe: Arc::new(ModelProbe::default()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stop integration at every multiple of `spacing` simulated seconds.
    pub fn with_event_spacing(mut self, spacing: f64) -> Self {
        self.event_spacing = Some(spacing);
        self
    }

    /// `integrate` never makes progress.
    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Fail every `integrate` call after the first `n`.
    pub fn fail_after_integrations(mut self, n: usize) -> Self {
        self.fail_after_integrations = Some(n);
        self
    }

    /// Panic inside every `integrate` call after the first `n`.
    pub fn panic_after_integrations(mut self, n: usize) -> Self {
        self.panic_after_integrations = Some(n);
        self
    }

    /// `initialize` always fails.
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Sleep for `delay` of wall-clock time inside every `integrate` call.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Sleep for `delay` inside the first `integrate` call only.
    pub fn with_first_step_delay(mut self, delay: Duration) -> Self {
        self.first_step_delay = Some(delay);
        self
    }

    /// Reject `u` values outside `[lo, hi]`.
    pub fn with_input_range(mut self, lo: f64, hi: f64) -> Self {
        self.input_range = Some((lo, hi));
        self
    }

    /// Counters shared with this model.
    pub fn probe(&self) -> Arc<ModelProbe> {
        Arc::clone(&self.probe)
    }

    fn next_event_after(&self, t: f64) -> Option<f64> {
        self.event_spacing.map(|s| {
            let event = ((t / s).floor() + 1.0) * s;
            // `t` may sit a rounding error below a multiple of `s`.
            if event <= t {
                event + s
            } else {
                event
            }
        })
    }
}

impl SimulationModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_input(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
        self.probe.set_input_calls.fetch_add(1, Ordering::SeqCst);
        match (name, value) {
            ("u", Value::Real(v)) => {
                let in_range = self
                    .input_range
                    .is_none_or(|(lo, hi)| (lo..=hi).contains(&v));
                if !v.is_finite() || !in_range {
                    return Err(ModelError::InvalidValue {
                        name: name.to_string(),
                        reason: format!("{v} out of range"),
                    });
                }
                self.u = v;
                Ok(())
            }
            ("enabled", Value::Boolean(b)) => {
                self.enabled = b;
                Ok(())
            }
            ("u", _) | ("enabled", _) => Err(ModelError::InvalidValue {
                name: name.to_string(),
                reason: format!("wrong kind {}", value.kind()),
            }),
            _ => Err(ModelError::UnknownSlot {
                name: name.to_string(),
            }),
        }
    }

    fn initialize(&mut self) -> Result<(), ModelError> {
        self.probe.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(ModelError::Failed {
                reason: "scripted initialization failure".to_string(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    fn evaluate_events(&mut self) -> Result<(), ModelError> {
        self.probe.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn integrate(&mut self, target_time: f64) -> Result<f64, ModelError> {
        let n = self.probe.integrate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe
            .integrate_starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
        if !self.initialized {
            return Err(ModelError::Failed {
                reason: "integrate before initialize".to_string(),
            });
        }
        if self.fail_after_integrations.is_some_and(|limit| n > limit) {
            return Err(ModelError::SolverFailed {
                reason: format!("scripted failure on integrate call {n}"),
            });
        }
        if self.panic_after_integrations.is_some_and(|limit| n > limit) {
            panic!("scripted panic on integrate call {n}");
        }

        let active = self.probe.active_integrations.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe
            .max_concurrent_integrations
            .fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.step_delay {
            std::thread::sleep(delay);
        }
        if let Some(delay) = self.first_step_delay.filter(|_| n == 1) {
            std::thread::sleep(delay);
        }

        let reached = if self.stall {
            self.time
        } else {
            match self.next_event_after(self.time) {
                Some(event) => target_time.min(event),
                None => target_time,
            }
        };
        if reached > self.time {
            if self.enabled {
                self.y += self.u * (reached - self.time);
            }
            self.time = reached;
        }

        self.probe.active_integrations.fetch_sub(1, Ordering::SeqCst);
        Ok(self.time)
    }

    fn get_output(&self, name: &str) -> Result<Value, ModelError> {
        match name {
            "y" => Ok(Value::Real(self.y)),
            "time" => Ok(Value::Real(self.time)),
            "u" => Ok(Value::Real(self.u)),
            "enabled" => Ok(Value::Boolean(self.enabled)),
            _ => Err(ModelError::UnknownSlot {
                name: name.to_string(),
            }),
        }
    }

    fn time(&self) -> f64 {
        self.time
    }
}

type Factory = Box<dyn Fn() -> ScriptedModel + Send + Sync>;

/// Hands out [`ScriptedModel`]s for one model reference.
pub struct FixtureProvider {
    model_ref: String,
    factory: Factory,
}

impl FixtureProvider {
    pub fn new(
        model_ref: impl Into<String>,
        factory: impl Fn() -> ScriptedModel + Send + Sync + 'static,
    ) -> Self {
        Self {
            model_ref: model_ref.into(),
            factory: Box::new(factory),
        }
    }
}

impl ModelProvider for FixtureProvider {
    fn instantiate(
        &self,
        model_ref: &str,
        instance_name: &str,
    ) -> Result<Box<dyn SimulationModel>, ModelError> {
        if model_ref != self.model_ref {
            return Err(ModelError::InstantiationFailed {
                reason: format!("unknown model reference '{model_ref}'"),
            });
        }
        Ok(Box::new((self.factory)().named(instance_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized(model: ScriptedModel) -> ScriptedModel {
        let mut model = model;
        model.initialize().unwrap();
        model
    }

    #[test]
    fn ramp_reaches_target_in_one_call() {
        let mut m = initialized(ScriptedModel::ramp());
        m.set_input("u", Value::Real(2.0)).unwrap();
        assert_eq!(m.integrate(5.0).unwrap(), 5.0);
        assert_eq!(m.get_output("y").unwrap(), Value::Real(10.0));
    }

    #[test]
    fn events_stop_integration_early() {
        let mut m = initialized(ScriptedModel::ramp().with_event_spacing(3.0));
        assert_eq!(m.integrate(10.0).unwrap(), 3.0);
        assert_eq!(m.integrate(10.0).unwrap(), 6.0);
        assert_eq!(m.integrate(10.0).unwrap(), 9.0);
        assert_eq!(m.integrate(10.0).unwrap(), 10.0);
    }

    #[test]
    fn disabled_model_holds_output() {
        let mut m = initialized(ScriptedModel::ramp());
        m.set_input("u", Value::Real(1.0)).unwrap();
        m.set_input("enabled", Value::Boolean(false)).unwrap();
        m.integrate(4.0).unwrap();
        assert_eq!(m.get_output("y").unwrap(), Value::Real(0.0));
        assert_eq!(m.time(), 4.0);
    }

    #[test]
    fn range_and_kind_checks() {
        let mut m = ScriptedModel::ramp().with_input_range(0.0, 1.0);
        assert!(m.set_input("u", Value::Real(2.0)).is_err());
        assert!(m.set_input("u", Value::Boolean(true)).is_err());
        assert!(matches!(
            m.set_input("v", Value::Real(0.0)),
            Err(ModelError::UnknownSlot { .. })
        ));
        assert_eq!(m.probe().set_input_calls(), 3);
    }

    #[test]
    fn provider_rejects_unknown_reference() {
        let provider = FixtureProvider::new("ramp", ScriptedModel::ramp);
        assert!(provider.instantiate("ramp", "inst").is_ok());
        assert!(matches!(
            provider.instantiate("other", "inst"),
            Err(ModelError::InstantiationFailed { .. })
        ));
    }
}
