//! Stepping engine: advances the model to a synchronization point.
//!
//! [`SteppingEngine`] owns the model instance and the [`SyncClock`]. Each
//! [`advance_to()`](SteppingEngine::advance_to) call applies inputs, runs
//! discrete event evaluation, then integrates until the target is reached
//! within `epsilon`, re-evaluating events whenever the model stops early.
//!
//! # Ownership
//!
//! The engine is `Send` but not shared: the driver moves it onto its
//! worker thread and recovers it on shutdown, so `advance_to` is never
//! invoked concurrently on one model.

use std::time::Instant;

use twinsync_core::{ExchangeSnapshot, InitError, SimulationModel, StepError};

use crate::clock::SyncClock;
use crate::config::{ConfigError, SyncConfig};
use crate::metrics::CycleMetrics;

// Compile-time assertion: SteppingEngine can move to the worker thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<SteppingEngine>();
    }
};

/// Owns a model instance and drives it from one sync point to the next.
pub struct SteppingEngine {
    model: Box<dyn SimulationModel>,
    clock: SyncClock,
    input_names: Vec<String>,
    output_names: Vec<String>,
    epsilon: f64,
    max_sub_steps: u32,
    last_metrics: CycleMetrics,
}

impl SteppingEngine {
    /// Wrap a freshly instantiated model.
    ///
    /// `input_names` and `output_names` are the model slots exchanged with
    /// the store each cycle. Validates `config`.
    pub fn new(
        model: Box<dyn SimulationModel>,
        input_names: Vec<String>,
        output_names: Vec<String>,
        config: &SyncConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            model,
            clock: SyncClock::new(config.step_size),
            input_names,
            output_names,
            epsilon: config.epsilon,
            max_sub_steps: config.max_sub_steps,
            last_metrics: CycleMetrics::default(),
        })
    }

    /// Apply initial inputs, run model initialization, and return the
    /// outputs at the initial time.
    pub fn initialize(
        &mut self,
        initial_inputs: &ExchangeSnapshot,
    ) -> Result<ExchangeSnapshot, InitError> {
        for (name, value) in initial_inputs.iter() {
            self.model
                .set_input(name, value)
                .map_err(|source| InitError::InitialValueRejected {
                    name: name.to_string(),
                    source,
                })?;
        }
        self.model.initialize().map_err(InitError::Initialization)?;
        self.clock.record_time(self.model.time());
        self.read_outputs().map_err(|e| InitError::InitialOutputs {
            reason: e.to_string(),
        })
    }

    /// Advance the model to `target_time` with the given inputs and return
    /// its outputs there.
    ///
    /// # Errors
    ///
    /// - [`StepError::InputRejected`] if the model refuses an input.
    /// - [`StepError::IntegrationFailure`] if event evaluation or
    ///   integration fails, the reached time is non-finite or moves
    ///   backwards, or the target is not reached within `max_sub_steps`
    ///   integration calls.
    /// - [`StepError::OutputUnavailable`] if an output cannot be read.
    pub fn advance_to(
        &mut self,
        target_time: f64,
        inputs: &ExchangeSnapshot,
    ) -> Result<ExchangeSnapshot, StepError> {
        let start = Instant::now();
        let mut metrics = CycleMetrics {
            target_time,
            ..CycleMetrics::default()
        };
        let result = self.advance_inner(target_time, inputs, &mut metrics);
        metrics.reached_time = self.model.time();
        metrics.step_us = start.elapsed().as_micros() as u64;
        self.clock.record_time(metrics.reached_time);
        self.last_metrics = metrics;
        result
    }

    fn advance_inner(
        &mut self,
        target: f64,
        inputs: &ExchangeSnapshot,
        metrics: &mut CycleMetrics,
    ) -> Result<ExchangeSnapshot, StepError> {
        // 1. Inputs.
        for (name, value) in inputs.iter() {
            self.model
                .set_input(name, value)
                .map_err(|source| StepError::InputRejected {
                    name: name.to_string(),
                    source,
                })?;
        }

        // 2. Discrete transitions triggered by the new inputs.
        self.evaluate_events(target, metrics)?;

        // 3. Integrate, resuming after every early stop.
        let mut current = self.model.time();
        while current < target - self.epsilon {
            if metrics.sub_steps >= self.max_sub_steps {
                return Err(StepError::IntegrationFailure {
                    reached: current,
                    target,
                    reason: format!(
                        "target not reached within {} integration calls",
                        self.max_sub_steps
                    ),
                });
            }
            let reached = self
                .model
                .integrate(target)
                .map_err(|e| StepError::IntegrationFailure {
                    reached: current,
                    target,
                    reason: e.to_string(),
                })?;
            metrics.sub_steps += 1;

            if !reached.is_finite() || reached < current {
                return Err(StepError::IntegrationFailure {
                    reached: current,
                    target,
                    reason: format!("model reported invalid reached time {reached}"),
                });
            }
            current = reached;
            self.clock.record_time(current);

            if current < target - self.epsilon {
                // Stopped at an event boundary.
                self.evaluate_events(target, metrics)?;
            }
        }

        // 4. Outputs.
        self.read_outputs()
    }

    fn evaluate_events(
        &mut self,
        target: f64,
        metrics: &mut CycleMetrics,
    ) -> Result<(), StepError> {
        metrics.event_evaluations += 1;
        self.model
            .evaluate_events()
            .map_err(|e| StepError::IntegrationFailure {
                reached: self.model.time(),
                target,
                reason: format!("event evaluation: {e}"),
            })
    }

    fn read_outputs(&self) -> Result<ExchangeSnapshot, StepError> {
        let mut outputs = ExchangeSnapshot::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let value = self
                .model
                .get_output(name)
                .map_err(|source| StepError::OutputUnavailable {
                    name: name.clone(),
                    source,
                })?;
            outputs.push(name.as_str(), value);
        }
        Ok(outputs)
    }

    /// Run one synchronization cycle: advance to the clock's next sync
    /// point, then move the sync point forward by one step.
    ///
    /// The clock advances even when the step fails, so the next cycle
    /// targets the next wall-clock-aligned point rather than retrying.
    pub fn sync_cycle(&mut self, inputs: &ExchangeSnapshot) -> Result<ExchangeSnapshot, StepError> {
        let target = self.clock.next_sync_point();
        let result = self.advance_to(target, inputs);
        self.clock.advance();
        result
    }

    /// The synchronization clock.
    pub fn clock(&self) -> &SyncClock {
        &self.clock
    }

    /// Input slots exchanged each cycle.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Output slots exchanged each cycle.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Metrics from the most recent `advance_to` call.
    pub fn last_metrics(&self) -> &CycleMetrics {
        &self.last_metrics
    }

    /// The owned model.
    pub fn model(&self) -> &dyn SimulationModel {
        self.model.as_ref()
    }

    /// Release the model.
    pub fn into_model(self) -> Box<dyn SimulationModel> {
        self.model
    }
}

impl std::fmt::Debug for SteppingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteppingEngine")
            .field("model", &self.model.name())
            .field("clock", &self.clock)
            .field("epsilon", &self.epsilon)
            .field("max_sub_steps", &self.max_sub_steps)
            .finish()
    }
}
