//! Synchronization configuration, validation, and error types.
//!
//! [`SyncConfig`] is the input for constructing a [`SteppingEngine`](crate::SteppingEngine)
//! and a [`SyncDriver`](crate::SyncDriver). [`validate()`](SyncConfig::validate)
//! checks structural invariants at startup; both constructors call it.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Polling never gets coarser than this, whatever the step size.
const MAX_POLL_INTERVAL_SECS: f64 = 1.0;

// ── SyncConfig ─────────────────────────────────────────────────────

/// Configuration of the real-time synchronization loop.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// Wall-clock period and simulated interval per cycle, in seconds.
    /// Default: 10.0.
    pub step_size: f64,
    /// Tolerance when comparing reached time with the synchronization
    /// point. Default: 1e-4.
    pub epsilon: f64,
    /// Maximum `integrate` calls per cycle before the cycle fails with
    /// an integration failure. Default: 10 000.
    pub max_sub_steps: u32,
    /// Bounded wait on the variable store mutex, in milliseconds.
    /// Default: 100.
    pub store_lock_timeout_ms: u64,
    /// Timer polling interval in seconds. `None` uses the ceiling
    /// `min(1.0, 0.5 * step_size)`; larger values are clamped to it.
    pub poll_interval: Option<f64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            step_size: 10.0,
            epsilon: 1e-4,
            max_sub_steps: 10_000,
            store_lock_timeout_ms: 100,
            poll_interval: None,
        }
    }
}

impl SyncConfig {
    /// Default configuration with the given step size.
    pub fn with_step_size(step_size: f64) -> Self {
        Self {
            step_size,
            ..Self::default()
        }
    }

    /// Check all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The period must be representable and at least one nanosecond.
        if !Duration::try_from_secs_f64(self.step_size).is_ok_and(|d| !d.is_zero()) {
            return Err(ConfigError::InvalidStepSize {
                value: self.step_size,
            });
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 || self.epsilon >= self.step_size {
            return Err(ConfigError::InvalidEpsilon {
                value: self.epsilon,
            });
        }
        if self.max_sub_steps == 0 {
            return Err(ConfigError::ZeroSubStepLimit);
        }
        if let Some(p) = self.poll_interval {
            if !p.is_finite() || p <= 0.0 {
                return Err(ConfigError::InvalidPollInterval { value: p });
            }
        }
        if self.resolved_poll_interval().is_zero() {
            return Err(ConfigError::InvalidPollInterval {
                value: self.poll_interval_secs(),
            });
        }
        Ok(())
    }

    /// The wall-clock period between timer firings.
    ///
    /// Zero if `step_size` is not a valid duration; [`validate`](Self::validate)
    /// rejects such configurations.
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.step_size).unwrap_or(Duration::ZERO)
    }

    /// The effective polling interval: the configured value, clamped to
    /// `min(1.0, 0.5 * step_size)` seconds.
    ///
    /// Zero if the result rounds below one nanosecond;
    /// [`validate`](Self::validate) rejects such configurations.
    pub fn resolved_poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs()).unwrap_or(Duration::ZERO)
    }

    fn poll_interval_secs(&self) -> f64 {
        let ceiling = MAX_POLL_INTERVAL_SECS.min(0.5 * self.step_size);
        self.poll_interval.map_or(ceiling, |p| p.min(ceiling))
    }

    /// Bounded wait on the store mutex.
    pub fn store_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.store_lock_timeout_ms)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating configuration or wiring the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `step_size` is not positive, or is not representable as a
    /// wall-clock period of at least one nanosecond.
    InvalidStepSize {
        /// The invalid value.
        value: f64,
    },
    /// `epsilon` is negative, non-finite, or not smaller than the step.
    InvalidEpsilon {
        /// The invalid value.
        value: f64,
    },
    /// `max_sub_steps` is zero.
    ZeroSubStepLimit,
    /// `poll_interval` is not positive, or the resolved polling interval
    /// is below one nanosecond.
    InvalidPollInterval {
        /// The invalid value.
        value: f64,
    },
    /// The engine declares an input the store does not hold as writable.
    InputNotInStore {
        /// The input name.
        name: String,
    },
    /// The engine declares an output the store does not hold as read-only.
    OutputNotInStore {
        /// The output name.
        name: String,
    },
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStepSize { value } => write!(
                f,
                "step_size must be a positive duration of at least 1ns, got {value}"
            ),
            Self::InvalidEpsilon { value } => write!(
                f,
                "epsilon must be finite, non-negative and below step_size, got {value}"
            ),
            Self::ZeroSubStepLimit => write!(f, "max_sub_steps must be at least 1"),
            Self::InvalidPollInterval { value } => write!(
                f,
                "poll_interval must be a positive duration of at least 1ns, got {value}"
            ),
            Self::InputNotInStore { name } => {
                write!(f, "input '{name}' is not a writable store variable")
            }
            Self::OutputNotInStore { name } => {
                write!(f, "output '{name}' is not a read-only store variable")
            }
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}
