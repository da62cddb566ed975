//! [`SubstationModel`]: lumped district-heating substation.
//!
//! A counter-flow heat exchanger couples the primary (district) side to
//! the secondary (building) side. The secondary supply temperature follows
//! the exchanger's steady outlet temperature with a first-order lag.
//! Primary flow passes a valve: fully open, or driven by a PI controller
//! on the secondary supply temperature when `T_supply_secondary_ctrl` is
//! set.
//!
//! # Events
//!
//! The valve has three modes: closed, modulating, and open. While
//! integrating, a change of mode stops integration at the crossing and the
//! new mode takes effect on the next
//! [`evaluate_events`](SimulationModel::evaluate_events). Crossings are
//! located on the controller output by regula falsi (Illinois) over the internal
//! step. Leaving a saturated mode takes a controller output
//! [`MODE_HYSTERESIS`] inside the modulating range, so two mode changes are
//! always separated by a finite stretch of time.
//!
//! Saturation is handled by back-calculation: while the controller output
//! lies outside `[0, 1]` the integral term is pulled towards the saturated
//! opening with time constant `tracking_time`. The dynamics do not depend
//! on the mode, so a setpoint out of reach leaves the valve open with a
//! bounded integral term.

use tracing::trace;
use twinsync_core::{ModelError, SimulationModel, Value};

use crate::hex::{operating_point, HexOperatingPoint};
use crate::params::SubstationParams;
use crate::teststand::*;

/// Controller output margin needed to leave a saturated mode.
pub const MODE_HYSTERESIS: f64 = 1e-3;

/// Controller output tolerance when locating a crossing.
const CROSSING_TOLERANCE: f64 = 1e-9;

const CROSSING_ITERATIONS: usize = 30;

/// Valve operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValveMode {
    /// Controller output at or below zero, until it rises above
    /// [`MODE_HYSTERESIS`].
    Closed,
    /// Controller output between the saturation boundaries.
    Modulating,
    /// Controller output at or above one, until it falls below
    /// `1 - MODE_HYSTERESIS`; also whenever control is disabled.
    Open,
}

impl ValveMode {
    fn from_output(raw: f64, current: ValveMode) -> Self {
        match current {
            Self::Open if raw >= 1.0 - MODE_HYSTERESIS => Self::Open,
            Self::Closed if raw <= MODE_HYSTERESIS => Self::Closed,
            _ if raw >= 1.0 => Self::Open,
            _ if raw <= 0.0 => Self::Closed,
            _ => Self::Modulating,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Inputs {
    t_return_secondary: f64,
    t_supply_primary: f64,
    m_flow_secondary: f64,
    dp_secondary: f64,
    dp_primary: f64,
    supply_ctrl: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            t_return_secondary: 323.15,
            t_supply_primary: 353.15,
            m_flow_secondary: 0.0,
            dp_secondary: 200_000.0,
            dp_primary: 0.0,
            supply_ctrl: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct State {
    t_supply: f64,
    integral: f64,
}

impl State {
    /// `self + h * d`
    fn axpy(self, h: f64, d: State) -> State {
        State {
            t_supply: self.t_supply + h * d.t_supply,
            integral: self.integral + h * d.integral,
        }
    }

    fn is_finite(&self) -> bool {
        self.t_supply.is_finite() && self.integral.is_finite()
    }
}

struct Flows {
    m1: f64,
    m2: f64,
    hex: HexOperatingPoint,
}

/// District-heating substation with an optional supply temperature
/// controller.
#[derive(Debug)]
pub struct SubstationModel {
    name: String,
    params: SubstationParams,
    inputs: Inputs,
    state: State,
    time: f64,
    mode: ValveMode,
    pending_mode: Option<ValveMode>,
    events: u64,
    initialized: bool,
}

impl SubstationModel {
    /// A model with the given parameters, not yet initialized.
    pub fn new(name: impl Into<String>, params: SubstationParams) -> Result<Self, ModelError> {
        params.validate()?;
        let inputs = Inputs::default();
        Ok(Self {
            name: name.into(),
            params,
            inputs,
            state: State {
                t_supply: inputs.t_return_secondary,
                integral: 0.0,
            },
            time: 0.0,
            mode: ValveMode::Open,
            pending_mode: None,
            events: 0,
            initialized: false,
        })
    }

    /// Current valve mode.
    pub fn valve_mode(&self) -> ValveMode {
        self.mode
    }

    /// Current valve opening in `[0, 1]`.
    pub fn valve_opening(&self) -> f64 {
        self.opening(&self.state)
    }

    /// Valve mode changes detected during integration so far.
    pub fn event_count(&self) -> u64 {
        self.events
    }

    /// The model parameters.
    pub fn params(&self) -> &SubstationParams {
        &self.params
    }

    fn controller_output(&self, s: &State) -> f64 {
        let error = self.params.supply_setpoint - s.t_supply;
        self.params.kp * error + self.params.ki * s.integral
    }

    fn opening(&self, s: &State) -> f64 {
        if self.inputs.supply_ctrl {
            self.controller_output(s).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn flows(&self, s: &State) -> Flows {
        let p = &self.params;
        let m1 = p.kv_primary * self.opening(s) * self.inputs.dp_primary.max(0.0).sqrt();
        let m2 = if self.inputs.m_flow_secondary > 0.0 {
            self.inputs.m_flow_secondary
        } else {
            p.kv_secondary * self.inputs.dp_secondary.max(0.0).sqrt()
        };
        let hex = operating_point(
            p.ua,
            self.inputs.t_supply_primary,
            m1 * p.cp,
            self.inputs.t_return_secondary,
            m2 * p.cp,
        );
        Flows { m1, m2, hex }
    }

    fn derivative(&self, s: &State) -> State {
        let p = &self.params;
        let flows = self.flows(s);
        let integral = if self.inputs.supply_ctrl && p.ki > 0.0 {
            let raw = self.controller_output(s);
            let error = p.supply_setpoint - s.t_supply;
            error + (raw.clamp(0.0, 1.0) - raw) / (p.ki * p.tracking_time)
        } else {
            0.0
        };
        State {
            t_supply: (flows.hex.cold_outlet - s.t_supply) / p.tau,
            integral,
        }
    }

    fn rk4(&self, s: State, h: f64) -> State {
        let k1 = self.derivative(&s);
        let k2 = self.derivative(&s.axpy(0.5 * h, k1));
        let k3 = self.derivative(&s.axpy(0.5 * h, k2));
        let k4 = self.derivative(&s.axpy(h, k3));
        let weighted = |a: f64, b: f64, c: f64, d: f64| a + 2.0 * b + 2.0 * c + d;
        State {
            t_supply: s.t_supply
                + h / 6.0 * weighted(k1.t_supply, k2.t_supply, k3.t_supply, k4.t_supply),
            integral: s.integral
                + h / 6.0 * weighted(k1.integral, k2.integral, k3.integral, k4.integral),
        }
    }

    /// Mode on the far side of the boundary crossed when leaving
    /// `self.mode` towards `towards`, and that boundary's controller output.
    fn crossing(&self, towards: ValveMode) -> (ValveMode, f64) {
        match (self.mode, towards) {
            (ValveMode::Modulating, ValveMode::Open) => (ValveMode::Open, 1.0),
            (ValveMode::Modulating, _) => (ValveMode::Closed, 0.0),
            (ValveMode::Open, _) => (ValveMode::Modulating, 1.0 - MODE_HYSTERESIS),
            (ValveMode::Closed, _) => (ValveMode::Modulating, MODE_HYSTERESIS),
        }
    }

    /// Find where the controller output crosses `boundary` within a step of
    /// length `h` from the current state. `next` is the full-step state.
    ///
    /// Returns the offset into the step and the state there.
    fn locate_crossing(&self, h: f64, boundary: f64, next: State) -> (f64, State) {
        let (mut lo, mut hi) = (0.0, h);
        let mut r_lo = self.controller_output(&self.state) - boundary;
        let mut r_hi = self.controller_output(&next) - boundary;
        let mut found = (h, next);
        for _ in 0..CROSSING_ITERATIONS {
            let dt = if r_hi != r_lo {
                (lo - r_lo * (hi - lo) / (r_hi - r_lo)).clamp(lo, hi)
            } else {
                hi
            };
            let s = self.rk4(self.state, dt);
            let r = self.controller_output(&s) - boundary;
            found = (dt, s);
            if r.abs() < CROSSING_TOLERANCE || hi - lo <= f64::EPSILON * h {
                break;
            }
            // Illinois variant: halve the stale endpoint's residual.
            if (r < 0.0) == (r_lo < 0.0) {
                lo = dt;
                r_lo = r;
                r_hi *= 0.5;
            } else {
                hi = dt;
                r_hi = r;
                r_lo *= 0.5;
            }
        }
        found
    }

    fn check_real(name: &str, value: Value, min: f64, inclusive: bool) -> Result<f64, ModelError> {
        let v = value.as_real().ok_or_else(|| ModelError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected real, got {}", value.kind()),
        })?;
        let in_range = if inclusive { v >= min } else { v > min };
        if !v.is_finite() || !in_range {
            return Err(ModelError::InvalidValue {
                name: name.to_string(),
                reason: format!("{v} out of range"),
            });
        }
        Ok(v)
    }
}

impl SimulationModel for SubstationModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_input(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
        match name {
            T_RETURN_SECONDARY_SET => {
                self.inputs.t_return_secondary = Self::check_real(name, value, 0.0, false)?
            }
            T_SUPPLY_PRIMARY_SET => {
                self.inputs.t_supply_primary = Self::check_real(name, value, 0.0, false)?
            }
            M_FLOW_RETURN_SECONDARY => {
                self.inputs.m_flow_secondary = Self::check_real(name, value, 0.0, true)?
            }
            DELTA_P_SECONDARY_SET => {
                self.inputs.dp_secondary = Self::check_real(name, value, 0.0, true)?
            }
            DELTA_P_PRIMARY_SET => {
                self.inputs.dp_primary = Self::check_real(name, value, 0.0, true)?
            }
            T_SUPPLY_SECONDARY_CTRL => {
                self.inputs.supply_ctrl =
                    value.as_bool().ok_or_else(|| ModelError::InvalidValue {
                        name: name.to_string(),
                        reason: format!("expected boolean, got {}", value.kind()),
                    })?
            }
            _ => {
                return Err(ModelError::UnknownSlot {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), ModelError> {
        self.time = 0.0;
        self.state = State {
            t_supply: self.inputs.t_return_secondary,
            integral: 0.0,
        };
        self.pending_mode = None;
        self.mode = if self.inputs.supply_ctrl {
            ValveMode::from_output(self.controller_output(&self.state), ValveMode::Modulating)
        } else {
            ValveMode::Open
        };
        self.initialized = true;
        Ok(())
    }

    fn evaluate_events(&mut self) -> Result<(), ModelError> {
        let pending = self.pending_mode.take();
        let mode = if self.inputs.supply_ctrl {
            pending.unwrap_or_else(|| {
                ValveMode::from_output(self.controller_output(&self.state), self.mode)
            })
        } else {
            ValveMode::Open
        };
        if mode != self.mode {
            trace!(from = ?self.mode, to = ?mode, time = self.time, "valve mode change");
        }
        self.mode = mode;
        Ok(())
    }

    fn integrate(&mut self, target_time: f64) -> Result<f64, ModelError> {
        if !self.initialized {
            return Err(ModelError::Failed {
                reason: "integrate called before initialize".to_string(),
            });
        }
        if !target_time.is_finite() {
            return Err(ModelError::SolverFailed {
                reason: format!("non-finite target time {target_time}"),
            });
        }

        while self.time < target_time {
            let remaining = target_time - self.time;
            let last = remaining <= self.params.internal_step;
            let h = if last { remaining } else { self.params.internal_step };

            let next = self.rk4(self.state, h);
            if !next.is_finite() {
                return Err(ModelError::SolverFailed {
                    reason: format!("state diverged at t = {}", self.time),
                });
            }

            if self.inputs.supply_ctrl {
                let towards = ValveMode::from_output(self.controller_output(&next), self.mode);
                if towards != self.mode {
                    let (entered, boundary) = self.crossing(towards);
                    let (dt, at) = self.locate_crossing(h, boundary, next);
                    if dt > 0.0 {
                        self.state = at;
                        self.time += dt;
                        self.pending_mode = Some(entered);
                        self.events += 1;
                        return Ok(self.time);
                    }
                    // Already on the boundary: switch without stopping.
                    self.mode = entered;
                    continue;
                }
            }

            self.state = next;
            self.time = if last { target_time } else { self.time + h };
        }
        Ok(self.time)
    }

    fn get_output(&self, name: &str) -> Result<Value, ModelError> {
        let flows = self.flows(&self.state);
        let v = match name {
            T_SUPPLY_SECONDARY => self.state.t_supply,
            T_RETURN_PRIMARY => flows.hex.hot_outlet,
            M_FLOW_RETURN_PRIMARY | SUBSTATION_M1_FLOW => flows.m1,
            SUBSTATION_M2_FLOW => flows.m2,
            SUBSTATION_HEX_Q2_FLOW => flows.hex.q_flow,
            _ => {
                return Err(ModelError::UnknownSlot {
                    name: name.to_string(),
                })
            }
        };
        Ok(Value::Real(v))
    }

    fn time(&self) -> f64 {
        self.time
    }
}
