//! Physical and control parameters of the substation model.

use twinsync_core::ModelError;

/// Parameters of [`SubstationModel`](crate::SubstationModel).
#[derive(Clone, Debug, PartialEq)]
pub struct SubstationParams {
    /// Heat exchanger conductance, in W/K. Default: 5000.
    pub ua: f64,
    /// Specific heat capacity of water, in J/(kg K). Default: 4186.
    pub cp: f64,
    /// Time constant of the secondary supply temperature, in s. Default: 60.
    pub tau: f64,
    /// Primary valve flow coefficient at full opening, in kg/(s sqrt(Pa)).
    /// Default: 5e-3.
    pub kv_primary: f64,
    /// Secondary pump flow coefficient, used when no secondary return flow
    /// is imposed. Default: 5e-3.
    pub kv_secondary: f64,
    /// Secondary supply temperature setpoint under valve control, in K.
    /// Default: 343.15.
    pub supply_setpoint: f64,
    /// Proportional gain of the valve controller, per K. Default: 0.05.
    pub kp: f64,
    /// Integral gain of the valve controller, per K s. Default: 0.002.
    pub ki: f64,
    /// Back-calculation time constant pulling the integral term towards
    /// the saturated valve opening, in s. Default: 30.
    pub tracking_time: f64,
    /// Fixed internal RK4 step, in s. Default: 0.1.
    pub internal_step: f64,
}

impl Default for SubstationParams {
    fn default() -> Self {
        Self {
            ua: 5000.0,
            cp: 4186.0,
            tau: 60.0,
            kv_primary: 5e-3,
            kv_secondary: 5e-3,
            supply_setpoint: 343.15,
            kp: 0.05,
            ki: 0.002,
            tracking_time: 30.0,
            internal_step: 0.1,
        }
    }
}

impl SubstationParams {
    /// Check that every parameter is finite and in range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("ua", self.ua),
            ("cp", self.cp),
            ("tau", self.tau),
            ("supply_setpoint", self.supply_setpoint),
            ("tracking_time", self.tracking_time),
            ("internal_step", self.internal_step),
        ];
        let non_negative = [
            ("kv_primary", self.kv_primary),
            ("kv_secondary", self.kv_secondary),
            ("kp", self.kp),
            ("ki", self.ki),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(invalid(name, v, "must be finite and positive"));
            }
        }
        for (name, v) in non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(name, v, "must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

fn invalid(name: &str, value: f64, rule: &str) -> ModelError {
    ModelError::InvalidValue {
        name: name.to_string(),
        reason: format!("{value} {rule}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SubstationParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_time_constant() {
        let p = SubstationParams {
            tau: 0.0,
            ..SubstationParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ModelError::InvalidValue { ref name, .. }) if name == "tau"
        ));
    }
}
