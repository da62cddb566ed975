//! Variable layout of the substation test stand.
//!
//! Slot names double as store variable names. Output names with dots
//! mirror the component hierarchy of the test stand (`substation.hex` is
//! the substation's heat exchanger).

use twinsync_core::{Value, VariableDef, VariableKind};

/// Model reference served by [`SubstationProvider`](crate::SubstationProvider).
pub const MODEL_REF: &str = "teststand";

/// Secondary return temperature entering the exchanger (K).
pub const T_RETURN_SECONDARY_SET: &str = "T_return_secondary_set";
/// Primary supply temperature entering the exchanger (K).
pub const T_SUPPLY_PRIMARY_SET: &str = "T_supply_primary_set";
/// Imposed secondary return mass flow (kg/s); zero leaves the secondary
/// flow to the pump head.
pub const M_FLOW_RETURN_SECONDARY: &str = "m_flow_return_secondary";
/// Secondary pump head (Pa).
pub const DELTA_P_SECONDARY_SET: &str = "delta_p_secondary_set";
/// Differential pressure across the primary valve (Pa).
pub const DELTA_P_PRIMARY_SET: &str = "delta_p_primary_set";
/// Enables valve control of the secondary supply temperature.
pub const T_SUPPLY_SECONDARY_CTRL: &str = "T_supply_secondary_ctrl";

/// Secondary supply temperature (K).
pub const T_SUPPLY_SECONDARY: &str = "T_supply_secondary";
/// Primary return temperature (K).
pub const T_RETURN_PRIMARY: &str = "T_return_primary";
/// Primary return mass flow (kg/s).
pub const M_FLOW_RETURN_PRIMARY: &str = "m_flow_return_primary";
/// Primary mass flow through the substation (kg/s).
pub const SUBSTATION_M1_FLOW: &str = "substation.m1_flow";
/// Secondary mass flow through the substation (kg/s).
pub const SUBSTATION_M2_FLOW: &str = "substation.m2_flow";
/// Heat flow into the secondary side (W).
pub const SUBSTATION_HEX_Q2_FLOW: &str = "substation.hex.Q2_flow";

/// Output slots, in publication order.
pub const OUTPUTS: [&str; 6] = [
    T_SUPPLY_SECONDARY,
    T_RETURN_PRIMARY,
    M_FLOW_RETURN_PRIMARY,
    SUBSTATION_M1_FLOW,
    SUBSTATION_M2_FLOW,
    SUBSTATION_HEX_Q2_FLOW,
];

/// Store layout: six writable inputs with their defaults, then six
/// read-only outputs initialized to zero.
pub fn layout() -> Vec<VariableDef> {
    let mut defs = vec![
        VariableDef::input(T_RETURN_SECONDARY_SET, Value::Real(323.15)).with_units("K"),
        VariableDef::input(T_SUPPLY_PRIMARY_SET, Value::Real(353.15)).with_units("K"),
        VariableDef::input(M_FLOW_RETURN_SECONDARY, Value::Real(0.0)).with_units("kg/s"),
        VariableDef::input(DELTA_P_SECONDARY_SET, Value::Real(200_000.0)).with_units("Pa"),
        VariableDef::input(DELTA_P_PRIMARY_SET, Value::Real(0.0)).with_units("Pa"),
        VariableDef::input(T_SUPPLY_SECONDARY_CTRL, Value::Boolean(false)),
    ];
    let units = ["K", "K", "kg/s", "kg/s", "kg/s", "W"];
    defs.extend(
        OUTPUTS
            .iter()
            .zip(units)
            .map(|(name, unit)| VariableDef::output(*name, VariableKind::Real).with_units(unit)),
    );
    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_inputs_then_six_outputs() {
        let defs = layout();
        assert_eq!(defs.len(), 12);
        assert!(defs[..6].iter().all(|d| d.writable));
        assert!(defs[6..].iter().all(|d| !d.writable));
        assert!(defs[6..].iter().all(|d| d.initial == Value::Real(0.0)));
    }

    #[test]
    fn control_flag_is_boolean() {
        let ctrl = layout()
            .into_iter()
            .find(|d| d.name == T_SUPPLY_SECONDARY_CTRL)
            .unwrap();
        assert_eq!(ctrl.kind, VariableKind::Boolean);
        assert_eq!(ctrl.initial, Value::Boolean(false));
    }
}
