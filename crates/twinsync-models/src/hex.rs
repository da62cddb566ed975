//! Counter-flow heat exchanger, effectiveness-NTU method.

/// Steady-state heat exchanger operating point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HexOperatingPoint {
    /// Heat flow from the hot (primary) to the cold (secondary) side, in W.
    pub q_flow: f64,
    /// Hot-side outlet temperature, in K.
    pub hot_outlet: f64,
    /// Cold-side outlet temperature, in K.
    pub cold_outlet: f64,
}

/// Counter-flow effectiveness for `ntu` and capacity ratio `c_r`
/// (`c_min / c_max`, in `[0, 1]`).
pub fn counter_flow_effectiveness(ntu: f64, c_r: f64) -> f64 {
    if ntu <= 0.0 {
        return 0.0;
    }
    if (1.0 - c_r).abs() < 1e-9 {
        return ntu / (1.0 + ntu);
    }
    let e = (-ntu * (1.0 - c_r)).exp();
    (1.0 - e) / (1.0 - c_r * e)
}

/// Operating point for hot inlet `t_hot_in` with capacity flow `c_hot`
/// (W/K) and cold inlet `t_cold_in` with capacity flow `c_cold`.
///
/// A side with zero flow carries no heat; its outlet equals its inlet.
pub fn operating_point(
    ua: f64,
    t_hot_in: f64,
    c_hot: f64,
    t_cold_in: f64,
    c_cold: f64,
) -> HexOperatingPoint {
    let c_min = c_hot.min(c_cold);
    let c_max = c_hot.max(c_cold);
    if c_min <= 0.0 {
        return HexOperatingPoint {
            q_flow: 0.0,
            hot_outlet: t_hot_in,
            cold_outlet: t_cold_in,
        };
    }
    let eps = counter_flow_effectiveness(ua / c_min, c_min / c_max);
    let q_flow = eps * c_min * (t_hot_in - t_cold_in);
    HexOperatingPoint {
        q_flow,
        hot_outlet: t_hot_in - q_flow / c_hot,
        cold_outlet: t_cold_in + q_flow / c_cold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn balanced_exchanger() {
        assert!((counter_flow_effectiveness(1.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_flow_side_transfers_nothing() {
        let op = operating_point(5000.0, 353.15, 0.0, 323.15, 4186.0);
        assert_eq!(op.q_flow, 0.0);
        assert_eq!(op.hot_outlet, 353.15);
        assert_eq!(op.cold_outlet, 323.15);
    }

    #[test]
    fn heat_flows_hot_to_cold() {
        let op = operating_point(5000.0, 353.15, 4186.0, 323.15, 2.0 * 4186.0);
        assert!(op.q_flow > 0.0);
        assert!(op.hot_outlet < 353.15 && op.hot_outlet > 323.15);
        assert!(op.cold_outlet > 323.15 && op.cold_outlet < 353.15);
    }

    proptest! {
        #[test]
        fn effectiveness_is_a_fraction(ntu in 0.0f64..50.0, c_r in 0.0f64..=1.0) {
            let eps = counter_flow_effectiveness(ntu, c_r);
            prop_assert!((0.0..=1.0).contains(&eps));
        }

        #[test]
        fn energy_balances(
            c_hot in 1.0f64..50_000.0,
            c_cold in 1.0f64..50_000.0,
            t_hot in 320.0f64..400.0,
            t_cold in 280.0f64..320.0,
        ) {
            let op = operating_point(5000.0, t_hot, c_hot, t_cold, c_cold);
            let released = c_hot * (t_hot - op.hot_outlet);
            let absorbed = c_cold * (op.cold_outlet - t_cold);
            prop_assert!((released - absorbed).abs() <= 1e-6 * released.abs().max(1.0));
            prop_assert!(op.hot_outlet >= t_cold - 1e-9);
            prop_assert!(op.cold_outlet <= t_hot + 1e-9);
        }
    }
}
