//! Signal-strength to distance estimation.

/// Returned when a measurement cannot be turned into a distance.
pub const UNDETERMINABLE_DISTANCE: f64 = -1.0;

/// Estimate the distance to a peer in meters from its received signal
/// strength and the calibrated reference power it advertised.
///
/// This is an empirical calibration curve, not a physical model: the branch
/// constants and the final scale factor are part of the published contract,
/// and every downstream near/far decision depends on them staying exactly
/// as they are.
///
/// A signal strength of 0 means the measurement is unusable and yields
/// [`UNDETERMINABLE_DISTANCE`], not zero distance.
pub fn estimate_distance(signal_strength: i32, reference_power: i32) -> f64 {
    if signal_strength == 0 {
        return UNDETERMINABLE_DISTANCE;
    }

    let ratio = f64::from(signal_strength) / f64::from(reference_power);
    let result = if ratio < 1.0 {
        ratio.powf(10.0)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    };
    result * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_signal_is_undeterminable() {
        assert_eq!(estimate_distance(0, -59), UNDETERMINABLE_DISTANCE);
        assert_eq!(estimate_distance(0, 0), UNDETERMINABLE_DISTANCE);
        assert_eq!(estimate_distance(0, 127), UNDETERMINABLE_DISTANCE);
    }

    #[test]
    fn equal_signal_and_reference_takes_upper_branch() {
        // ratio == 1.0 must not fall into the ratio^10 branch
        let expected = (0.89976 + 0.111) * 100.0;
        assert!((estimate_distance(-59, -59) - expected).abs() < 1e-9);
    }

    #[test]
    fn weaker_signal_reads_farther() {
        // rssi below reference power (both negative): ratio > 1
        let near = estimate_distance(-60, -59);
        let far = estimate_distance(-80, -59);
        assert!(far > near);
        assert!(near > 0.0);
    }

    #[test]
    fn stronger_signal_takes_lower_branch() {
        // rssi -40 against reference -59: ratio ≈ 0.678, curve ≈ ratio^10
        let ratio: f64 = 40.0 / 59.0;
        let expected = ratio.powf(10.0) * 100.0;
        assert!((estimate_distance(-40, -59) - expected).abs() < 1e-9);
    }

    #[test]
    fn scale_factor_is_preserved() {
        // pin the x100 scale: ratio 2 ⇒ (0.89976 * 2^7.7095 + 0.111) * 100
        let expected = (0.89976 * 2.0_f64.powf(7.7095) + 0.111) * 100.0;
        assert!((estimate_distance(-118, -59) - expected).abs() < 1e-9);
    }
}
