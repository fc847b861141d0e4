//! Small shared DSP and real-time helpers.

pub mod buffer;

use std::f32::consts::FRAC_PI_2;

// -------------------------------------------------------------------------------------------------

/// Equal power crossfade gains for the given crossfade progress in range `0.0..=1.0`.
///
/// Returns `(gain_a, gain_b)`, where `gain_a` fades the outgoing and `gain_b` the incoming
/// source. The squared gains always sum up to 1.
#[inline]
pub fn equal_power_gains(progress: f32) -> (f32, f32) {
    let angle = progress * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

// -------------------------------------------------------------------------------------------------

/// Stereo panning gains for a normalized pan position in range `0.0..=1.0` (0.5 = center),
/// using the equal power pan law.
///
/// `strength` blends the resulting gains towards unity gain (no panning): a strength of 0
/// returns `(1.0, 1.0)`, a strength of 1 the plain equal power pan gains.
#[inline]
pub fn panning_gains(pan: f32, strength: f32) -> (f32, f32) {
    let (pan_l, pan_r) = equal_power_gains(pan);
    (
        1.0 - strength * (1.0 - pan_l),
        1.0 - strength * (1.0 - pan_r),
    )
}

// -------------------------------------------------------------------------------------------------

/// Linearly remap `value` from range `min..=max` into `0.0..=1.0`, clamping the result.
/// Degenerated ranges (`min == max`) map to the center 0.5.
#[inline]
pub fn normalize_clamped(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() <= f64::EPSILON || !range.is_finite() {
        return 0.5;
    }
    ((value - min) / range).clamp(0.0, 1.0)
}

// -------------------------------------------------------------------------------------------------

/// Run the given function in a scope which is not allowed to allocate, when the
/// `assert-allocs` feature is enabled.
#[cfg_attr(not(feature = "cpal-output"), allow(dead_code))]
#[inline]
pub(crate) fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
    #[cfg(feature = "assert-allocs")]
    return assert_no_alloc::assert_no_alloc::<T, F>(func);

    #[cfg(not(feature = "assert-allocs"))]
    return func();
}

/// Run the given function in a scope which explicitly is allowed to allocate, even when
/// running within an [`assert_no_alloc`] scope.
#[inline]
pub(crate) fn permit_alloc<T, F: FnOnce() -> T>(func: F) -> T {
    #[cfg(feature = "assert-allocs")]
    return assert_no_alloc::permit_alloc::<T, F>(func);

    #[cfg(not(feature = "assert-allocs"))]
    return func();
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_power_crossfade() {
        for step in 0..=100 {
            let progress = step as f32 / 100.0;
            let (gain_a, gain_b) = equal_power_gains(progress);
            assert!((gain_a * gain_a + gain_b * gain_b - 1.0).abs() < 1e-5);
        }
        let (gain_a, gain_b) = equal_power_gains(0.0);
        assert!((gain_a - 1.0).abs() < 1e-6 && gain_b.abs() < 1e-6);
        let (gain_a, gain_b) = equal_power_gains(1.0);
        assert!(gain_a.abs() < 1e-6 && (gain_b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn panning_strength() {
        assert_eq!(panning_gains(0.0, 0.0), (1.0, 1.0));
        assert_eq!(panning_gains(1.0, 0.0), (1.0, 1.0));

        let (l, r) = panning_gains(0.0, 1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);

        let (l, r) = panning_gains(1.0, 0.5);
        assert!((l - 0.5).abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_clamped(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize_clamped(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize_clamped(15.0, 0.0, 10.0), 1.0);
        assert_eq!(normalize_clamped(3.0, 3.0, 3.0), 0.5);
    }
}
