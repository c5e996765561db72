/// Projection horizon for every target price
pub const PROJECTION_YEARS: i32 = 5;

/// Growth rates are clamped to +/- this many percent before compounding
pub const MAX_GROWTH_RATE: f64 = 50.0;

/// Compound `base` forward `years` at `rate_percent` (clamped to [-50, 50]).
///
/// A non-positive or non-finite base, or a non-finite rate, yields 0.0 which
/// downstream code reads as "no usable projection".
pub fn project_future_value(base: f64, rate_percent: f64, years: i32) -> f64 {
    if !base.is_finite() || !rate_percent.is_finite() || base <= 0.0 {
        return 0.0;
    }
    let rate = rate_percent.clamp(-MAX_GROWTH_RATE, MAX_GROWTH_RATE);
    base * (1.0 + rate / 100.0).powi(years)
}
