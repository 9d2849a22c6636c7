//! Closeness-to-ideal scores feeding the yield index.
//!
//! Each metric scores 100 at its ideal point and loses a fixed number of
//! points per unit of distance. The yield index is the weighted sum of the
//! three scores, clamped to `[0, 100]`.

use fieldpulse_types::metrics::{SCORE_MAX, SCORE_MIN};

/// Ideal air temperature in °C.
pub const IDEAL_TEMPERATURE_C: f64 = 22.0;

/// Ideal soil humidity in percent.
pub const IDEAL_HUMIDITY_PCT: f64 = 60.0;

/// Ideal soil pH.
pub const IDEAL_PH: f64 = 6.8;

/// Points lost per °C away from the ideal temperature.
const TEMPERATURE_SLOPE: f64 = 5.0;

/// Points lost per percentage point away from the ideal humidity.
const HUMIDITY_SLOPE: f64 = 2.0;

/// Points lost per pH unit away from the ideal pH.
const PH_SLOPE: f64 = 40.0;

/// Weight of the temperature score.
pub const TEMPERATURE_WEIGHT: f64 = 0.40;

/// Weight of the humidity score.
pub const HUMIDITY_WEIGHT: f64 = 0.35;

/// Weight of the pH score.
pub const PH_WEIGHT: f64 = 0.25;

/// Linear closeness score: 100 at `ideal`, minus `slope` per unit away.
///
/// Not clamped; the composite clamps once after weighting.
fn closeness(value: f64, ideal: f64, slope: f64) -> f64 {
    SCORE_MAX - (value - ideal).abs() * slope
}

/// Temperature closeness score.
pub fn temperature_score(celsius: f64) -> f64 {
    closeness(celsius, IDEAL_TEMPERATURE_C, TEMPERATURE_SLOPE)
}

/// Humidity closeness score.
pub fn humidity_score(percent: f64) -> f64 {
    closeness(percent, IDEAL_HUMIDITY_PCT, HUMIDITY_SLOPE)
}

/// pH closeness score.
pub fn ph_score(ph: f64) -> f64 {
    closeness(ph, IDEAL_PH, PH_SLOPE)
}

/// Weighted composite of the three closeness scores, clamped to `[0, 100]`.
pub fn yield_score(celsius: f64, humidity_pct: f64, ph: f64) -> f64 {
    let raw = temperature_score(celsius) * TEMPERATURE_WEIGHT
        + humidity_score(humidity_pct) * HUMIDITY_WEIGHT
        + ph_score(ph) * PH_WEIGHT;
    raw.clamp(SCORE_MIN, SCORE_MAX)
}
