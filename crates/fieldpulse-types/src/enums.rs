//! Enumeration types carried inside a telemetry snapshot.
//!
//! Serialized names match what the dashboard consumes: trends and pH
//! statuses are lowercase, humidity zones are single capital letters.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// pH below this value is classified as [`PhStatus::Acidic`].
pub const PH_ACIDIC_BELOW: f64 = 6.3;

/// pH above this value is classified as [`PhStatus::Alkaline`].
pub const PH_ALKALINE_ABOVE: f64 = 7.2;

/// Temperature change (in °C) beyond which a trend is reported.
pub const TREND_THRESHOLD_C: f64 = 0.5;

// ---------------------------------------------------------------------------
// Temperature trend
// ---------------------------------------------------------------------------

/// Direction of the temperature relative to the previous reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TemperatureTrend {
    /// Warmer than the previous reading by more than the threshold.
    Rising,
    /// Cooler than the previous reading by more than the threshold.
    Falling,
    /// Within the threshold of the previous reading (or no prior reading).
    #[default]
    Stable,
}

impl TemperatureTrend {
    /// Classify the change from `previous` to `current`.
    ///
    /// Without a previous reading the trend is [`TemperatureTrend::Stable`].
    pub fn between(previous: Option<f64>, current: f64) -> Self {
        let Some(previous) = previous else {
            return Self::Stable;
        };
        let delta = current - previous;
        if delta > TREND_THRESHOLD_C {
            Self::Rising
        } else if delta < -TREND_THRESHOLD_C {
            Self::Falling
        } else {
            Self::Stable
        }
    }
}

// ---------------------------------------------------------------------------
// Humidity zone
// ---------------------------------------------------------------------------

/// Garden irrigation zone a humidity reading is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum HumidityZone {
    /// Zone A.
    A,
    /// Zone B.
    B,
    /// Zone C.
    C,
}

impl HumidityZone {
    /// Every zone, in display order.
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];
}

// ---------------------------------------------------------------------------
// pH status
// ---------------------------------------------------------------------------

/// Soil acidity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum PhStatus {
    /// pH below [`PH_ACIDIC_BELOW`].
    Acidic,
    /// pH within the optimal band.
    Optimal,
    /// pH above [`PH_ALKALINE_ABOVE`].
    Alkaline,
}

impl PhStatus {
    /// Classify a pH value.
    pub fn classify(ph: f64) -> Self {
        if ph < PH_ACIDIC_BELOW {
            Self::Acidic
        } else if ph > PH_ALKALINE_ABOVE {
            Self::Alkaline
        } else {
            Self::Optimal
        }
    }
}
