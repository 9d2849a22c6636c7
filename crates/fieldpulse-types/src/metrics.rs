//! Metric sub-records of a telemetry [`Snapshot`](crate::Snapshot).
//!
//! Each record is a plain value type. Derived fields (humidity alert, pH
//! status, equivalent trees) are computed by the constructors here so a
//! record can never carry a derived value that disagrees with its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{HumidityZone, PhStatus, TemperatureTrend};

/// Maximum number of temperature history entries (48h at 30-min cadence).
pub const TEMPERATURE_HISTORY_CAP: usize = 96;

/// Humidity below this percentage raises an alert.
pub const HUMIDITY_ALERT_BELOW: f64 = 30.0;

/// Humidity above this percentage raises an alert.
pub const HUMIDITY_ALERT_ABOVE: f64 = 80.0;

/// Lower bound for soil pH.
pub const PH_MIN: f64 = 5.5;

/// Upper bound for soil pH.
pub const PH_MAX: f64 = 8.0;

/// Lower bound for 0-100 scores (yield, forecast, cost index).
pub const SCORE_MIN: f64 = 0.0;

/// Upper bound for 0-100 scores (yield, forecast, cost index).
pub const SCORE_MAX: f64 = 100.0;

/// Kilograms of CO2 absorbed per tree, used for the tree equivalence.
pub const CO2_KG_PER_TREE: f64 = 20.0;

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

/// A single timestamped temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TemperatureReading {
    /// When the reading was generated.
    pub time: DateTime<Utc>,
    /// Temperature in °C.
    pub value: f64,
}

/// Air temperature with its optimal band, trend and sliding history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Temperature {
    /// Current temperature in °C.
    pub current: f64,
    /// Optimal growing band `(low, high)` in °C.
    pub optimal: (f64, f64),
    /// Direction relative to the previous reading.
    pub trend: TemperatureTrend,
    /// Oldest-first readings, at most [`TEMPERATURE_HISTORY_CAP`] entries.
    pub history: Vec<TemperatureReading>,
}

impl Temperature {
    /// Most recent reading in the history, if any.
    pub fn last_reading(&self) -> Option<&TemperatureReading> {
        self.history.last()
    }
}

/// Append `reading` to `history`, evicting the oldest entries beyond `cap`.
///
/// Eviction is strictly FIFO: the front of the vector is the oldest entry.
pub fn push_history(history: &mut Vec<TemperatureReading>, reading: TemperatureReading, cap: usize) {
    history.push(reading);
    if history.len() > cap {
        let excess = history.len().saturating_sub(cap);
        history.drain(..excess);
    }
}

// ---------------------------------------------------------------------------
// Soil humidity
// ---------------------------------------------------------------------------

/// Soil humidity reading for one irrigation zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SoilHumidity {
    /// Humidity in percent.
    pub current: f64,
    /// Zone the reading is attributed to.
    pub zone: HumidityZone,
    /// Whether the reading is outside the safe band.
    pub alert: bool,
}

impl SoilHumidity {
    /// Build a reading, deriving the alert flag from `current`.
    pub fn from_reading(current: f64, zone: HumidityZone) -> Self {
        Self {
            current,
            zone,
            alert: humidity_alert(current),
        }
    }
}

/// Whether a humidity percentage is outside the `[30, 80]` safe band.
pub fn humidity_alert(current: f64) -> bool {
    current < HUMIDITY_ALERT_BELOW || current > HUMIDITY_ALERT_ABOVE
}

// ---------------------------------------------------------------------------
// Soil pH
// ---------------------------------------------------------------------------

/// Soil pH with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SoilPh {
    /// pH value in `[5.5, 8.0]`.
    pub current: f64,
    /// Classification of `current`.
    pub status: PhStatus,
}

impl SoilPh {
    /// Build a reading, clamping to the valid range and classifying it.
    pub fn from_reading(current: f64) -> Self {
        let current = current.clamp(PH_MIN, PH_MAX);
        Self {
            current,
            status: PhStatus::classify(current),
        }
    }
}

// ---------------------------------------------------------------------------
// Yield index
// ---------------------------------------------------------------------------

/// Composite growing-conditions score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct YieldIndex {
    /// Current score in `[0, 100]`.
    pub current: f64,
    /// Forecast score in `[0, 100]`.
    pub forecast: f64,
    /// Signed percent change against the previous score.
    pub comparison_last_month: f64,
}

// ---------------------------------------------------------------------------
// Water recycled
// ---------------------------------------------------------------------------

/// Cumulative recycled water counters, in liters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WaterRecycled {
    /// Liters since local midnight.
    pub today: f64,
    /// Liters accumulated this month.
    pub this_month: f64,
    /// Percent saved versus traditional irrigation.
    pub saved_vs_traditional: f64,
}

// ---------------------------------------------------------------------------
// CO2 saved
// ---------------------------------------------------------------------------

/// Cumulative CO2 savings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Co2Saved {
    /// Total kilograms saved; never decreases.
    pub total_kg: f64,
    /// `total_kg / 20`, rounded.
    pub equivalent_trees: u32,
    /// Kilograms accumulated this week.
    pub this_week: f64,
}

impl Co2Saved {
    /// Build the record, deriving the tree equivalence from `total_kg`.
    pub fn from_totals(total_kg: f64, this_week: f64) -> Self {
        Self {
            total_kg,
            equivalent_trees: equivalent_trees(total_kg),
            this_week,
        }
    }
}

/// Number of trees absorbing `total_kg` of CO2, rounded to the nearest tree.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn equivalent_trees(total_kg: f64) -> u32 {
    let trees = (total_kg / CO2_KG_PER_TREE).round();
    // Saturating float-to-int cast: negatives map to 0, huge values to u32::MAX.
    trees.max(0.0) as u32
}

// ---------------------------------------------------------------------------
// Energy efficiency
// ---------------------------------------------------------------------------

/// Energy usage indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EnergyEfficiency {
    /// Kilowatt-hours per kilogram of produce.
    pub kwh_per_kg: f64,
    /// Share of renewable energy in percent.
    pub renewable_percent: f64,
    /// Relative cost score in `[0, 100]`.
    pub cost_index: f64,
}
