//! The telemetry snapshot: one atomically persisted generation of metrics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::metrics::{
    Co2Saved, EnergyEfficiency, SoilHumidity, SoilPh, Temperature, WaterRecycled, YieldIndex,
};

/// Advisory spacing between generations, in minutes.
pub const NEXT_UPDATE_MINUTES: i64 = 5;

/// Complete telemetry record produced by one generation step.
///
/// A snapshot is never mutated after creation. The next tick produces a
/// brand-new value that replaces this one wholesale in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Air temperature.
    pub temperature: Temperature,
    /// Soil humidity.
    pub soil_humidity: SoilHumidity,
    /// Soil pH.
    #[serde(rename = "soilPH")]
    pub soil_ph: SoilPh,
    /// Composite yield score.
    pub yield_index: YieldIndex,
    /// Recycled water counters.
    pub water_recycled: WaterRecycled,
    /// CO2 savings counters.
    pub co2_saved: Co2Saved,
    /// Energy usage indicators.
    pub energy_efficiency: EnergyEfficiency,
    /// Instant this snapshot was generated.
    pub updated_at: DateTime<Utc>,
    /// `updated_at` plus five minutes. Advisory only.
    pub next_update: DateTime<Utc>,
}

impl Snapshot {
    /// Compute the advisory next-update instant for a generation time.
    pub fn next_update_after(updated_at: DateTime<Utc>) -> DateTime<Utc> {
        updated_at
            .checked_add_signed(Duration::minutes(NEXT_UPDATE_MINUTES))
            .unwrap_or(updated_at)
    }

    /// Serialize the snapshot as pretty-printed JSON for download.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested file name for an exported snapshot.
    pub fn export_file_name(&self) -> String {
        format!("telemetry-{}.json", self.updated_at.format("%Y%m%dT%H%M%SZ"))
    }
}
