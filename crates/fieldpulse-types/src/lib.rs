//! Shared telemetry types for `FieldPulse`.
//!
//! This crate is the single source of truth for the shape of a telemetry
//! [`Snapshot`]. The serialized field layout is what every persistence
//! backend and transport carries, and it flows to `TypeScript` via `ts-rs`
//! for the garden dashboard.
//!
//! # Modules
//!
//! - [`enums`] -- Trend, humidity zone, and pH status enumerations
//! - [`metrics`] -- The seven metric sub-records and their derivations
//! - [`snapshot`] -- The atomically persisted [`Snapshot`] aggregate

pub mod enums;
pub mod metrics;
pub mod snapshot;

pub use enums::{HumidityZone, PhStatus, TemperatureTrend};
pub use metrics::{
    Co2Saved, EnergyEfficiency, SoilHumidity, SoilPh, Temperature, TemperatureReading,
    WaterRecycled, YieldIndex, TEMPERATURE_HISTORY_CAP,
};
pub use snapshot::Snapshot;
