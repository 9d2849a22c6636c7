//! Telemetry generation, clock, and configuration for `FieldPulse`.
//!
//! # Modules
//!
//! - [`generator`] -- The pure [`TelemetryGenerator`] that derives the next
//!   snapshot from the previous one.
//! - [`scoring`] -- Closeness-to-ideal scores behind the yield index.
//! - [`clock`] -- [`Clock`] seam with system and manual implementations.
//! - [`config`] -- Configuration loading from `fieldpulse-config.yaml`
//!   into strongly-typed structs.
//!
//! [`TelemetryGenerator`]: generator::TelemetryGenerator
//! [`Clock`]: clock::Clock

pub mod clock;
pub mod config;
pub mod generator;
pub mod scoring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, FieldPulseConfig, StoreBackend};
pub use generator::{GeneratorConfig, TelemetryGenerator};
