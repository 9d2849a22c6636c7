//! Telemetry generation: one [`Snapshot`] from the previous one.
//!
//! [`TelemetryGenerator::next_snapshot`] is a pure function of the previous
//! snapshot, the generation instant, and an injected random source. It
//! never fails: every metric is clamped into its documented range before
//! the snapshot is assembled.
//!
//! # Dependency chain
//!
//! ```text
//! temperature --> humidity --> pH --> yield index
//!      |
//!      +--------> energy efficiency
//!
//! water / CO2 counters accumulate independently
//! ```
//!
//! # First tick
//!
//! With no previous snapshot the generator starts from baseline
//! temperature and pH, a stable trend, and zero cumulative counters. The
//! counters only start accumulating from the second generation onward.

use std::f64::consts::PI;

use chrono::{DateTime, FixedOffset, Offset as _, Timelike, Utc};
use fieldpulse_types::metrics::{self, PH_MAX, PH_MIN, SCORE_MAX, SCORE_MIN};
use fieldpulse_types::{
    Co2Saved, EnergyEfficiency, HumidityZone, Snapshot, SoilHumidity, SoilPh, Temperature,
    TemperatureReading, TemperatureTrend, WaterRecycled, YieldIndex, TEMPERATURE_HISTORY_CAP,
};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::scoring::{self, IDEAL_HUMIDITY_PCT, IDEAL_PH, IDEAL_TEMPERATURE_C};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Mean daily temperature in °C.
pub const BASE_TEMPERATURE_C: f64 = IDEAL_TEMPERATURE_C;

/// Half the peak-to-trough swing of the daily temperature curve.
const DIURNAL_AMPLITUDE_C: f64 = 6.0;

/// Local hour at which the diurnal curve crosses the mean on its way up.
/// Peak lands six hours later (15:00), trough six hours earlier (03:00).
const DIURNAL_RISING_HOUR: f64 = 9.0;

/// Temperature jitter bound in °C.
const TEMPERATURE_JITTER_C: f64 = 1.0;

/// Plausibility bounds for air temperature.
const TEMPERATURE_RANGE_C: (f64, f64) = (-10.0, 50.0);

/// Optimal growing band published with every reading.
pub const OPTIMAL_TEMPERATURE_C: (f64, f64) = (18.0, 26.0);

/// Humidity lost per °C above the baseline temperature.
const HUMIDITY_PER_DEGREE: f64 = 2.0;

/// Humidity jitter bound in percentage points.
const HUMIDITY_JITTER_PCT: f64 = 5.0;

/// Clamp bounds for generated humidity.
const HUMIDITY_RANGE_PCT: (f64, f64) = (30.0, 90.0);

/// Baseline soil pH the walk reverts toward.
pub const BASELINE_PH: f64 = IDEAL_PH;

/// Fraction of the distance to baseline recovered each tick.
const PH_REVERSION: f64 = 0.1;

/// pH jitter bound.
const PH_JITTER: f64 = 0.1;

/// Forecast jitter bound in score points.
const FORECAST_JITTER: f64 = 5.0;

/// Liters recycled per tick, `[low, high)`.
const WATER_INCREMENT_L: (f64, f64) = (50.0, 150.0);

/// Percent saved versus traditional irrigation.
pub const WATER_SAVED_VS_TRADITIONAL_PCT: f64 = 70.0;

/// Kilograms of CO2 saved per tick, `[low, high)`.
const CO2_INCREMENT_KG: (f64, f64) = (0.5, 2.0);

/// Offset from air temperature to the external-temperature proxy.
const EXTERNAL_TEMPERATURE_OFFSET_C: f64 = 4.0;

/// Energy intensity at an external temperature of 0 °C.
const KWH_PER_KG_AT_ZERO: f64 = 2.4;

/// Energy intensity saved per °C of external warmth.
const KWH_PER_KG_PER_DEGREE: f64 = 0.04;

/// Floor for energy intensity.
const KWH_PER_KG_FLOOR: f64 = 0.1;

/// Mean renewable share in percent.
const RENEWABLE_MEAN_PCT: f64 = 65.0;

/// Renewable share jitter bound in percentage points.
const RENEWABLE_JITTER_PCT: f64 = 10.0;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Parameters of the generator that are not part of any snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Maximum temperature history length.
    pub history_cap: usize,
    /// Garden local time, for the diurnal curve and the midnight reset.
    pub utc_offset: FixedOffset,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            history_cap: TEMPERATURE_HISTORY_CAP,
            utc_offset: Utc.fix(),
        }
    }
}

/// Stateless snapshot generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryGenerator {
    config: GeneratorConfig,
}

impl TelemetryGenerator {
    /// Create a generator with the given parameters.
    pub const fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Return the generator parameters.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Produce the snapshot that follows `previous` at instant `now`.
    ///
    /// Pure and total: the same `(previous, now)` and the same random
    /// sequence always yield the same snapshot, and every field is inside
    /// its documented range.
    pub fn next_snapshot<R: Rng>(
        &self,
        previous: Option<&Snapshot>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Snapshot {
        let local = now.with_timezone(&self.config.utc_offset);

        let temperature = self.next_temperature(previous, now, &local, rng);
        let soil_humidity = next_humidity(temperature.current, rng);
        let soil_ph = next_ph(previous, rng);
        let yield_index = next_yield(
            previous,
            temperature.current,
            soil_humidity.current,
            soil_ph.current,
            rng,
        );
        let energy_efficiency = next_energy(temperature.current, rng);
        let water_recycled = next_water(previous, &local, rng);
        let co2_saved = next_co2(previous, rng);

        Snapshot {
            temperature,
            soil_humidity,
            soil_ph,
            yield_index,
            water_recycled,
            co2_saved,
            energy_efficiency,
            updated_at: now,
            next_update: Snapshot::next_update_after(now),
        }
    }

    fn next_temperature<R: Rng>(
        &self,
        previous: Option<&Snapshot>,
        now: DateTime<Utc>,
        local: &DateTime<FixedOffset>,
        rng: &mut R,
    ) -> Temperature {
        let raw = BASE_TEMPERATURE_C
            + diurnal_offset(local)
            + jitter(rng, TEMPERATURE_JITTER_C);
        let current = round_to(raw.clamp(TEMPERATURE_RANGE_C.0, TEMPERATURE_RANGE_C.1), 1);

        let previous_value = previous
            .and_then(|p| p.temperature.last_reading())
            .map(|reading| reading.value);
        let trend = TemperatureTrend::between(previous_value, current);

        let mut history = previous
            .map(|p| p.temperature.history.clone())
            .unwrap_or_default();
        metrics::push_history(
            &mut history,
            TemperatureReading { time: now, value: current },
            self.config.history_cap,
        );

        Temperature {
            current,
            optimal: OPTIMAL_TEMPERATURE_C,
            trend,
            history,
        }
    }
}

/// Diurnal temperature offset for a local time of day.
///
/// Sinusoid with a 24-hour period peaking at 15:00 and bottoming at 03:00.
fn diurnal_offset(local: &DateTime<FixedOffset>) -> f64 {
    let hour = f64::from(local.hour()) + f64::from(local.minute()) / 60.0;
    let phase = 2.0 * PI * (hour - DIURNAL_RISING_HOUR) / 24.0;
    DIURNAL_AMPLITUDE_C * phase.sin()
}

fn next_humidity<R: Rng>(temperature: f64, rng: &mut R) -> SoilHumidity {
    let raw = IDEAL_HUMIDITY_PCT - (temperature - BASE_TEMPERATURE_C) * HUMIDITY_PER_DEGREE
        + jitter(rng, HUMIDITY_JITTER_PCT);
    let current = round_to(raw, 1).clamp(HUMIDITY_RANGE_PCT.0, HUMIDITY_RANGE_PCT.1);
    // Zone is drawn fresh every tick; it carries no continuity.
    let zone = HumidityZone::ALL
        .choose(rng)
        .copied()
        .unwrap_or(HumidityZone::A);
    SoilHumidity::from_reading(current, zone)
}

fn next_ph<R: Rng>(previous: Option<&Snapshot>, rng: &mut R) -> SoilPh {
    let prior = previous.map_or(BASELINE_PH, |p| p.soil_ph.current);
    let raw = prior + (BASELINE_PH - prior) * PH_REVERSION + jitter(rng, PH_JITTER);
    SoilPh::from_reading(round_to(raw, 2).clamp(PH_MIN, PH_MAX))
}

fn next_yield<R: Rng>(
    previous: Option<&Snapshot>,
    temperature: f64,
    humidity: f64,
    ph: f64,
    rng: &mut R,
) -> YieldIndex {
    let current = clamp_score(round_to(scoring::yield_score(temperature, humidity, ph), 1));
    let forecast = clamp_score(round_to(current + jitter(rng, FORECAST_JITTER), 1));
    let comparison_last_month = previous
        .map(|p| p.yield_index.current)
        .filter(|prior| *prior > 0.0)
        .map_or(0.0, |prior| round_to((current - prior) / prior * 100.0, 1));

    YieldIndex {
        current,
        forecast,
        comparison_last_month,
    }
}

fn next_water<R: Rng>(
    previous: Option<&Snapshot>,
    local: &DateTime<FixedOffset>,
    rng: &mut R,
) -> WaterRecycled {
    let Some(prior) = previous.map(|p| p.water_recycled) else {
        return WaterRecycled {
            today: 0.0,
            this_month: 0.0,
            saved_vs_traditional: WATER_SAVED_VS_TRADITIONAL_PCT,
        };
    };
    let increment = rng.random_range(WATER_INCREMENT_L.0..WATER_INCREMENT_L.1);
    // Every tick inside the local midnight hour restarts the daily counter.
    let today = if local.hour() == 0 {
        0.0
    } else {
        round_to(prior.today + increment, 1)
    };
    // TODO: roll this_month over on the first local day of the month.
    let this_month = round_to(prior.this_month + increment, 1);

    WaterRecycled {
        today,
        this_month,
        saved_vs_traditional: WATER_SAVED_VS_TRADITIONAL_PCT,
    }
}

fn next_co2<R: Rng>(previous: Option<&Snapshot>, rng: &mut R) -> Co2Saved {
    let Some(prior) = previous.map(|p| p.co2_saved) else {
        return Co2Saved::from_totals(0.0, 0.0);
    };
    let increment = rng.random_range(CO2_INCREMENT_KG.0..CO2_INCREMENT_KG.1);
    let total_kg = round_to(prior.total_kg + increment, 2).max(prior.total_kg);
    // TODO: roll this_week over at the start of the local week.
    let this_week = round_to(prior.this_week + increment, 2);
    Co2Saved::from_totals(total_kg, this_week)
}

fn next_energy<R: Rng>(temperature: f64, rng: &mut R) -> EnergyEfficiency {
    let external = temperature - EXTERNAL_TEMPERATURE_OFFSET_C;
    let kwh_per_kg = round_to(
        (KWH_PER_KG_AT_ZERO - external * KWH_PER_KG_PER_DEGREE).max(KWH_PER_KG_FLOOR),
        2,
    );
    let renewable_percent = clamp_score(round_to(
        RENEWABLE_MEAN_PCT + jitter(rng, RENEWABLE_JITTER_PCT),
        1,
    ));
    let cost_index = clamp_score(round_to(kwh_per_kg / KWH_PER_KG_AT_ZERO * 100.0, 1));

    EnergyEfficiency {
        kwh_per_kg,
        renewable_percent,
        cost_index,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Uniform jitter in `[-bound, bound]`.
fn jitter<R: Rng>(rng: &mut R, bound: f64) -> f64 {
    rng.random_range(-bound..=bound)
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Round to `decimals` decimal places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
