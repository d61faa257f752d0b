use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::config::StrategyConfig;
use crate::kernel::snapshot::{Corner, TelemetrySnapshot};

/// Pit window reported when fuel use is unknown (no valid lap yet).
pub const PIT_WINDOW_UNLIMITED: u32 = 999;

/// Severity of the current strategy situation. Ordering matters: the
/// combined urgency is the maximum of fuel and tire urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Ok,
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Ok => "OK",
            Urgency::Info => "INFO",
            Urgency::Warning => "WARNING",
            Urgency::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Why a pit stop is being recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitReason {
    FuelCritical,
    FuelLow,
    TiresCritical,
    TiresWorn,
}

impl PitReason {
    pub fn is_fuel(self) -> bool {
        matches!(self, PitReason::FuelCritical | PitReason::FuelLow)
    }

    pub fn is_tires(self) -> bool {
        !self.is_fuel()
    }

    pub fn message(self) -> &'static str {
        match self {
            PitReason::FuelCritical => "Fuel critical - pit now",
            PitReason::FuelLow => "Fuel low - pit soon",
            PitReason::TiresCritical => "Tires critical - pit now",
            PitReason::TiresWorn => "Tires worn - pit soon",
        }
    }
}

impl fmt::Display for PitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Derived strategy quantities, recomputed every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyState {
    pub fuel_per_lap: f64,
    /// `f64::INFINITY` until a valid lap has been measured.
    pub laps_of_fuel: f64,
    pub pit_window: u32,
    pub worst_tire_corner: Corner,
    pub worst_tire_wear: f64,
    pub needs_pit: bool,
    pub pit_reason: Option<PitReason>,
    pub urgency: Urgency,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self {
            fuel_per_lap: 0.0,
            laps_of_fuel: f64::INFINITY,
            pit_window: PIT_WINDOW_UNLIMITED,
            worst_tire_corner: Corner::LeftFront,
            worst_tire_wear: 0.0,
            needs_pit: false,
            pit_reason: None,
            urgency: Urgency::Ok,
        }
    }
}

/// Turns raw fuel and tire readings into a `StrategyState`.
///
/// Fuel use is measured lap by lap: the fuel level seen on the first tick of
/// a lap is compared with the level on the first tick of the next one. Laps
/// below `min_fuel_per_lap` (pit laps, cautions) never enter the average.
#[derive(Debug, Clone)]
pub struct StrategyCalculator {
    config: StrategyConfig,
    fuel_history: VecDeque<f64>,
    last_lap: Option<u32>,
    fuel_at_lap_start: Option<f64>,
}

impl StrategyCalculator {
    pub fn new(config: StrategyConfig) -> Self {
        let capacity = config.fuel_window_laps.max(1);
        Self {
            config,
            fuel_history: VecDeque::with_capacity(capacity),
            last_lap: None,
            fuel_at_lap_start: None,
        }
    }

    pub fn update(&mut self, snapshot: &TelemetrySnapshot) -> StrategyState {
        self.track_fuel(snapshot);

        let fuel_per_lap = self.fuel_per_lap();
        let laps_of_fuel = laps_of_fuel(snapshot.fuel_level, fuel_per_lap);
        let (worst_tire_corner, worst_tire_wear) = worst_tire(snapshot);

        let (fuel_urgency, fuel_reason) = self.fuel_urgency(laps_of_fuel);
        let (tire_urgency, tire_reason) = self.tire_urgency(worst_tire_wear);

        // Fuel wins ties: it is evaluated first.
        let (urgency, pit_reason) = if fuel_urgency >= tire_urgency {
            (fuel_urgency, fuel_reason)
        } else {
            (tire_urgency, tire_reason)
        };

        StrategyState {
            fuel_per_lap,
            laps_of_fuel,
            pit_window: self.pit_window(laps_of_fuel),
            worst_tire_corner,
            worst_tire_wear,
            needs_pit: matches!(urgency, Urgency::Warning | Urgency::Critical),
            pit_reason,
            urgency,
        }
    }

    /// Forget all fuel history (new session).
    pub fn reset(&mut self) {
        self.fuel_history.clear();
        self.last_lap = None;
        self.fuel_at_lap_start = None;
    }

    pub fn fuel_samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.fuel_history.iter().copied()
    }

    fn track_fuel(&mut self, snapshot: &TelemetrySnapshot) {
        let current_fuel = snapshot.fuel_level;

        match self.last_lap {
            None => self.fuel_at_lap_start = Some(current_fuel),
            Some(last) if snapshot.lap > last => {
                if let Some(start) = self.fuel_at_lap_start {
                    let used = start - current_fuel;
                    if used >= self.config.min_fuel_per_lap {
                        if self.fuel_history.len() == self.config.fuel_window_laps {
                            self.fuel_history.pop_front();
                        }
                        self.fuel_history.push_back(used);
                    }
                }
                self.fuel_at_lap_start = Some(current_fuel);
            }
            Some(_) => {}
        }

        self.last_lap = Some(snapshot.lap);
    }

    fn fuel_per_lap(&self) -> f64 {
        if self.fuel_history.is_empty() {
            return 0.0;
        }
        self.fuel_history.iter().sum::<f64>() / self.fuel_history.len() as f64
    }

    fn pit_window(&self, laps_of_fuel: f64) -> u32 {
        if laps_of_fuel.is_infinite() {
            return PIT_WINDOW_UNLIMITED;
        }
        (laps_of_fuel - self.config.fuel_critical_laps).floor().max(0.0) as u32
    }

    fn fuel_urgency(&self, laps_of_fuel: f64) -> (Urgency, Option<PitReason>) {
        if laps_of_fuel <= self.config.fuel_critical_laps {
            (Urgency::Critical, Some(PitReason::FuelCritical))
        } else if laps_of_fuel <= self.config.fuel_warning_laps {
            (Urgency::Warning, Some(PitReason::FuelLow))
        } else {
            (Urgency::Ok, None)
        }
    }

    fn tire_urgency(&self, worst_wear: f64) -> (Urgency, Option<PitReason>) {
        if worst_wear >= self.config.tire_critical_pct {
            (Urgency::Critical, Some(PitReason::TiresCritical))
        } else if worst_wear >= self.config.tire_warning_pct {
            (Urgency::Warning, Some(PitReason::TiresWorn))
        } else {
            (Urgency::Ok, None)
        }
    }
}

fn laps_of_fuel(fuel_level: f64, fuel_per_lap: f64) -> f64 {
    if fuel_per_lap <= 0.0 {
        return f64::INFINITY;
    }
    fuel_level / fuel_per_lap
}

/// Most worn corner. Equal wear resolves to the earliest corner in
/// `Corner::ALL` (LF, RF, LR, RR).
fn worst_tire(snapshot: &TelemetrySnapshot) -> (Corner, f64) {
    snapshot
        .tire_wear
        .iter()
        .fold((Corner::LeftFront, snapshot.tire_wear.lf), |best, (corner, wear)| {
            if wear > best.1 { (corner, wear) } else { best }
        })
}
