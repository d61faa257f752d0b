use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::snapshot::Corner;
use crate::kernel::time::Timestamp;

/// Priority tier. Higher tiers sort first; `Critical` bypasses the advisory
/// cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

/// Closed set of event kinds. Used as the key for per-kind cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    PositionGained,
    PositionLost,
    GapClosing,
    GapDefend,
    GapSafe,
    DirtyAir,
    CleanAir,
    TireCold,
    TireOptimal,
    TireHot,
    Lockup,
    Wheelspin,
    PaceDropping,
    PaceImproving,
    PersonalBest,
    RaceHalfway,
    LapsRemaining,
    FinalLap,
    YellowFlag,
    GreenFlag,
    Incident,
    PitEntry,
    PitExit,
    FuelWarning,
    FuelCritical,
    TireWearWarning,
    TireWearCritical,
    PeriodicUpdate,
}

impl EventKind {
    pub fn priority(self) -> EventPriority {
        use EventKind::*;
        match self {
            GapDefend | YellowFlag | FuelCritical | TireWearCritical => EventPriority::Critical,
            PositionGained | PositionLost | GapClosing | Lockup | Wheelspin | FinalLap
            | GreenFlag | FuelWarning | TireWearWarning => EventPriority::High,
            GapSafe | DirtyAir | CleanAir | TireCold | TireHot | PaceDropping | PersonalBest
            | LapsRemaining | Incident | PitEntry | PitExit => EventPriority::Medium,
            TireOptimal | PaceImproving | RaceHalfway | PeriodicUpdate => EventPriority::Low,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-kind payload. Each variant carries only what that kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDetail {
    PositionGained { positions: u32, new_position: u32 },
    PositionLost { positions: u32, new_position: u32 },
    GapClosing { gap_behind: f64 },
    GapDefend { gap_behind: f64 },
    GapSafe { gap_behind: f64 },
    DirtyAir { gap_ahead: f64 },
    CleanAir { gap_ahead: f64 },
    TireCold { corner: Corner, temp: f64 },
    TireOptimal { avg_temp: f64 },
    TireHot { corner: Corner, temp: f64 },
    Lockup { corner: Corner, temp_spike: f64 },
    Wheelspin { corner: Corner, temp_spike: f64 },
    PaceDropping { delta: f64, recent_avg: f64 },
    PaceImproving { delta: f64, recent_avg: f64 },
    PersonalBest { lap_time: f64 },
    RaceHalfway { lap: u32, remaining: u32 },
    LapsRemaining { remaining: u32 },
    FinalLap,
    YellowFlag { flags: u32 },
    GreenFlag { flags: u32 },
    Incident { new_incidents: u32, total: u32 },
    PitEntry,
    PitExit,
    FuelWarning { laps_of_fuel: f64 },
    FuelCritical { laps_of_fuel: f64 },
    TireWearWarning { corner: Corner, wear: f64 },
    TireWearCritical { corner: Corner, wear: f64 },
    PeriodicUpdate { lap: u32, position: u32, laps_of_fuel: f64 },
}

impl EventDetail {
    pub fn kind(&self) -> EventKind {
        use EventDetail as D;
        match self {
            D::PositionGained { .. } => EventKind::PositionGained,
            D::PositionLost { .. } => EventKind::PositionLost,
            D::GapClosing { .. } => EventKind::GapClosing,
            D::GapDefend { .. } => EventKind::GapDefend,
            D::GapSafe { .. } => EventKind::GapSafe,
            D::DirtyAir { .. } => EventKind::DirtyAir,
            D::CleanAir { .. } => EventKind::CleanAir,
            D::TireCold { .. } => EventKind::TireCold,
            D::TireOptimal { .. } => EventKind::TireOptimal,
            D::TireHot { .. } => EventKind::TireHot,
            D::Lockup { .. } => EventKind::Lockup,
            D::Wheelspin { .. } => EventKind::Wheelspin,
            D::PaceDropping { .. } => EventKind::PaceDropping,
            D::PaceImproving { .. } => EventKind::PaceImproving,
            D::PersonalBest { .. } => EventKind::PersonalBest,
            D::RaceHalfway { .. } => EventKind::RaceHalfway,
            D::LapsRemaining { .. } => EventKind::LapsRemaining,
            D::FinalLap => EventKind::FinalLap,
            D::YellowFlag { .. } => EventKind::YellowFlag,
            D::GreenFlag { .. } => EventKind::GreenFlag,
            D::Incident { .. } => EventKind::Incident,
            D::PitEntry => EventKind::PitEntry,
            D::PitExit => EventKind::PitExit,
            D::FuelWarning { .. } => EventKind::FuelWarning,
            D::FuelCritical { .. } => EventKind::FuelCritical,
            D::TireWearWarning { .. } => EventKind::TireWearWarning,
            D::TireWearCritical { .. } => EventKind::TireWearCritical,
            D::PeriodicUpdate { .. } => EventKind::PeriodicUpdate,
        }
    }

    /// Short radio-style line, also used as the fallback when no advisory
    /// text comes back.
    pub fn message(&self) -> String {
        use EventDetail as D;
        match self {
            D::PositionGained { positions, new_position } => {
                format!("Gained {} position{}, now P{}", positions, plural(*positions), new_position)
            }
            D::PositionLost { positions, new_position } => {
                format!("Lost {} position{}, now P{}", positions, plural(*positions), new_position)
            }
            D::GapClosing { gap_behind } => format!("Car behind closing, {:.1} seconds", gap_behind),
            D::GapDefend { gap_behind } => format!("Defend! {:.1} behind", gap_behind),
            D::GapSafe { gap_behind } => format!("Gap stable, {:.1} seconds clear", gap_behind),
            D::DirtyAir { .. } => "In dirty air, manage the temps".to_string(),
            D::CleanAir { .. } => "Clean air, push now".to_string(),
            D::TireCold { corner, .. } if corner.is_front() => "Fronts still cold, be careful".to_string(),
            D::TireCold { .. } => "Rears still cold, watch the throttle".to_string(),
            D::TireOptimal { .. } => "Tires in the window".to_string(),
            D::TireHot { corner, .. } if corner.is_front() => "Fronts running hot, ease the braking".to_string(),
            D::TireHot { .. } => "Rears overheating, smooth on throttle".to_string(),
            D::Lockup { corner, .. } => format!("Lockup on {}! Easy on the brakes", corner),
            D::Wheelspin { .. } => "Wheelspin! Smooth on throttle".to_string(),
            D::PaceDropping { delta, .. } => format!("Pace dropping, {:.1}s slower", delta),
            D::PaceImproving { delta, .. } => format!("Found some pace, {:.1}s faster", delta.abs()),
            D::PersonalBest { lap_time } => format!("Personal best! {:.3}", lap_time),
            D::RaceHalfway { remaining, .. } => format!("Halfway, {} laps to go", remaining),
            D::LapsRemaining { remaining } => format!("{} laps remaining", remaining),
            D::FinalLap => "Final lap! Bring it home".to_string(),
            D::YellowFlag { .. } => "Yellow flag, caution".to_string(),
            D::GreenFlag { .. } => "Green flag, go!".to_string(),
            D::Incident { total, .. } => format!("Incident, that's {}x total", total),
            D::PitEntry => "Pit entry, good stop".to_string(),
            D::PitExit => "Out of the pits, push now".to_string(),
            D::FuelWarning { laps_of_fuel } if laps_of_fuel.is_finite() => {
                format!("Fuel getting low, {:.1} laps left", laps_of_fuel)
            }
            D::FuelWarning { .. } => "Fuel getting low".to_string(),
            D::FuelCritical { laps_of_fuel } if laps_of_fuel.is_finite() => {
                format!("Box now! {:.1} laps of fuel", laps_of_fuel)
            }
            D::FuelCritical { .. } => "Box now! Fuel critical".to_string(),
            D::TireWearWarning { corner, wear } => format!("Tires wearing, {} at {:.0}%", corner, wear),
            D::TireWearCritical { corner, wear } => format!("Tires critical, {} at {:.0}%", corner, wear),
            // No fuel figure until a full lap has been measured.
            D::PeriodicUpdate { lap, position, laps_of_fuel } if laps_of_fuel.is_finite() => {
                format!("Lap {}, P{}, {:.1} laps of fuel", lap, position, laps_of_fuel)
            }
            D::PeriodicUpdate { lap, position, .. } => format!("Lap {}, P{}", lap, position),
        }
    }

    /// Payload as `(name, value)` pairs sorted by name, for prompts.
    pub fn fields(&self) -> Vec<(String, String)> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter(|(key, _)| key != "kind")
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// A detected race event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub kind: EventKind,
    pub priority: EventPriority,
    pub message: String,
    pub detail: EventDetail,
    pub timestamp: Timestamp,
}

impl RaceEvent {
    pub fn new(detail: EventDetail, timestamp: Timestamp) -> Self {
        let kind = detail.kind();
        Self {
            kind,
            priority: kind.priority(),
            message: detail.message(),
            detail,
            timestamp,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.priority == EventPriority::Critical
    }
}
