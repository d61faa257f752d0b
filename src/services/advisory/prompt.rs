use serde_json::json;

use crate::config::TireTempConfig;
use crate::kernel::event::RaceEvent;
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::{StrategyState, Urgency};
use crate::metadata::Catalog;
use crate::source::SessionInfo;

/// Builds the user prompt for an advisory request: race state, strategy,
/// and the triggering event if there is one.
pub fn format_prompt(strategy: &StrategyState, snapshot: &TelemetrySnapshot, event: Option<&RaceEvent>) -> String {
    let mut lines = vec![format!("Lap {}, P{}", snapshot.lap, snapshot.position)];

    if strategy.laps_of_fuel.is_finite() {
        lines.push(format!(
            "Fuel: {:.1} laps remaining ({:.2}/lap)",
            strategy.laps_of_fuel, strategy.fuel_per_lap
        ));
    } else {
        lines.push(format!("Fuel: {:.1} in tank, usage not measured yet", snapshot.fuel_level));
    }
    lines.push(format!(
        "Tires: {} at {:.0}% worn",
        strategy.worst_tire_corner, strategy.worst_tire_wear
    ));

    if let Some(remaining) = snapshot.laps_remaining() {
        lines.push(format!("Session: {} laps to go", remaining));
    } else if snapshot.session_time_remain > 0.0 {
        let minutes = (snapshot.session_time_remain / 60.0).floor() as u64;
        lines.push(format!("Session: {} minutes remaining", minutes));
    }

    if let Some(gap) = snapshot.gap_behind_sec {
        lines.push(format!("Gap behind: {:.1}s", gap));
    }
    if let Some(gap) = snapshot.gap_ahead_sec {
        lines.push(format!("Gap ahead: {:.1}s", gap));
    }

    if let Some(event) = event {
        lines.push(format!("EVENT: {}", event.message));
        for (key, value) in event.detail.fields() {
            // Gaps are already on their own lines.
            if key == "gap_behind" || key == "gap_ahead" {
                continue;
            }
            lines.push(format!("  {}: {}", key, value));
        }
    }

    match (strategy.urgency, strategy.pit_reason) {
        (Urgency::Critical, Some(reason)) => lines.push(format!("CRITICAL: {}", reason)),
        (Urgency::Warning, Some(reason)) => lines.push(format!("Warning: {}", reason)),
        (_, Some(reason)) if strategy.needs_pit => lines.push(format!("Pit recommended: {}", reason)),
        _ => {}
    }

    lines.join("\n")
}

/// Single-line JSON variant of [`format_prompt`] for models tuned on
/// structured input. Car and track are enriched from `catalog`; unknown ones
/// keep the sim's name with class and type `"unknown"`.
pub fn format_prompt_json(
    strategy: &StrategyState,
    snapshot: &TelemetrySnapshot,
    session: &SessionInfo,
    catalog: &Catalog,
    tires: &TireTempConfig,
    event: Option<&RaceEvent>,
) -> String {
    let car = catalog.car(&session.car);
    let track = catalog.track(&session.track);
    let temps = snapshot.average_tire_temps().map(round1);

    let mut data = json!({
        "car": session.car,
        "car_class": car.map_or("unknown", |c| c.class.as_str()),
        "car_traits": car.map(|c| c.traits.clone()).unwrap_or_default(),
        "advice_style": car.map(|c| c.advice_style.as_str()),
        "track": track.map_or(session.track.as_str(), |t| t.name.as_str()),
        "track_type": track.map_or("unknown", |t| t.track_type.as_str()),
        "upcoming_corner": track.and_then(|t| t.upcoming_corner(snapshot.lap_pct)),
        "lap": snapshot.lap,
        "lap_pct": snapshot.lap_pct,
        "position": snapshot.position,
        "fuel_laps_remaining": strategy.laps_of_fuel.is_finite().then_some(strategy.laps_of_fuel),
        "tire_wear": {
            "fl": snapshot.tire_wear.lf,
            "fr": snapshot.tire_wear.rf,
            "rl": snapshot.tire_wear.lr,
            "rr": snapshot.tire_wear.rr,
        },
        "tire_temps": {
            "fl": temps.lf,
            "fr": temps.rf,
            "rl": temps.lr,
            "rr": temps.rr,
        },
        "tire_window_c": [tires.optimal_low_c, tires.optimal_high_c],
        "gap_ahead": snapshot.gap_ahead_sec,
        "gap_behind": snapshot.gap_behind_sec,
        "last_lap_time": snapshot.last_lap_time,
        "best_lap_time": snapshot.best_lap_time,
        "session_laps_remain": snapshot.session_laps_remain,
        "incident_count": snapshot.incident_count,
        "track_temp_c": snapshot.track_temp_c,
    });
    if let Some(event) = event {
        data["event"] = json!({ "kind": event.kind, "message": event.message });
    }
    data.to_string()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
