use serde::{Deserialize, Serialize};

use super::Cooldowns;
use crate::config::{DetectorConfig, TireTempConfig};
use crate::kernel::event::{EventDetail, EventKind};
use crate::kernel::snapshot::{Corner, Corners, TelemetrySnapshot};
use crate::kernel::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TireRegime {
    Cold,
    Optimal,
    Hot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TireState {
    /// `None` until the first reporting tick.
    pub regime: Option<TireRegime>,
    pub announced_optimal: bool,
    /// Per-corner averages from the last reporting tick.
    pub last_temps: Option<Corners<f64>>,
}

pub(super) fn detect(
    state: &mut TireState,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    snapshot: &TelemetrySnapshot,
    now: Timestamp,
) -> Vec<EventDetail> {
    let temps = snapshot.average_tire_temps();

    // All zero: the car does not report tire temps. Not the same as cold.
    if temps.iter().all(|(_, t)| t == 0.0) {
        return Vec::new();
    }

    let mut events = Vec::new();

    if let Some(last) = state.last_temps {
        events.extend(detect_spike(&temps, &last, cooldowns, config, now));
    }

    let (regime, corner) = classify(&temps, &config.tires);
    if state.regime != Some(regime) {
        let cooldown = config.cooldowns.tire_temp;
        match regime {
            TireRegime::Hot => {
                if cooldowns.try_fire(EventKind::TireHot, cooldown, now) {
                    events.push(EventDetail::TireHot { corner, temp: temps.get(corner) });
                }
            }
            TireRegime::Cold => {
                if cooldowns.try_fire(EventKind::TireCold, cooldown, now) {
                    events.push(EventDetail::TireCold { corner, temp: temps.get(corner) });
                }
            }
            // First arrival in the window only, once per session.
            TireRegime::Optimal if !state.announced_optimal => {
                let avg_temp = temps.iter().map(|(_, t)| t).sum::<f64>() / 4.0;
                events.push(EventDetail::TireOptimal { avg_temp });
                state.announced_optimal = true;
            }
            TireRegime::Optimal => {}
        }
        state.regime = Some(regime);
    }

    state.last_temps = Some(temps);
    events
}

/// A sudden rise on a front reads as a lockup, on a rear as wheelspin.
/// At most one of the two per tick; fronts are checked first.
fn detect_spike(
    temps: &Corners<f64>,
    last: &Corners<f64>,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    now: Timestamp,
) -> Option<EventDetail> {
    let threshold = config.tires.spike_delta_c;
    let cooldown = config.cooldowns.spike;

    for corner in Corner::ALL {
        let temp_spike = temps.get(corner) - last.get(corner);
        if temp_spike <= threshold {
            continue;
        }
        let (kind, detail) = if corner.is_front() {
            (EventKind::Lockup, EventDetail::Lockup { corner, temp_spike })
        } else {
            (EventKind::Wheelspin, EventDetail::Wheelspin { corner, temp_spike })
        };
        if cooldowns.try_fire(kind, cooldown, now) {
            return Some(detail);
        }
    }
    None
}

/// Any hot corner makes the set hot; otherwise any cold corner makes it
/// cold. The returned corner is the first offender in `Corner::ALL` order.
fn classify(temps: &Corners<f64>, config: &TireTempConfig) -> (TireRegime, Corner) {
    if let Some((corner, _)) = temps.iter().find(|&(_, t)| t > config.hot_c) {
        return (TireRegime::Hot, corner);
    }
    if let Some((corner, _)) = temps.iter().find(|&(_, t)| t < config.cold_c) {
        return (TireRegime::Cold, corner);
    }
    (TireRegime::Optimal, Corner::LeftFront)
}

