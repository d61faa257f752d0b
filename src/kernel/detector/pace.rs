use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::{Cooldowns, PreviousTick, LAP_HISTORY};
use crate::config::DetectorConfig;
use crate::kernel::event::{EventDetail, EventKind};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::time::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaceState {
    /// Most recent completed lap times, oldest first.
    pub lap_times: VecDeque<f64>,
}

pub(super) fn detect(
    state: &mut PaceState,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    previous: &PreviousTick,
    snapshot: &TelemetrySnapshot,
    now: Timestamp,
) -> Vec<EventDetail> {
    let mut events = Vec::new();

    if config.callouts.personal_best
        && previous.best_lap_time > 0.0
        && snapshot.best_lap_time > 0.0
        && snapshot.best_lap_time < previous.best_lap_time
        && cooldowns.try_fire(EventKind::PersonalBest, config.cooldowns.personal_best, now)
    {
        events.push(EventDetail::PersonalBest { lap_time: snapshot.best_lap_time });
    }

    if snapshot.lap > previous.lap && snapshot.last_lap_time > 0.0 {
        if state.lap_times.len() == LAP_HISTORY {
            state.lap_times.pop_front();
        }
        state.lap_times.push_back(snapshot.last_lap_time);
        events.extend(detect_trend(state, cooldowns, config, now));
    }

    events
}

/// Mean of the last `trend_laps` laps against the `trend_laps` before them.
fn detect_trend(
    state: &PaceState,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    now: Timestamp,
) -> Option<EventDetail> {
    let n = config.pace.trend_laps;
    let len = state.lap_times.len();
    if n == 0 || len < n * 2 {
        return None;
    }

    let mean = |range: std::ops::Range<usize>| {
        let count = range.len() as f64;
        state.lap_times.range(range).sum::<f64>() / count
    };
    let recent_avg = mean(len - n..len);
    let earlier_avg = mean(len - 2 * n..len - n);
    let delta = recent_avg - earlier_avg;

    if delta > config.pace.drop_threshold_sec {
        cooldowns
            .try_fire(EventKind::PaceDropping, config.cooldowns.pace, now)
            .then_some(EventDetail::PaceDropping { delta, recent_avg })
    } else if delta < -config.pace.gain_threshold_sec {
        cooldowns
            .try_fire(EventKind::PaceImproving, config.cooldowns.pace, now)
            .then_some(EventDetail::PaceImproving { delta, recent_avg })
    } else {
        None
    }
}
