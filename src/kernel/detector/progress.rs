use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::DetectorConfig;
use crate::kernel::event::EventDetail;
use crate::kernel::snapshot::TelemetrySnapshot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Race length, inferred from the first lap-limited reading.
    pub total_laps: Option<u32>,
    pub announced_halfway: bool,
    pub announced_remaining: BTreeSet<u32>,
}

pub(super) fn detect(
    state: &mut ProgressState,
    config: &DetectorConfig,
    snapshot: &TelemetrySnapshot,
) -> Vec<EventDetail> {
    let progress = &config.progress;
    if !progress.enabled {
        return Vec::new();
    }
    // Timed sessions have no lap count to call out.
    let Some(remaining) = snapshot.laps_remaining() else {
        return Vec::new();
    };

    let mut events = Vec::new();

    if state.total_laps.is_none() && remaining > 0 && snapshot.lap > 0 {
        state.total_laps = Some(remaining + snapshot.lap);
    }

    if progress.halfway_callout && !state.announced_halfway {
        if let Some(total) = state.total_laps {
            if snapshot.lap >= total / 2 {
                events.push(EventDetail::RaceHalfway { lap: snapshot.lap, remaining });
                state.announced_halfway = true;
            }
        }
    }

    if remaining > 0
        && progress.laps_remaining_callouts.contains(&remaining)
        && state.announced_remaining.insert(remaining)
    {
        events.push(if remaining == 1 {
            EventDetail::FinalLap
        } else {
            EventDetail::LapsRemaining { remaining }
        });
    }

    events
}
