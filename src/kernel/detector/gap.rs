use serde::{Deserialize, Serialize};

use super::Cooldowns;
use crate::config::DetectorConfig;
use crate::kernel::event::{EventDetail, EventKind};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::time::Timestamp;

/// Hysteresis flags for the gap detectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapState {
    /// Car behind is within the closing threshold. Cleared only once the
    /// gap opens past the safe threshold.
    pub in_battle: bool,
    /// Following within the dirty-air threshold. Cleared past clean air.
    pub in_dirty_air: bool,
}

pub(super) fn detect(
    state: &mut GapState,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    snapshot: &TelemetrySnapshot,
    now: Timestamp,
) -> Vec<EventDetail> {
    let mut events = Vec::new();
    let cooldown = config.cooldowns.gap;
    let thresholds = &config.gap;

    if let Some(gap) = snapshot.gap_behind_sec {
        if gap < thresholds.battle_sec {
            if cooldowns.try_fire(EventKind::GapDefend, cooldown, now) {
                events.push(EventDetail::GapDefend { gap_behind: gap });
            }
            state.in_battle = true;
        } else if gap < thresholds.close_sec {
            if !state.in_battle && cooldowns.try_fire(EventKind::GapClosing, cooldown, now) {
                events.push(EventDetail::GapClosing { gap_behind: gap });
            }
            state.in_battle = true;
        } else if gap > thresholds.safe_sec && state.in_battle {
            if cooldowns.try_fire(EventKind::GapSafe, cooldown, now) {
                events.push(EventDetail::GapSafe { gap_behind: gap });
            }
            state.in_battle = false;
        }
    }

    if let Some(gap) = snapshot.gap_ahead_sec {
        if gap < thresholds.dirty_air_sec {
            if !state.in_dirty_air && cooldowns.try_fire(EventKind::DirtyAir, cooldown, now) {
                events.push(EventDetail::DirtyAir { gap_ahead: gap });
            }
            state.in_dirty_air = true;
        } else if gap > thresholds.clean_air_sec && state.in_dirty_air {
            if cooldowns.try_fire(EventKind::CleanAir, cooldown, now) {
                events.push(EventDetail::CleanAir { gap_ahead: gap });
            }
            state.in_dirty_air = false;
        }
    }

    events
}
