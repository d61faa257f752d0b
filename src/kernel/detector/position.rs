use serde::{Deserialize, Serialize};

use super::Cooldowns;
use crate::config::DetectorConfig;
use crate::kernel::event::{EventDetail, EventKind};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::time::Timestamp;

/// An open batch of position changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeWindow {
    pub last_change_at: Timestamp,
    /// Position held just before the first change of the batch.
    pub start_position: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub window: Option<ChangeWindow>,
}

/// Batches position flicker into one summary per settle episode. The
/// summary is the net change from the window's start position to the
/// position that held for `settle_time_sec`; a net change of zero emits
/// nothing.
pub(super) fn detect(
    state: &mut PositionState,
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    previous: Option<u32>,
    snapshot: &TelemetrySnapshot,
    now: Timestamp,
) -> Option<EventDetail> {
    if !config.callouts.position || snapshot.lap < config.position.min_lap {
        return None;
    }
    // P0 means "not classified yet".
    let previous = previous.filter(|&p| p > 0)?;
    let current = snapshot.position;
    if current == 0 {
        return None;
    }

    if current != previous {
        match state.window.as_mut() {
            Some(window) => window.last_change_at = now,
            None => {
                state.window = Some(ChangeWindow {
                    last_change_at: now,
                    start_position: previous,
                })
            }
        }
        return None;
    }

    let window = state.window?;
    if now - window.last_change_at < config.position.settle_time_sec {
        return None;
    }
    state.window = None;

    let start = window.start_position;
    let (kind, detail) = if current < start {
        let detail = EventDetail::PositionGained { positions: start - current, new_position: current };
        (EventKind::PositionGained, detail)
    } else if current > start {
        let detail = EventDetail::PositionLost { positions: current - start, new_position: current };
        (EventKind::PositionLost, detail)
    } else {
        return None;
    };

    cooldowns
        .try_fire(kind, config.cooldowns.position, now)
        .then_some(detail)
}
