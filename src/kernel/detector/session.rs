//! Edge-triggered session events: flags, incidents, pit road.

use super::PreviousTick;
use crate::config::DetectorConfig;
use crate::kernel::event::EventDetail;
use crate::kernel::snapshot::{TelemetrySnapshot, YELLOW_MASK};

pub(super) fn detect(
    config: &DetectorConfig,
    previous: &PreviousTick,
    snapshot: &TelemetrySnapshot,
) -> Vec<EventDetail> {
    let mut events = Vec::new();
    let callouts = &config.callouts;

    if callouts.flags {
        let was_yellow = previous.session_flags & YELLOW_MASK != 0;
        let is_yellow = snapshot.is_yellow();
        if is_yellow && !was_yellow {
            events.push(EventDetail::YellowFlag { flags: snapshot.session_flags });
        } else if !is_yellow && was_yellow {
            events.push(EventDetail::GreenFlag { flags: snapshot.session_flags });
        }
    }

    if callouts.incidents && snapshot.incident_count > previous.incident_count {
        events.push(EventDetail::Incident {
            new_incidents: snapshot.incident_count - previous.incident_count,
            total: snapshot.incident_count,
        });
    }

    if callouts.pit_entry && snapshot.on_pit_road && !previous.on_pit_road {
        events.push(EventDetail::PitEntry);
    }
    if callouts.pit_exit && !snapshot.on_pit_road && previous.on_pit_road {
        events.push(EventDetail::PitExit);
    }

    events
}
