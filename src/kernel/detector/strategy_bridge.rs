use super::{Cooldowns, PreviousTick};
use crate::config::DetectorConfig;
use crate::kernel::event::{EventDetail, EventKind};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::{StrategyState, Urgency};
use crate::kernel::time::Timestamp;

/// Lap-based routine update plus strategy urgency surfaced as events.
///
/// Entering `Critical` always emits, regardless of cooldown. While urgency
/// stays critical the event repeats at most once per strategy cooldown.
/// Warnings are emitted only on escalation from below.
pub(super) fn detect(
    cooldowns: &mut Cooldowns,
    config: &DetectorConfig,
    previous: &PreviousTick,
    snapshot: &TelemetrySnapshot,
    strategy: &StrategyState,
    now: Timestamp,
) -> Vec<EventDetail> {
    let mut events = Vec::new();

    let every = config.periodic_update_laps;
    if every > 0 && snapshot.lap > previous.lap && snapshot.lap % every == 0 {
        events.push(EventDetail::PeriodicUpdate {
            lap: snapshot.lap,
            position: snapshot.position,
            laps_of_fuel: strategy.laps_of_fuel,
        });
    }

    let Some(reason) = strategy.pit_reason else {
        return events;
    };

    match strategy.urgency {
        Urgency::Critical => {
            let (kind, detail) = if reason.is_fuel() {
                (
                    EventKind::FuelCritical,
                    EventDetail::FuelCritical { laps_of_fuel: strategy.laps_of_fuel },
                )
            } else {
                (
                    EventKind::TireWearCritical,
                    EventDetail::TireWearCritical {
                        corner: strategy.worst_tire_corner,
                        wear: strategy.worst_tire_wear,
                    },
                )
            };

            let entering = previous.urgency != Urgency::Critical;
            if entering {
                cooldowns.mark(kind, now);
                events.push(detail);
            } else if cooldowns.try_fire(kind, config.cooldowns.strategy, now) {
                events.push(detail);
            }
        }
        Urgency::Warning if previous.urgency < Urgency::Warning => {
            events.push(if reason.is_fuel() {
                EventDetail::FuelWarning { laps_of_fuel: strategy.laps_of_fuel }
            } else {
                EventDetail::TireWearWarning {
                    corner: strategy.worst_tire_corner,
                    wear: strategy.worst_tire_wear,
                }
            });
        }
        _ => {}
    }

    events
}
