use serde::Serialize;

use crate::kernel::event::{EventKind, RaceEvent};
use crate::kernel::strategy::{StrategyState, Urgency};
use crate::kernel::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DispatchReason {
    /// Top event is critical tier.
    CriticalEvent { kind: EventKind },
    /// Strategy urgency just became critical.
    CriticalUrgency,
    /// Cooldown elapsed and there is an event to talk about.
    Event { kind: EventKind },
    /// Cooldown elapsed and urgency went up.
    UrgencyEscalated { from: Urgency, to: Urgency },
}

impl DispatchReason {
    pub fn label(&self) -> String {
        match self {
            DispatchReason::CriticalEvent { kind } => format!("critical:{}", kind),
            DispatchReason::CriticalUrgency => "critical_urgency".to_string(),
            DispatchReason::Event { kind } => format!("event:{}", kind),
            DispatchReason::UrgencyEscalated { from, to } => format!("escalation:{}->{}", from, to),
        }
    }
}

/// Decision to ask the advisory generator for a message this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatch {
    pub reason: DispatchReason,
    /// Event the advisory should talk about, if any.
    pub trigger: Option<RaceEvent>,
    pub bypassed_cooldown: bool,
    /// Preempt queued speech.
    pub priority: bool,
}

/// Decides when an advisory request is warranted.
///
/// Critical situations always dispatch. Everything else waits for the
/// global cooldown since the previous dispatch.
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    cooldown_sec: f64,
    last_dispatch: Option<Timestamp>,
    last_urgency: Urgency,
}

impl TriggerPolicy {
    pub fn new(cooldown_sec: f64) -> Self {
        Self {
            cooldown_sec,
            last_dispatch: None,
            last_urgency: Urgency::Ok,
        }
    }

    /// Decides for this tick and commits the outcome: the dispatch time (if
    /// any) and the urgency seen, for the next tick's escalation check.
    pub fn evaluate(&mut self, events: &[RaceEvent], strategy: &StrategyState, now: Timestamp) -> Option<Dispatch> {
        let dispatch = self.decide(events, strategy, now);
        if dispatch.is_some() {
            self.last_dispatch = Some(now);
        }
        self.last_urgency = strategy.urgency;
        dispatch
    }

    /// Side-effect free decision. `events` must already be priority sorted.
    pub fn decide(&self, events: &[RaceEvent], strategy: &StrategyState, now: Timestamp) -> Option<Dispatch> {
        let top = events.first();
        let critical_urgency = strategy.urgency == Urgency::Critical;

        if let Some(event) = top.filter(|e| e.is_critical()) {
            return Some(Dispatch {
                reason: DispatchReason::CriticalEvent { kind: event.kind },
                trigger: Some(event.clone()),
                bypassed_cooldown: !self.cooldown_elapsed(now),
                priority: true,
            });
        }

        if critical_urgency && self.last_urgency != Urgency::Critical {
            return Some(Dispatch {
                reason: DispatchReason::CriticalUrgency,
                trigger: top.cloned(),
                bypassed_cooldown: !self.cooldown_elapsed(now),
                priority: true,
            });
        }

        if !self.cooldown_elapsed(now) {
            return None;
        }

        if let Some(event) = top {
            return Some(Dispatch {
                reason: DispatchReason::Event { kind: event.kind },
                trigger: Some(event.clone()),
                bypassed_cooldown: false,
                priority: critical_urgency,
            });
        }

        if strategy.urgency > self.last_urgency {
            return Some(Dispatch {
                reason: DispatchReason::UrgencyEscalated { from: self.last_urgency, to: strategy.urgency },
                trigger: None,
                bypassed_cooldown: false,
                priority: critical_urgency,
            });
        }

        None
    }

    pub fn cooldown_elapsed(&self, now: Timestamp) -> bool {
        match self.last_dispatch {
            Some(at) => now - at >= self.cooldown_sec,
            None => true,
        }
    }

    pub fn last_dispatch(&self) -> Option<Timestamp> {
        self.last_dispatch
    }

    pub fn reset(&mut self) {
        self.last_dispatch = None;
        self.last_urgency = Urgency::Ok;
    }
}

/// Deterministic message used when the advisory generator gives nothing
/// back. Built only from local state.
pub fn fallback_message(strategy: &StrategyState, position: u32, trigger: Option<&RaceEvent>) -> String {
    let fuel = strategy.pit_reason.map(|r| r.is_fuel());
    let corner = strategy.worst_tire_corner;
    let wear = strategy.worst_tire_wear;

    match strategy.urgency {
        Urgency::Critical => match fuel {
            Some(true) => format!("Box now! Fuel critical, {:.1} laps remaining.", strategy.laps_of_fuel),
            Some(false) => format!("Box now! Tires critical, {} at {:.0}%.", corner, wear),
            None => "Box this lap! Critical situation.".to_string(),
        },
        _ if trigger.is_some_and(RaceEvent::is_critical) => trigger.map(|e| e.message.clone()).unwrap_or_default(),
        Urgency::Warning => match fuel {
            Some(true) => format!(
                "Fuel getting low. {:.1} laps remaining. Plan your pit stop.",
                strategy.laps_of_fuel
            ),
            Some(false) => format!("Tires wearing. {} at {:.0}%. Consider pitting.", corner, wear),
            None => "Warning: Consider pitting soon.".to_string(),
        },
        _ => match trigger {
            Some(event) => event.message.clone(),
            None if strategy.laps_of_fuel.is_finite() => {
                format!("Lap update. P{}, {:.1} laps of fuel.", position, strategy.laps_of_fuel)
            }
            None => format!("Lap update. P{}.", position),
        },
    }
}
