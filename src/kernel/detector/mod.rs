//! Telemetry-to-event derivation.
//!
//! The whole detector is one serializable `DetectorState` threaded through
//! the pure [`step`] function. Each sub-detector owns a slice of that state
//! and runs every tick, whether or not an earlier one fired. The shared
//! `previous` slice holds last tick's readings and is only written after all
//! sub-detectors have run.

mod gap;
mod pace;
mod position;
mod progress;
mod session;
mod strategy_bridge;
mod tires;

pub use gap::GapState;
pub use pace::PaceState;
pub use position::{ChangeWindow, PositionState};
pub use progress::ProgressState;
pub use tires::{TireRegime, TireState};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::kernel::event::{EventDetail, EventKind, RaceEvent};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::{StrategyState, Urgency};
use crate::kernel::time::{Clock, Timestamp};

/// Completed lap times kept for pace trends.
pub const LAP_HISTORY: usize = 10;

/// Last emission time per event kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldowns {
    last_fired: BTreeMap<EventKind, Timestamp>,
}

impl Cooldowns {
    pub fn ready(&self, kind: EventKind, cooldown: f64, now: Timestamp) -> bool {
        match self.last_fired.get(&kind) {
            Some(at) => now - at >= cooldown,
            None => true,
        }
    }

    pub fn mark(&mut self, kind: EventKind, now: Timestamp) {
        self.last_fired.insert(kind, now);
    }

    /// Marks and returns true if `kind` is off cooldown.
    pub fn try_fire(&mut self, kind: EventKind, cooldown: f64, now: Timestamp) -> bool {
        if !self.ready(kind, cooldown, now) {
            return false;
        }
        self.mark(kind, now);
        true
    }

    pub fn last_fired(&self, kind: EventKind) -> Option<Timestamp> {
        self.last_fired.get(&kind).copied()
    }
}

/// Readings from the previous tick, for edge and delta detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousTick {
    pub position: Option<u32>,
    pub gap_behind: Option<f64>,
    pub gap_ahead: Option<f64>,
    pub on_pit_road: bool,
    pub incident_count: u32,
    pub session_flags: u32,
    pub best_lap_time: f64,
    pub lap: u32,
    pub urgency: Urgency,
}

impl PreviousTick {
    fn observe(&mut self, snapshot: &TelemetrySnapshot, strategy: &StrategyState) {
        self.position = Some(snapshot.position);
        self.gap_behind = snapshot.gap_behind_sec;
        self.gap_ahead = snapshot.gap_ahead_sec;
        self.on_pit_road = snapshot.on_pit_road;
        self.incident_count = snapshot.incident_count;
        self.session_flags = snapshot.session_flags;
        self.best_lap_time = snapshot.best_lap_time;
        self.lap = snapshot.lap;
        self.urgency = strategy.urgency;
    }
}

/// Everything the detector remembers between ticks. Created empty at
/// session start and replaced wholesale on reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    pub previous: PreviousTick,
    pub cooldowns: Cooldowns,
    pub position: PositionState,
    pub gap: GapState,
    pub tires: TireState,
    pub pace: PaceState,
    pub progress: ProgressState,
}

/// Advances the detector by one snapshot.
///
/// Returns the next state and the events detected this tick, highest
/// priority first. Events of equal priority keep sub-detector order.
pub fn step(
    mut state: DetectorState,
    config: &DetectorConfig,
    snapshot: &TelemetrySnapshot,
    strategy: &StrategyState,
    now: Timestamp,
) -> (DetectorState, Vec<RaceEvent>) {
    let mut details: Vec<EventDetail> = Vec::new();
    let prev = &state.previous;

    details.extend(position::detect(&mut state.position, &mut state.cooldowns, config, prev.position, snapshot, now));
    details.extend(gap::detect(&mut state.gap, &mut state.cooldowns, config, snapshot, now));
    details.extend(tires::detect(&mut state.tires, &mut state.cooldowns, config, snapshot, now));
    details.extend(pace::detect(&mut state.pace, &mut state.cooldowns, config, prev, snapshot, now));
    details.extend(progress::detect(&mut state.progress, config, snapshot));
    details.extend(session::detect(config, prev, snapshot));
    details.extend(strategy_bridge::detect(&mut state.cooldowns, config, prev, snapshot, strategy, now));

    state.previous.observe(snapshot, strategy);

    let mut events: Vec<RaceEvent> = details.into_iter().map(|d| RaceEvent::new(d, now)).collect();
    // Stable: equal priorities stay in emission order.
    events.sort_by(|a, b| b.priority.cmp(&a.priority));

    (state, events)
}

/// Stateful front end over [`step`]: owns the state and reads time from an
/// injected clock.
pub struct EventDetector {
    config: DetectorConfig,
    clock: Arc<dyn Clock>,
    state: DetectorState,
}

impl EventDetector {
    pub fn new(config: DetectorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: DetectorState::default(),
        }
    }

    pub fn detect_events(&mut self, snapshot: &TelemetrySnapshot, strategy: &StrategyState) -> Vec<RaceEvent> {
        let now = self.clock.now();
        let state = std::mem::take(&mut self.state);
        let (next, events) = step(state, &self.config, snapshot, strategy, now);
        self.state = next;

        for event in &events {
            debug!(kind = %event.kind, priority = ?event.priority, "{}", event.message);
        }
        events
    }

    /// Wipes all history (new session).
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Resumes from a previously captured state, e.g. when replaying.
    pub fn restore(&mut self, state: DetectorState) {
        self.state = state;
    }
}
