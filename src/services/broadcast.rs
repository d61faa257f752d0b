use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::kernel::event::RaceEvent;
use crate::kernel::snapshot::{Corner, Corners};
use crate::kernel::strategy::{StrategyState, Urgency};

/// What the live overlay gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayUpdate {
    Session {
        track: String,
        car: String,
    },
    Telemetry {
        lap: u32,
        position: u32,
        laps_of_fuel: Option<f64>,
        fuel_per_lap: f64,
        worst_tire_corner: Corner,
        worst_tire_wear: f64,
        tire_temps: Corners<f64>,
        gap_ahead: Option<f64>,
        gap_behind: Option<f64>,
        urgency: Urgency,
        events: Vec<RaceEvent>,
    },
    /// A generator call has started.
    AiThinking {
        reason: String,
        prompt_preview: String,
    },
    Advisory {
        text: String,
        urgency: Urgency,
        latency_ms: f64,
        reason: String,
        fallback: bool,
        prompt_preview: String,
    },
}

pub const THINKING_PREVIEW_CHARS: usize = 150;
pub const ADVISORY_PREVIEW_CHARS: usize = 200;

/// First `max_chars` characters of `text`, ending in `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

impl OverlayUpdate {
    pub fn telemetry(
        snapshot: &crate::kernel::snapshot::TelemetrySnapshot,
        strategy: &StrategyState,
        events: &[RaceEvent],
    ) -> Self {
        OverlayUpdate::Telemetry {
            lap: snapshot.lap,
            position: snapshot.position,
            // JSON has no infinity.
            laps_of_fuel: strategy.laps_of_fuel.is_finite().then_some(strategy.laps_of_fuel),
            fuel_per_lap: strategy.fuel_per_lap,
            worst_tire_corner: strategy.worst_tire_corner,
            worst_tire_wear: strategy.worst_tire_wear,
            tire_temps: snapshot.average_tire_temps(),
            gap_ahead: snapshot.gap_ahead_sec,
            gap_behind: snapshot.gap_behind_sec,
            urgency: strategy.urgency,
            events: events.to_vec(),
        }
    }
}

/// Fan-out to overlay subscribers. Slow subscribers lose the oldest updates;
/// publishing never waits.
///
/// The last `Session` update is kept so late subscribers can be told which
/// car and track they are looking at.
#[derive(Debug, Clone)]
pub struct OverlayHub {
    tx: broadcast::Sender<OverlayUpdate>,
    session: Arc<Mutex<Option<OverlayUpdate>>>,
}

impl OverlayHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns how many subscribers received the update.
    pub fn publish(&self, update: OverlayUpdate) -> usize {
        if matches!(update, OverlayUpdate::Session { .. }) {
            *self.session.lock() = Some(update.clone());
        }
        self.tx.send(update).unwrap_or(0)
    }

    pub fn current_session(&self) -> Option<OverlayUpdate> {
        self.session.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayUpdate> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
