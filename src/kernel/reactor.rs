use std::sync::Arc;
use tracing::debug;

use crate::config::EngineerConfig;
use crate::kernel::detector::EventDetector;
use crate::kernel::event::RaceEvent;
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::{StrategyCalculator, StrategyState};
use crate::kernel::time::{Clock, Tick};
use crate::kernel::trigger::{Dispatch, TriggerPolicy};

/// Everything the driver needs to ask for (or fall back from) an advisory.
#[derive(Debug, Clone)]
pub struct AdvisoryRequest {
    pub tick: Tick,
    pub dispatch: Dispatch,
    pub strategy: StrategyState,
    pub snapshot: TelemetrySnapshot,
}

#[derive(Debug, Clone)]
pub enum SideEffect {
    /// No snapshot this tick. The driver owns reconnection.
    ConnectionLost,
    /// Per-tick result for logging and broadcast.
    Telemetry {
        tick: Tick,
        snapshot: TelemetrySnapshot,
        strategy: StrategyState,
        events: Vec<RaceEvent>,
    },
    RequestAdvisory(AdvisoryRequest),
}

/// Per-tick pipeline: strategy, then detection, then the trigger policy.
///
/// `tick_step` is synchronous and never awaits. Anything that needs I/O comes
/// back as a [`SideEffect`] for the driver to execute.
pub struct Reactor {
    clock: Arc<dyn Clock>,
    pub strategy: StrategyCalculator,
    pub detector: EventDetector,
    pub policy: TriggerPolicy,
    pub tick: Tick,
    last_lap: Option<u32>,
}

impl Reactor {
    pub fn new(config: &EngineerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            strategy: StrategyCalculator::new(config.strategy.clone()),
            detector: EventDetector::new(config.detector.clone(), Arc::clone(&clock)),
            policy: TriggerPolicy::new(config.advisory.cooldown_sec),
            clock,
            tick: Tick::new(),
            last_lap: None,
        }
    }

    pub fn tick_step(&mut self, snapshot: Option<&TelemetrySnapshot>) -> Vec<SideEffect> {
        self.tick = self.tick.next();

        let Some(snapshot) = snapshot else {
            return vec![SideEffect::ConnectionLost];
        };
        // In the garage or a replay: nothing to call out, nothing to learn.
        if !snapshot.is_on_track {
            return Vec::new();
        }

        let now = self.clock.now();
        let strategy = self.strategy.update(snapshot);
        let events = self.detector.detect_events(snapshot, &strategy);

        if self.last_lap != Some(snapshot.lap) {
            debug!(
                lap = snapshot.lap,
                position = snapshot.position,
                laps_of_fuel = strategy.laps_of_fuel,
                urgency = %strategy.urgency,
                "lap change"
            );
            self.last_lap = Some(snapshot.lap);
        }

        let dispatch = self.policy.evaluate(&events, &strategy, now);

        let mut effects = vec![SideEffect::Telemetry {
            tick: self.tick,
            snapshot: snapshot.clone(),
            strategy: strategy.clone(),
            events,
        }];

        if let Some(dispatch) = dispatch {
            debug!(reason = %dispatch.reason.label(), bypass = dispatch.bypassed_cooldown, "advisory dispatch");
            effects.push(SideEffect::RequestAdvisory(AdvisoryRequest {
                tick: self.tick,
                dispatch,
                strategy,
                snapshot: snapshot.clone(),
            }));
        }

        effects
    }

    /// New session: forget fuel history, detector state and dispatch timing.
    pub fn reset(&mut self) {
        self.strategy.reset();
        self.detector.reset();
        self.policy.reset();
        self.last_lap = None;
    }
}
