use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineerConfig, PromptFormat};
use crate::error::{PitwallError, Result};
use crate::kernel::event::RaceEvent;
use crate::kernel::metrics::{AdvisoryOutcome, AdvisoryRecord, AdvisoryRecorder, AdvisoryStats};
use crate::kernel::reactor::{AdvisoryRequest, Reactor, SideEffect};
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::StrategyState;
use crate::kernel::time::{Clock, Tick};
use crate::kernel::trigger::fallback_message;
use crate::metadata::Catalog;
use crate::services::advisory::{format_prompt, format_prompt_json, AdvisoryGenerator};
use crate::services::broadcast::{preview, OverlayHub, OverlayUpdate, ADVISORY_PREVIEW_CHARS, THINKING_PREVIEW_CHARS};
use crate::services::session_log::SessionLogger;
use crate::services::speech::{Enqueued, SpeechQueue};
use crate::source::{SessionInfo, TelemetrySource};

pub const STARTUP_ANNOUNCEMENT: &str = "Race strategist online. Good luck out there.";

/// Async driver around the [`Reactor`].
///
/// Polls the source once per interval, feeds the reactor and executes the
/// side effects it returns. Advisory calls are awaited inline, so at most one
/// is ever in flight and a slow generator delays the next poll.
pub struct Engine<S, G> {
    config: EngineerConfig,
    source: S,
    generator: G,
    reactor: Reactor,
    speech: SpeechQueue,
    overlay: OverlayHub,
    session_log: Option<SessionLogger>,
    metrics: AdvisoryRecorder,
    session: SessionInfo,
    catalog: Catalog,
}

impl<S: TelemetrySource, G: AdvisoryGenerator> Engine<S, G> {
    pub fn new(config: EngineerConfig, source: S, generator: G, clock: Arc<dyn Clock>) -> Self {
        let session_log = config
            .session_log
            .enabled
            .then(|| SessionLogger::new(config.session_log.directory.clone()).with_compression(config.session_log.compress));
        let catalog = match config.advisory.prompt_format {
            PromptFormat::Text => Catalog::default(),
            PromptFormat::Json => Catalog::builtin().unwrap_or_else(|e| {
                warn!("car/track catalog unreadable, prompts go without metadata: {}", e);
                Catalog::default()
            }),
        };

        Self {
            reactor: Reactor::new(&config, clock),
            speech: SpeechQueue::new(config.speech.queue_size),
            overlay: OverlayHub::new(config.engine.broadcast_capacity),
            session_log,
            metrics: AdvisoryRecorder::new(),
            session: SessionInfo::default(),
            catalog,
            config,
            source,
            generator,
        }
    }

    /// Queue the playback worker should drain.
    pub fn speech(&self) -> &SpeechQueue {
        &self.speech
    }

    pub fn overlay(&self) -> &OverlayHub {
        &self.overlay
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn advisory_stats(&self) -> AdvisoryStats {
        self.metrics.stats()
    }

    /// Runs until cancelled or the source is lost for good.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<AdvisoryStats> {
        let attempts = self.config.engine.connect_attempts;
        info!("waiting for telemetry source...");
        if !self.wait_for_connection(attempts, &cancel).await {
            if cancel.is_cancelled() {
                return Ok(self.metrics.stats());
            }
            return Err(PitwallError::SourceUnavailable { attempts });
        }

        let session = self.source.session_info();
        info!("connected. track: {} | car: {}", session.track, session.car);
        if let Some(log) = self.session_log.as_mut() {
            let id = log.start_session(&session.track, &session.car);
            info!("session log {} started", id);
        }
        self.overlay.publish(OverlayUpdate::Session {
            track: session.track.clone(),
            car: session.car.clone(),
        });
        self.session = session;
        self.speak(STARTUP_ANNOUNCEMENT, false);

        let mut cadence = tokio::time::interval(Duration::from_millis(self.config.engine.poll_interval_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        'poll: loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let snapshot = self.source.snapshot();
            for effect in self.reactor.tick_step(snapshot.as_ref()) {
                match effect {
                    SideEffect::ConnectionLost => {
                        warn!("lost telemetry source, attempting reconnect...");
                        if !self.wait_for_connection(self.config.engine.reconnect_attempts, &cancel).await {
                            warn!("could not reconnect to telemetry source");
                            break 'poll;
                        }
                        info!("reconnected");
                    }
                    SideEffect::Telemetry {
                        tick,
                        snapshot,
                        strategy,
                        events,
                    } => self.record_tick(tick, &snapshot, &strategy, &events),
                    SideEffect::RequestAdvisory(request) => self.advise(request).await,
                }
            }
        }

        Ok(self.shutdown())
    }

    async fn wait_for_connection(&mut self, attempts: u32, cancel: &CancellationToken) -> bool {
        let delay = Duration::from_millis(self.config.engine.connect_delay_ms);
        for _ in 0..attempts {
            if self.source.connect() {
                return true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        false
    }

    fn record_tick(&mut self, tick: Tick, snapshot: &TelemetrySnapshot, strategy: &StrategyState, events: &[RaceEvent]) {
        for event in events {
            debug!(tick = tick.frame, "event {} [{:?}]: {}", event.kind, event.priority, event.message);
        }
        if let Some(log) = self.session_log.as_mut() {
            log.log_telemetry(snapshot, strategy);
            log.log_events(events);
        }
        self.overlay.publish(OverlayUpdate::telemetry(snapshot, strategy, events));
    }

    /// One generator call, bounded by the advisory timeout. Any failure falls
    /// back to a locally built message; never retried.
    async fn advise(&mut self, request: AdvisoryRequest) {
        let AdvisoryRequest {
            tick,
            dispatch,
            strategy,
            snapshot,
        } = request;
        let prompt = match self.config.advisory.prompt_format {
            PromptFormat::Text => format_prompt(&strategy, &snapshot, dispatch.trigger.as_ref()),
            PromptFormat::Json => format_prompt_json(
                &strategy,
                &snapshot,
                &self.session,
                &self.catalog,
                &self.config.detector.tires,
                dispatch.trigger.as_ref(),
            ),
        };
        let reason = dispatch.reason.label();
        debug!(tick = tick.frame, "advisory requested ({})", reason);
        self.overlay.publish(OverlayUpdate::AiThinking {
            reason: reason.clone(),
            prompt_preview: preview(&prompt, THINKING_PREVIEW_CHARS),
        });

        let started = Instant::now();
        let reply = tokio::time::timeout(self.config.advisory.timeout(), self.generator.generate(&prompt)).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (text, outcome, latency_ms) = match reply {
            Ok(Ok(text)) => (text, AdvisoryOutcome::Responded, elapsed_ms),
            Ok(Err(e)) => {
                warn!(tick = tick.frame, "advisory failed ({}): {:#}", reason, e);
                (
                    fallback_message(&strategy, snapshot.position, dispatch.trigger.as_ref()),
                    AdvisoryOutcome::Failed,
                    0.0,
                )
            }
            Err(_) => {
                warn!(tick = tick.frame, "advisory timed out after {:.0}ms ({})", elapsed_ms, reason);
                (
                    fallback_message(&strategy, snapshot.position, dispatch.trigger.as_ref()),
                    AdvisoryOutcome::TimedOut,
                    0.0,
                )
            }
        };
        let fallback = outcome != AdvisoryOutcome::Responded;

        info!(tick = tick.frame, "advisory [{}]: {}", reason, text);
        self.metrics.record(AdvisoryRecord {
            outcome,
            latency_ms,
            bypassed_cooldown: dispatch.bypassed_cooldown,
        });
        self.speak(&text, dispatch.priority);
        if let Some(log) = self.session_log.as_mut() {
            log.log_advisory(&prompt, &text, latency_ms, fallback);
        }
        self.overlay.publish(OverlayUpdate::Advisory {
            text,
            urgency: strategy.urgency,
            latency_ms,
            reason,
            fallback,
            prompt_preview: preview(&prompt, ADVISORY_PREVIEW_CHARS),
        });
    }

    fn speak(&self, text: &str, priority: bool) {
        if !self.config.speech.enabled {
            return;
        }
        match self.speech.speak(text, priority) {
            Enqueued::Queued | Enqueued::Preempted => {}
            dropped => debug!("speech {:?}: '{}'", dropped, text),
        }
    }

    fn shutdown(&mut self) -> AdvisoryStats {
        if let Some(log) = self.session_log.as_mut() {
            match log.end_session() {
                Ok(Some(path)) => info!("session log written to {}", path.display()),
                Ok(None) => {}
                Err(e) => warn!("failed to write session log: {}", e),
            }
        }
        self.source.disconnect();

        let stats = self.metrics.stats();
        info!(
            dispatched = stats.dispatched,
            responded = stats.responded,
            fallbacks = stats.fallbacks(),
            critical_bypasses = stats.critical_bypasses,
            avg_latency_ms = stats.avg_latency_ms,
            max_latency_ms = stats.max_latency_ms,
            "advisory summary"
        );
        stats
    }
}
