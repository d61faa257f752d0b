//! Session recording.
//!
//! Keeps every telemetry tick, event batch and advisory exchange of a session
//! in memory and writes them out as one JSON document when the session ends,
//! gzipped unless compression is turned off.

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::kernel::event::RaceEvent;
use crate::kernel::snapshot::TelemetrySnapshot;
use crate::kernel::strategy::StrategyState;

#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: DateTime<Local>,
    pub track: String,
    pub car: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum LogPayload {
    Telemetry {
        snapshot: Box<TelemetrySnapshot>,
        strategy: StrategyState,
    },
    Events {
        events: Vec<RaceEvent>,
    },
    Advisory {
        prompt: String,
        response: String,
        latency_ms: f64,
        fallback: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub lap: u32,
    #[serde(flatten)]
    pub payload: LogPayload,
}

#[derive(Debug, Serialize)]
struct SessionDocument<'a> {
    metadata: &'a SessionMetadata,
    events: &'a [LogEntry],
}

struct ActiveSession {
    metadata: SessionMetadata,
    entries: Vec<LogEntry>,
    current_lap: u32,
}

pub struct SessionLogger {
    directory: PathBuf,
    compress: bool,
    active: Option<ActiveSession>,
}

impl SessionLogger {
    /// Plain `.json` output; see [`SessionLogger::with_compression`].
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            compress: false,
            active: None,
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Starts a fresh session, discarding any unsaved one. Returns the short
    /// session id.
    pub fn start_session(&mut self, track: &str, car: &str) -> String {
        let mut session_id = Uuid::new_v4().simple().to_string();
        session_id.truncate(8);

        self.active = Some(ActiveSession {
            metadata: SessionMetadata {
                session_id: session_id.clone(),
                start_time: Local::now(),
                track: track.to_string(),
                car: car.to_string(),
            },
            entries: Vec::new(),
            current_lap: 0,
        });
        session_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.metadata.session_id.as_str())
    }

    pub fn entry_count(&self) -> usize {
        self.active.as_ref().map_or(0, |s| s.entries.len())
    }

    pub fn log_telemetry(&mut self, snapshot: &TelemetrySnapshot, strategy: &StrategyState) {
        if let Some(session) = self.active.as_mut() {
            session.current_lap = snapshot.lap;
        }
        self.push(LogPayload::Telemetry {
            snapshot: Box::new(snapshot.clone()),
            strategy: strategy.clone(),
        });
    }

    pub fn log_events(&mut self, events: &[RaceEvent]) {
        if events.is_empty() {
            return;
        }
        self.push(LogPayload::Events { events: events.to_vec() });
    }

    pub fn log_advisory(&mut self, prompt: &str, response: &str, latency_ms: f64, fallback: bool) {
        self.push(LogPayload::Advisory {
            prompt: prompt.to_string(),
            response: response.to_string(),
            latency_ms,
            fallback,
        });
    }

    /// Writes the session out. `Ok(None)` when no session was active.
    pub fn end_session(&mut self) -> Result<Option<PathBuf>> {
        let Some(session) = self.active.take() else {
            return Ok(None);
        };

        fs::create_dir_all(&self.directory)?;
        let stem = session.metadata.start_time.format("%Y-%m-%d_%H-%M-%S-%6f");
        let extension = if self.compress { "json.gz" } else { "json" };
        let path = self.directory.join(format!("{}.{}", stem, extension));

        let document = SessionDocument {
            metadata: &session.metadata,
            events: &session.entries,
        };
        let file = BufWriter::new(File::create(&path)?);
        if self.compress {
            let mut encoder = GzEncoder::new(file, Compression::default());
            serde_json::to_writer(&mut encoder, &document)?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            serde_json::to_writer_pretty(&mut file, &document)?;
            file.flush()?;
        }

        info!(
            "session {} saved: {} entries -> {}",
            session.metadata.session_id,
            session.entries.len(),
            path.display()
        );
        Ok(Some(path))
    }

    fn push(&mut self, payload: LogPayload) {
        // Silently ignored outside a session.
        if let Some(session) = self.active.as_mut() {
            session.entries.push(LogEntry {
                timestamp: Local::now(),
                lap: session.current_lap,
                payload,
            });
        }
    }
}
