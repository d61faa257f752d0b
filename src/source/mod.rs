//! Where snapshots come from.
//!
//! A live sim binding implements [`TelemetrySource`] by polling its shared
//! memory. [`ReplaySource`] plays a recorded session back, one snapshot per
//! poll, so the whole pipeline can run without the sim.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PitwallError, Result};
use crate::kernel::snapshot::TelemetrySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub track: String,
    pub car: String,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            track: "Unknown Track".to_string(),
            car: "Unknown Car".to_string(),
        }
    }
}

pub trait TelemetrySource: Send {
    /// Returns true once the source is producing data.
    fn connect(&mut self) -> bool;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// `None` means the source has gone away.
    fn snapshot(&mut self) -> Option<TelemetrySnapshot>;
    fn session_info(&self) -> SessionInfo;
}

/// Recorded session played back one snapshot per poll.
///
/// File format: one JSON snapshot per line. A line `{"track": .., "car": ..}`
/// before the first snapshot sets the session info. Blank lines and lines
/// starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    info: SessionInfo,
    pending: VecDeque<TelemetrySnapshot>,
    connected: bool,
    origin: Option<PathBuf>,
}

impl ReplaySource {
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = TelemetrySnapshot>) -> Self {
        Self {
            info: SessionInfo::default(),
            pending: snapshots.into_iter().collect(),
            connected: false,
            origin: None,
        }
    }

    pub fn with_session_info(mut self, info: SessionInfo) -> Self {
        self.info = info;
        self
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PitwallError::Replay {
            path: path.to_path_buf(),
            source,
        })?;
        let mut replay = Self::parse(&text)?;
        replay.origin = Some(path.to_path_buf());
        info!("loaded {} snapshots from {}", replay.remaining(), path.display());
        Ok(replay)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut info = SessionInfo::default();
        let mut pending = VecDeque::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if pending.is_empty() {
                if let Ok(header) = serde_json::from_str::<SessionHeader>(line) {
                    info = SessionInfo {
                        track: header.track,
                        car: header.car,
                    };
                    continue;
                }
            }
            let snapshot = serde_json::from_str(line).map_err(|source| PitwallError::ReplayParse {
                line: index + 1,
                source,
            })?;
            pending.push_back(snapshot);
        }

        Ok(Self {
            info,
            pending,
            connected: false,
            origin: None,
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionHeader {
    track: String,
    car: String,
}

impl TelemetrySource for ReplaySource {
    fn connect(&mut self) -> bool {
        self.connected = !self.pending.is_empty();
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn snapshot(&mut self) -> Option<TelemetrySnapshot> {
        if !self.connected {
            return None;
        }
        let next = self.pending.pop_front();
        if next.is_none() {
            self.connected = false;
        }
        next
    }

    fn session_info(&self) -> SessionInfo {
        self.info.clone()
    }
}
