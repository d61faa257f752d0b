//! Engine configuration.
//!
//! Loaded once at startup and handed around by reference; nothing in the
//! kernel mutates it. Every field has a default, so a partial (or empty) JSON
//! file behaves exactly like the defaults for whatever it omits.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::kernel::event::EventKind;

pub const CONFIG_PATH_ENV: &str = "PITWALL_CONFIG";
pub const LLM_URL_ENV: &str = "PITWALL_LLM_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineerConfig {
    pub strategy: StrategyConfig,
    pub detector: DetectorConfig,
    pub advisory: AdvisoryConfig,
    pub speech: SpeechConfig,
    pub session_log: SessionLogConfig,
    pub overlay: OverlayConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub fuel_warning_laps: f64,
    pub fuel_critical_laps: f64,
    pub tire_warning_pct: f64,
    pub tire_critical_pct: f64,
    /// Laps that burn less than this are in/out laps or cautions and are
    /// left out of the fuel average.
    pub min_fuel_per_lap: f64,
    pub fuel_window_laps: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fuel_warning_laps: 5.0,
            fuel_critical_laps: 2.0,
            tire_warning_pct: 70.0,
            tire_critical_pct: 85.0,
            min_fuel_per_lap: 0.5,
            fuel_window_laps: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub position: PositionConfig,
    pub gap: GapConfig,
    pub tires: TireTempConfig,
    pub pace: PaceConfig,
    pub progress: ProgressConfig,
    pub callouts: CalloutConfig,
    pub cooldowns: CooldownConfig,
    /// Routine update every N laps; 0 disables it.
    pub periodic_update_laps: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            position: PositionConfig::default(),
            gap: GapConfig::default(),
            tires: TireTempConfig::default(),
            pace: PaceConfig::default(),
            progress: ProgressConfig::default(),
            callouts: CalloutConfig::default(),
            cooldowns: CooldownConfig::default(),
            periodic_update_laps: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub settle_time_sec: f64,
    /// Position changes before this lap are tracked silently (grid shuffle).
    pub min_lap: u32,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self { settle_time_sec: 5.0, min_lap: 2 }
    }
}

/// Gap thresholds, seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub close_sec: f64,
    pub battle_sec: f64,
    pub safe_sec: f64,
    pub dirty_air_sec: f64,
    pub clean_air_sec: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            close_sec: 1.5,
            battle_sec: 0.8,
            safe_sec: 3.0,
            dirty_air_sec: 1.5,
            clean_air_sec: 2.5,
        }
    }
}

/// Tire surface temperature thresholds, °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireTempConfig {
    pub cold_c: f64,
    /// Bounds of the working window reported to the advisory model.
    pub optimal_low_c: f64,
    pub optimal_high_c: f64,
    pub hot_c: f64,
    /// Tick-to-tick rise that reads as a lockup (fronts) or wheelspin (rears).
    pub spike_delta_c: f64,
}

impl Default for TireTempConfig {
    fn default() -> Self {
        Self {
            cold_c: 60.0,
            optimal_low_c: 80.0,
            optimal_high_c: 100.0,
            hot_c: 110.0,
            spike_delta_c: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceConfig {
    pub trend_laps: usize,
    pub drop_threshold_sec: f64,
    pub gain_threshold_sec: f64,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            trend_laps: 3,
            drop_threshold_sec: 0.5,
            gain_threshold_sec: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub enabled: bool,
    pub halfway_callout: bool,
    pub laps_remaining_callouts: Vec<u32>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            halfway_callout: true,
            laps_remaining_callouts: vec![5, 3, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalloutConfig {
    pub position: bool,
    pub incidents: bool,
    pub flags: bool,
    pub pit_entry: bool,
    pub pit_exit: bool,
    pub personal_best: bool,
}

impl Default for CalloutConfig {
    fn default() -> Self {
        Self {
            position: true,
            incidents: true,
            flags: true,
            pit_entry: true,
            pit_exit: true,
            personal_best: true,
        }
    }
}

/// Per-kind cooldowns, seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub position: f64,
    pub gap: f64,
    pub tire_temp: f64,
    pub pace: f64,
    pub spike: f64,
    pub personal_best: f64,
    /// Repeat interval for critical strategy events while urgency stays
    /// critical. The transition into critical ignores it.
    pub strategy: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            position: 10.0,
            gap: 15.0,
            tire_temp: 30.0,
            pace: 60.0,
            spike: 5.0,
            personal_best: 30.0,
            strategy: 30.0,
        }
    }
}

impl CooldownConfig {
    /// Cooldown for a kind, or `None` for edge-triggered kinds that are not
    /// cooldown gated.
    pub fn for_kind(&self, kind: EventKind) -> Option<f64> {
        use EventKind::*;
        match kind {
            PositionGained | PositionLost => Some(self.position),
            GapClosing | GapDefend | GapSafe | DirtyAir | CleanAir => Some(self.gap),
            TireCold | TireHot => Some(self.tire_temp),
            Lockup | Wheelspin => Some(self.spike),
            PaceDropping | PaceImproving => Some(self.pace),
            PersonalBest => Some(self.personal_best),
            FuelCritical | TireWearCritical => Some(self.strategy),
            TireOptimal | RaceHalfway | LapsRemaining | FinalLap | YellowFlag | GreenFlag
            | Incident | PitEntry | PitExit | FuelWarning | TireWearWarning
            | PeriodicUpdate => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Base URL of an OpenAI-compatible server.
    pub endpoint: String,
    pub model: Option<String>,
    pub timeout_sec: f64,
    /// Minimum spacing between non-critical advisory requests.
    pub cooldown_sec: f64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt_format: PromptFormat,
}

/// Shape of the situation handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    /// Compact key-value lines.
    #[default]
    Text,
    /// One JSON object, enriched with car and track metadata.
    Json,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1".to_string(),
            model: None,
            timeout_sec: 10.0,
            cooldown_sec: 10.0,
            max_tokens: 100,
            temperature: 0.7,
            prompt_format: PromptFormat::Text,
        }
    }
}

impl AdvisoryConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Falls back to [`Self::DEFAULT_TIMEOUT`] when `timeout_sec` is not a
    /// representable duration; `validate` rejects such configs up front.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_sec).unwrap_or(Self::DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Program that speaks its final argument, e.g. `say` or a piper wrapper.
    pub program: String,
    pub args: Vec<String>,
    pub queue_size: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "say".to_string(),
            args: Vec::new(),
            queue_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLogConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    /// Write `.json.gz` instead of plain `.json`.
    pub compress: bool,
}

impl Default for SessionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("./data/sessions"),
            compress: true,
        }
    }
}

/// Websocket feed for the browser overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 8080,
        }
    }
}

impl OverlayConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_ms: u64,
    pub connect_attempts: u32,
    pub reconnect_attempts: u32,
    pub connect_delay_ms: u64,
    pub broadcast_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            connect_attempts: 60,
            reconnect_attempts: 10,
            connect_delay_ms: 1000,
            broadcast_capacity: 64,
        }
    }
}

impl EngineerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// File named by `PITWALL_CONFIG` if set (defaults otherwise), then
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(LLM_URL_ENV) {
            config.advisory.endpoint = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        if s.fuel_critical_laps >= s.fuel_warning_laps {
            return invalid("strategy.fuel_critical_laps must be below fuel_warning_laps");
        }
        if s.tire_critical_pct <= s.tire_warning_pct {
            return invalid("strategy.tire_critical_pct must be above tire_warning_pct");
        }
        if s.fuel_window_laps == 0 {
            return invalid("strategy.fuel_window_laps must be at least 1");
        }

        let g = &self.detector.gap;
        if !(g.battle_sec < g.close_sec && g.close_sec < g.safe_sec) {
            return invalid("detector.gap requires battle_sec < close_sec < safe_sec");
        }
        if g.dirty_air_sec >= g.clean_air_sec {
            return invalid("detector.gap.dirty_air_sec must be below clean_air_sec");
        }

        let t = &self.detector.tires;
        if !(t.cold_c <= t.optimal_low_c && t.optimal_low_c <= t.optimal_high_c && t.optimal_high_c <= t.hot_c) {
            return invalid("detector.tires thresholds must be ordered cold <= optimal_low <= optimal_high <= hot");
        }
        if t.spike_delta_c <= 0.0 {
            return invalid("detector.tires.spike_delta_c must be positive");
        }

        let trend_laps = self.detector.pace.trend_laps;
        let too_long = trend_laps
            .checked_mul(2)
            .map_or(true, |window| window > crate::kernel::detector::LAP_HISTORY);
        if trend_laps == 0 || too_long {
            return invalid("detector.pace.trend_laps must be between 1 and half the lap history");
        }

        let timeout_sec = self.advisory.timeout_sec;
        if timeout_sec <= 0.0 || Duration::try_from_secs_f64(timeout_sec).is_err() {
            return invalid("advisory.timeout_sec must be a positive, finite number of seconds");
        }
        if self.speech.queue_size == 0 {
            return invalid("speech.queue_size must be at least 1");
        }
        if self.overlay.enabled && self.overlay.host.trim().is_empty() {
            return invalid("overlay.host must not be empty");
        }
        if self.engine.poll_interval_ms == 0 {
            return invalid("engine.poll_interval_ms must be positive");
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(msg.to_string()))
}
