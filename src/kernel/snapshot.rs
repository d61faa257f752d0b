use serde::{Deserialize, Serialize};
use std::fmt;

/// Session flag bits as reported by the sim.
pub const FLAG_YELLOW: u32 = 0x0008;
pub const FLAG_CAUTION: u32 = 0x4000;
pub const FLAG_CAUTION_WAVING: u32 = 0x8000;

/// Any of these bits means the field is under yellow.
pub const YELLOW_MASK: u32 = FLAG_YELLOW | FLAG_CAUTION | FLAG_CAUTION_WAVING;

/// Timed sessions report a huge laps-remaining count; anything at or
/// above this is treated as "not lap limited".
pub const UNLIMITED_LAPS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Corner {
    #[serde(rename = "LF")]
    LeftFront,
    #[serde(rename = "RF")]
    RightFront,
    #[serde(rename = "LR")]
    LeftRear,
    #[serde(rename = "RR")]
    RightRear,
}

impl Corner {
    /// Declaration order doubles as the tie-break order wherever one corner
    /// has to be picked out of several equal readings.
    pub const ALL: [Corner; 4] = [
        Corner::LeftFront,
        Corner::RightFront,
        Corner::LeftRear,
        Corner::RightRear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Corner::LeftFront => "LF",
            Corner::RightFront => "RF",
            Corner::LeftRear => "LR",
            Corner::RightRear => "RR",
        }
    }

    pub fn is_front(self) -> bool {
        matches!(self, Corner::LeftFront | Corner::RightFront)
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per wheel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Corners<T> {
    pub lf: T,
    pub rf: T,
    pub lr: T,
    pub rr: T,
}

impl<T: Copy> Corners<T> {
    pub fn new(lf: T, rf: T, lr: T, rr: T) -> Self {
        Self { lf, rf, lr, rr }
    }

    pub fn uniform(value: T) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn get(&self, corner: Corner) -> T {
        match corner {
            Corner::LeftFront => self.lf,
            Corner::RightFront => self.rf,
            Corner::LeftRear => self.lr,
            Corner::RightRear => self.rr,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Corner, T)> + '_ {
        Corner::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Corners<U> {
        Corners::new(f(self.lf), f(self.rf), f(self.lr), f(self.rr))
    }
}

/// Surface temperature samples across one tire: inner, middle, outer (°C).
pub type TireSurface = [f64; 3];

/// One immutable reading of every telemetry channel the engineer uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    pub lap: u32,
    /// Fraction of the current lap completed, in [0, 1).
    pub lap_pct: f64,
    pub position: u32,

    pub fuel_level: f64,
    pub fuel_level_pct: f64,
    pub fuel_use_per_hour: f64,

    /// Percent worn, 0 = new, 100 = gone.
    pub tire_wear: Corners<f64>,
    pub tire_temps: Corners<TireSurface>,
    /// kPa.
    pub tire_pressure: Corners<f64>,
    /// Brake line pressure, kPa.
    pub brake_pressure: Corners<f64>,

    /// `None` when there is no car ahead/behind.
    pub gap_ahead_sec: Option<f64>,
    pub gap_behind_sec: Option<f64>,

    pub last_lap_time: f64,
    pub best_lap_time: f64,
    pub lap_delta_to_best: f64,

    pub session_laps_remain: u32,
    pub session_time_remain: f64,

    pub on_pit_road: bool,
    pub is_on_track: bool,
    pub session_flags: u32,
    pub incident_count: u32,

    pub track_temp_c: f64,
    pub air_temp_c: f64,
}

impl TelemetrySnapshot {
    /// Mean of the three surface samples per corner.
    pub fn average_tire_temps(&self) -> Corners<f64> {
        self.tire_temps.map(|[inner, middle, outer]| (inner + middle + outer) / 3.0)
    }

    pub fn is_yellow(&self) -> bool {
        self.session_flags & YELLOW_MASK != 0
    }

    /// Laps remaining, if the session is lap limited.
    pub fn laps_remaining(&self) -> Option<u32> {
        (self.session_laps_remain < UNLIMITED_LAPS).then_some(self.session_laps_remain)
    }
}
