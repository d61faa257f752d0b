//! Car and track reference data.
//!
//! Sim names are matched case-insensitively against a list of aliases: an
//! exact alias wins, otherwise the first alias that contains the name (or is
//! contained in it) in catalog order.

use serde::{Deserialize, Serialize};

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarInfo {
    pub key: String,
    pub name: String,
    pub class: String,
    pub power: String,
    pub braking: String,
    pub aero: String,
    pub tire_deg: String,
    pub traits: Vec<String>,
    pub advice_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCorner {
    /// Lap fraction, 0.0..1.0.
    pub pct: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub key: String,
    pub name: String,
    pub full_name: String,
    #[serde(rename = "type")]
    pub track_type: String,
    pub tire_stress: String,
    pub braking_severity: String,
    pub fuel_consumption: String,
    pub characteristics: String,
    #[serde(default)]
    pub key_corners: Vec<KeyCorner>,
}

impl TrackInfo {
    /// Nearest corner at or after `lap_pct`, wrapping to the first corner of
    /// the lap once past the last one.
    pub fn upcoming_corner(&self, lap_pct: f64) -> Option<&str> {
        let by_pct = |a: &&KeyCorner, b: &&KeyCorner| a.pct.total_cmp(&b.pct);
        self.key_corners
            .iter()
            .filter(|c| c.pct >= lap_pct)
            .min_by(by_pct)
            .or_else(|| self.key_corners.iter().min_by(by_pct))
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Alias {
    alias: String,
    key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    cars: Vec<CarInfo>,
    tracks: Vec<TrackInfo>,
    car_aliases: Vec<Alias>,
    track_aliases: Vec<Alias>,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, serde_json::Error> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut catalog: Self = serde_json::from_str(text)?;
        for alias in catalog.car_aliases.iter_mut().chain(catalog.track_aliases.iter_mut()) {
            alias.alias = alias.alias.to_lowercase();
        }
        Ok(catalog)
    }

    pub fn cars(&self) -> &[CarInfo] {
        &self.cars
    }

    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    pub fn car_key(&self, sim_name: &str) -> Option<&str> {
        resolve(&self.car_aliases, sim_name)
    }

    pub fn track_key(&self, sim_name: &str) -> Option<&str> {
        resolve(&self.track_aliases, sim_name)
    }

    pub fn car(&self, sim_name: &str) -> Option<&CarInfo> {
        let key = self.car_key(sim_name)?;
        self.cars.iter().find(|c| c.key == key)
    }

    pub fn track(&self, sim_name: &str) -> Option<&TrackInfo> {
        let key = self.track_key(sim_name)?;
        self.track_by_key(key)
    }

    pub fn track_by_key(&self, key: &str) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.key == key)
    }

    /// `None` for unknown tracks and tracks without key corners.
    pub fn upcoming_corner(&self, track_key: &str, lap_pct: f64) -> Option<&str> {
        self.track_by_key(track_key)?.upcoming_corner(lap_pct)
    }
}

fn resolve<'a>(aliases: &'a [Alias], sim_name: &str) -> Option<&'a str> {
    let name = sim_name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    aliases
        .iter()
        .find(|a| a.alias == name)
        .or_else(|| {
            aliases
                .iter()
                .find(|a| name.contains(a.alias.as_str()) || a.alias.contains(name.as_str()))
        })
        .map(|a| a.key.as_str())
}

