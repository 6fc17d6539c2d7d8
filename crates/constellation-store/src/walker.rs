//! Constellation presets and Walker-delta geometry

use crate::{Result, Satellite, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Orbit grid of a named constellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstellationConfig {
    pub name: String,
    pub orbits: u32,
    pub satellites_per_orbit: u32,
}

impl ConstellationConfig {
    pub fn new(name: impl Into<String>, orbits: u32, satellites_per_orbit: u32) -> Self {
        Self {
            name: name.into(),
            orbits,
            satellites_per_orbit,
        }
    }

    /// Resolve one of the known constellation identifiers
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "40_40_53deg" => Ok(Self::new(name, 40, 40)),
            "kuiper_p1" => Ok(Self::new(name, 34, 34)),
            "starlink_p1" => Ok(Self::new(name, 24, 66)),
            other => Err(StoreError::UnknownConstellation(other.to_string())),
        }
    }

    pub fn total_satellites(&self) -> u32 {
        self.orbits * self.satellites_per_orbit
    }
}

impl FromStr for ConstellationConfig {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for ConstellationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.orbits, self.satellites_per_orbit)
    }
}

/// Walker-delta constellation `i: T/P/F` on circular orbits
#[derive(Debug, Clone)]
pub struct WalkerDelta {
    pub planes: u32,
    pub satellites_per_plane: u32,
    pub phasing: u32,
    pub altitude_km: f64,
    pub inclination_deg: f64,
}

impl WalkerDelta {
    pub fn new(
        planes: u32,
        satellites_per_plane: u32,
        phasing: u32,
        altitude_km: f64,
        inclination_deg: f64,
    ) -> Self {
        Self {
            planes,
            satellites_per_plane,
            phasing,
            altitude_km,
            inclination_deg,
        }
    }

    pub fn total_satellites(&self) -> u32 {
        self.planes * self.satellites_per_plane
    }

    pub fn plane_spacing_deg(&self) -> f64 {
        360.0 / self.planes as f64
    }

    pub fn in_plane_spacing_deg(&self) -> f64 {
        360.0 / self.satellites_per_plane as f64
    }

    pub fn config(&self, name: impl Into<String>) -> ConstellationConfig {
        ConstellationConfig::new(name, self.planes, self.satellites_per_plane)
    }

    /// Sub-satellite points at epoch on a non-rotating spherical Earth.
    ///
    /// Satellite `id = plane * satellites_per_plane + slot`.
    pub fn satellites(&self) -> Vec<Satellite> {
        let inc = self.inclination_deg.to_radians();
        let phase_step = 360.0 * self.phasing as f64 / self.total_satellites() as f64;
        let mut sats = Vec::with_capacity(self.total_satellites() as usize);

        for plane in 0..self.planes {
            let raan = plane as f64 * self.plane_spacing_deg();
            for slot in 0..self.satellites_per_plane {
                let u = (slot as f64 * self.in_plane_spacing_deg() + plane as f64 * phase_step).to_radians();
                let lat = (inc.sin() * u.sin()).asin().to_degrees();
                let lon = normalize_lon((inc.cos() * u.sin()).atan2(u.cos()).to_degrees() + raan);
                sats.push(Satellite::new(
                    plane * self.satellites_per_plane + slot,
                    plane,
                    slot,
                    lat,
                    lon,
                    self.altitude_km,
                ));
            }
        }
        sats
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}
