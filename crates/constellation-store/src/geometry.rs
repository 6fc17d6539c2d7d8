//! Earth-centred cartesian projection and chord lengths
//!
//! ISL and uplink lengths are straight-line chords between two points given
//! as latitude / longitude / altitude over a spherical Earth.

use crate::{CandidateLink, City, CityCoverage, Satellite};
use nalgebra::Vector3;

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Project a geodetic point onto Earth-centred cartesian axes.
///
/// Axis convention: `y` points to the north pole, `z` to (0°, 0°).
pub fn to_cartesian(lat_rad: f64, lon_rad: f64, alt_km: f64) -> Vector3<f64> {
    let r = EARTH_RADIUS_KM + alt_km;
    Vector3::new(
        r * lat_rad.cos() * lon_rad.sin(),
        r * lat_rad.sin(),
        r * lat_rad.cos() * lon_rad.cos(),
    )
}

impl Satellite {
    pub fn cartesian(&self) -> Vector3<f64> {
        to_cartesian(self.lat_rad, self.lon_rad, self.alt_km)
    }
}

impl City {
    pub fn cartesian(&self) -> Vector3<f64> {
        to_cartesian(self.lat_deg.to_radians(), self.lon_deg.to_radians(), 0.0)
    }
}

/// Chord length between two satellites (km)
pub fn isl_length_km(a: &Satellite, b: &Satellite) -> f64 {
    (a.cartesian() - b.cartesian()).norm()
}

/// All satellite pairs no further apart than `max_km`.
///
/// Each pair is listed once, lower id first.
pub fn candidate_links(satellites: &[Satellite], max_km: f64) -> Vec<CandidateLink> {
    let positions: Vec<Vector3<f64>> = satellites.iter().map(Satellite::cartesian).collect();
    let mut links = Vec::new();
    for i in 0..satellites.len() {
        for j in (i + 1)..satellites.len() {
            let length_km = (positions[i] - positions[j]).norm();
            if length_km <= max_km {
                let (lo, hi) = if satellites[i].id < satellites[j].id { (i, j) } else { (j, i) };
                links.push(CandidateLink {
                    sat_1: satellites[lo].id,
                    sat_2: satellites[hi].id,
                    length_km,
                });
            }
        }
    }
    links
}

/// Every city → satellite uplink no longer than `max_km`
pub fn city_coverage(cities: &[City], satellites: &[Satellite], max_km: f64) -> Vec<CityCoverage> {
    let mut coverage = Vec::new();
    for city in cities {
        let ground = city.cartesian();
        for sat in satellites {
            let distance_km = (ground - sat.cartesian()).norm();
            if distance_km <= max_km {
                coverage.push(CityCoverage {
                    city: city.id,
                    satellite: sat.id,
                    distance_km,
                });
            }
        }
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_zero_length() {
        let a = Satellite::new(0, 0, 0, 53.0, 12.0, 550.0);
        assert!(isl_length_km(&a, &a.clone()).abs() < 1e-9);
    }

    #[test]
    fn test_antipodal_length() {
        let a = Satellite::new(0, 0, 0, 0.0, 0.0, 550.0);
        let b = Satellite::new(1, 0, 1, 0.0, 180.0, 550.0);
        let expected = 2.0 * (EARTH_RADIUS_KM + 550.0);
        assert!((isl_length_km(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_quarter_turn_length() {
        // 90° apart on the equator: chord = r * sqrt(2)
        let a = Satellite::new(0, 0, 0, 0.0, 0.0, 0.0);
        let b = Satellite::new(1, 0, 1, 0.0, 90.0, 0.0);
        let expected = EARTH_RADIUS_KM * 2f64.sqrt();
        assert!((isl_length_km(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pole_on_y_axis() {
        let p = to_cartesian(90f64.to_radians(), 0.0, 0.0);
        assert!((p.y - EARTH_RADIUS_KM).abs() < 1e-9);
        assert!(p.x.abs() < 1e-9 && p.z.abs() < 1e-6);
    }

    #[test]
    fn test_candidate_links_threshold() {
        let sats = vec![
            Satellite::new(0, 0, 0, 0.0, 0.0, 550.0),
            Satellite::new(1, 0, 1, 0.0, 10.0, 550.0),
            Satellite::new(2, 0, 2, 0.0, 90.0, 550.0),
        ];
        let links = candidate_links(&sats, 2000.0);
        assert_eq!(links.len(), 1);
        assert_eq!((links[0].sat_1, links[0].sat_2), (0, 1));
    }

    #[test]
    fn test_city_coverage_threshold() {
        let sats = vec![
            Satellite::new(0, 0, 0, 0.0, 0.0, 550.0),
            Satellite::new(1, 0, 1, 0.0, 90.0, 550.0),
        ];
        let cities = vec![City { id: 7, name: "Null Island".into(), lat_deg: 0.0, lon_deg: 0.0, population: 1.0 }];
        let coverage = city_coverage(&cities, &sats, 1000.0);
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].satellite, 0);
        assert!((coverage[0].distance_km - 550.0).abs() < 1e-6);
    }
}
