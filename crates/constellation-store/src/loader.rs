//! Data loading from comma-separated record files

use crate::{
    CandidateLink, City, CityCoverage, CityPair, ConstellationConfig, ConstellationStore, Result,
    Satellite, StoreError,
};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Input file locations for one constellation / ISL-length combination
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub input_dir: PathBuf,
    pub constellation: String,
    pub max_isl_length: String,
    pub city_pairs_file: String,
}

impl DataLayout {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        constellation: impl Into<String>,
        max_isl_length: impl Into<String>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            constellation: constellation.into(),
            max_isl_length: max_isl_length.into(),
            city_pairs_file: "city_pairs_rand_5K.txt".to_string(),
        }
    }

    pub fn with_city_pairs(mut self, file: impl Into<String>) -> Self {
        self.city_pairs_file = file.into();
        self
    }

    fn constellation_dir(&self) -> PathBuf {
        self.input_dir.join(format!("constellation_{}", self.constellation))
    }

    pub fn satellite_positions(&self) -> PathBuf {
        self.constellation_dir().join("data_sat_position").join("sat_positions_0.txt")
    }

    pub fn valid_isls(&self) -> PathBuf {
        self.constellation_dir()
            .join(format!("data_validISLs_{}", self.max_isl_length))
            .join("valid_ISLs_0.txt")
    }

    pub fn city_coverage(&self) -> PathBuf {
        self.constellation_dir().join("data_coverage").join("city_coverage_0.txt")
    }

    pub fn cities(&self) -> PathBuf {
        self.input_dir.join("data_cities").join("cities.txt")
    }

    pub fn city_pairs(&self) -> PathBuf {
        self.input_dir.join("data_cities").join(&self.city_pairs_file)
    }

    pub fn baseline(&self, file: &str) -> PathBuf {
        self.input_dir.join(file)
    }
}

/// Fixed motif used as the comparison baseline
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineConfig {
    /// Links are only placed where both endpoints are above this |latitude|
    pub lat_bottom: f64,
    pub lat_top: Option<f64>,
    /// `(orbit_offset, in_orbit_offset)` per link
    pub offsets: [(i32, i32); 2],
}

/// One parsed line: fields plus location for error reporting
struct Record<'a> {
    path: &'a Path,
    line: usize,
    fields: Vec<&'a str>,
}

impl Record<'_> {
    fn get<T>(&self, index: usize, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.fields[index].parse().map_err(|e: T::Err| StoreError::Malformed {
            path: self.path.to_path_buf(),
            line: self.line,
            reason: format!("{} {:?}: {}", what, self.fields[index], e),
        })
    }
}

fn parse_records<T>(
    path: &Path,
    text: &str,
    arity: &[usize],
    parse: impl Fn(&Record<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if !arity.contains(&fields.len()) {
            return Err(StoreError::FieldCount {
                path: path.to_path_buf(),
                line: i + 1,
                expected: arity.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" or "),
                found: fields.len(),
            });
        }
        out.push(parse(&Record {
            path,
            line: i + 1,
            fields,
        })?);
    }
    Ok(out)
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `id,orbit,in_orbit,lat_deg,lon_deg,alt_km`
pub fn load_satellites(path: impl AsRef<Path>) -> Result<Vec<Satellite>> {
    let path = path.as_ref();
    let sats = parse_records(path, &read_file(path)?, &[6], |r| {
        Ok(Satellite::new(
            r.get(0, "satellite id")?,
            r.get(1, "orbit")?,
            r.get(2, "in-orbit index")?,
            r.get(3, "latitude")?,
            r.get(4, "longitude")?,
            r.get(5, "altitude")?,
        ))
    })?;
    info!("Loaded {} satellite positions from {:?}", sats.len(), path);
    Ok(sats)
}

/// `sat_1,sat_2,length_km`
pub fn load_candidate_links(path: impl AsRef<Path>) -> Result<Vec<CandidateLink>> {
    let path = path.as_ref();
    let links = parse_records(path, &read_file(path)?, &[3], |r| {
        Ok(CandidateLink {
            sat_1: r.get(0, "satellite id")?,
            sat_2: r.get(1, "satellite id")?,
            length_km: r.get(2, "length")?,
        })
    })?;
    info!("Loaded {} candidate ISLs from {:?}", links.len(), path);
    Ok(links)
}

/// `id,name,lat_deg,lon_deg,population` or `id,lat_deg,lon_deg,population`
pub fn load_cities(path: impl AsRef<Path>) -> Result<Vec<City>> {
    let path = path.as_ref();
    let cities = parse_records(path, &read_file(path)?, &[4, 5], |r| {
        let (name, first) = if r.fields.len() == 5 {
            (r.fields[1].to_string(), 2)
        } else {
            (String::new(), 1)
        };
        Ok(City {
            id: r.get(0, "city id")?,
            name,
            lat_deg: r.get(first, "latitude")?,
            lon_deg: r.get(first + 1, "longitude")?,
            population: r.get(first + 2, "population")?,
        })
    })?;
    info!("Loaded {} cities from {:?}", cities.len(), path);
    Ok(cities)
}

/// `city,satellite,distance_km`
pub fn load_coverage(path: impl AsRef<Path>) -> Result<Vec<CityCoverage>> {
    let path = path.as_ref();
    let coverage = parse_records(path, &read_file(path)?, &[3], |r| {
        Ok(CityCoverage {
            city: r.get(0, "city id")?,
            satellite: r.get(1, "satellite id")?,
            distance_km: r.get(2, "distance")?,
        })
    })?;
    info!("Loaded {} city uplinks from {:?}", coverage.len(), path);
    Ok(coverage)
}

/// `city_1,city_2,geodesic_km`
pub fn load_city_pairs(path: impl AsRef<Path>) -> Result<Vec<CityPair>> {
    let path = path.as_ref();
    let pairs = parse_records(path, &read_file(path)?, &[3], |r| {
        Ok(CityPair {
            city_1: r.get(0, "city id")?,
            city_2: r.get(1, "city id")?,
            geodesic_km: r.get(2, "geodesic distance")?,
        })
    })?;
    info!("Loaded {} city pairs from {:?}", pairs.len(), path);
    Ok(pairs)
}

/// First line of the baseline file:
/// `lat_bottom,lat_top,o1,s1,o2,s2` or `lat_bottom,o1,s1,o2,s2`
pub fn load_baseline(path: impl AsRef<Path>) -> Result<BaselineConfig> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut configs = parse_records(path, first, &[5, 6], |r| {
        let (lat_top, o) = if r.fields.len() == 6 {
            (Some(r.get(1, "upper latitude")?), 2)
        } else {
            (None, 1)
        };
        Ok(BaselineConfig {
            lat_bottom: r.get(0, "lower latitude")?,
            lat_top,
            offsets: [
                (r.get(o, "orbit offset")?, r.get(o + 1, "in-orbit offset")?),
                (r.get(o + 2, "orbit offset")?, r.get(o + 3, "in-orbit offset")?),
            ],
        })
    })?;
    let config = configs.pop().ok_or(StoreError::Empty("baseline"))?;
    info!("Loaded baseline motif {:?} from {:?}", config, path);
    Ok(config)
}

/// Load and validate every store input named by `layout`
pub fn load_store(layout: &DataLayout, constellation: ConstellationConfig) -> Result<ConstellationStore> {
    info!("Loading inputs for {} from {:?}", constellation, layout.input_dir);
    let satellites = load_satellites(layout.satellite_positions())?;
    let links = load_candidate_links(layout.valid_isls())?;
    let cities = load_cities(layout.cities())?;
    let coverage = load_coverage(layout.city_coverage())?;
    let pairs = load_city_pairs(layout.city_pairs())?;
    ConstellationStore::new(constellation, satellites, links, cities, coverage, pairs)
}
