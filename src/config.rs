use crate::error::{IngestError, Result};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One labeled band of planting years. Bands are lower-inclusive and
/// upper-exclusive; the final band has no upper bound and catches every
/// later year.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EpochBand {
    /// Years strictly below this value fall into the band. `None` marks the
    /// open-ended final band.
    pub upper_before: Option<i32>,
    pub label: String,
}

/// Runtime configuration for the ingestion pipeline.
///
/// Epoch boundaries, the plausible-year range and the live timeout are
/// business parameters, not domain truths; they live here so tests can run
/// with alternate tables without touching global state.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Live geospatial feed endpoint (GeoJSON feature collection).
    #[serde(default = "default_live_url")]
    pub live_url: String,
    /// Local flat-file fallback dataset.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
    /// Attribute holding the planting year in both sources.
    #[serde(default = "default_year_field")]
    pub year_field: String,
    /// Attribute holding the geometry in both sources.
    #[serde(default = "default_geometry_field")]
    pub geometry_field: String,
    /// Bound on the single live-feed request; exceeding it triggers fallback.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Oldest planting year considered plausible.
    #[serde(default = "default_min_plausible_year")]
    pub min_plausible_year: i32,
    /// Newest planting year considered plausible. Defaults to the current
    /// calendar year (no future trees).
    #[serde(default = "default_max_plausible_year")]
    pub max_plausible_year: i32,
    /// Ordered epoch bands; must end with exactly one open-ended band.
    #[serde(default = "default_epochs")]
    pub epochs: Vec<EpochBand>,
}

fn default_live_url() -> String {
    "https://www.ogd.stadt-zuerich.ch/wfs/geoportal/Baumkataster?service=WFS&version=2.0.0&request=GetFeature&typename=baumkataster_baumstandorte&outputFormat=GeoJSON".to_string()
}

fn default_fallback_path() -> String {
    "data/gsz.baumkataster_baumstandorte.csv".to_string()
}

fn default_year_field() -> String {
    "pflanzjahr".to_string()
}

fn default_geometry_field() -> String {
    "geometry".to_string()
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_min_plausible_year() -> i32 {
    1801
}

fn default_max_plausible_year() -> i32 {
    Utc::now().year()
}

fn default_epochs() -> Vec<EpochBand> {
    vec![
        EpochBand { upper_before: Some(1950), label: "pre-1950".to_string() },
        EpochBand { upper_before: Some(1980), label: "1950–1980".to_string() },
        EpochBand { upper_before: Some(2000), label: "1980–2000".to_string() },
        EpochBand { upper_before: None, label: "post-2000".to_string() },
    ]
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            live_url: default_live_url(),
            fallback_path: default_fallback_path(),
            year_field: default_year_field(),
            geometry_field: default_geometry_field(),
            timeout_seconds: default_timeout_seconds(),
            min_plausible_year: default_min_plausible_year(),
            max_plausible_year: default_max_plausible_year(),
            epochs: default_epochs(),
        }
    }
}

impl IngestConfig {
    /// Loads configuration from a TOML file. Fields absent from the file
    /// fall back to the documented defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: IngestConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
