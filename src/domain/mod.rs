use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One raw tree record in its source-native shape: a bag of attributes that
/// must contain at least a planting-year field and a geometry field. The
/// geometry value is either a structured coordinate pair (live feed) or a
/// WKT point string (fallback file); the normalizer never needs to know
/// which source produced it.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub attributes: Map<String, Value>,
}

impl RawRecord {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }
}

/// A canonical tree record. Immutable once constructed; the epoch label is
/// always derived from the planting year, never supplied by the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub planting_year: i32,
    pub epoch: String,
}

/// Why a raw record was excluded from the canonical dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingYear,
    InvalidYear,
    InvalidGeometry,
    OutOfBounds,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingYear => "missing_year",
            RejectReason::InvalidYear => "invalid_year",
            RejectReason::InvalidGeometry => "invalid_geometry",
            RejectReason::OutOfBounds => "out_of_bounds",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which upstream representation supplied this run's raw records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline's sole output artifact: accepted records in arrival order,
/// a tally of rejects by reason, and which source was authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    pub records: Vec<TreeRecord>,
    pub rejects: BTreeMap<RejectReason, u64>,
    pub source_used: DataSource,
}

impl IngestionResult {
    /// Total number of raw records that were dropped, across all reasons.
    pub fn rejected_count(&self) -> u64 {
        self.rejects.values().sum()
    }
}
