use crate::config::IngestConfig;
use crate::domain::{DataSource, RawRecord};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Response from one live-feed request.
#[derive(Clone, Debug)]
pub struct FeedResponse {
    pub status: u16,
    pub body: String,
}

/// Port for the live geospatial feed, so tests can stub success and failure
/// without a network.
#[async_trait]
pub trait LiveFeedPort: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<FeedResponse, String>;
}

/// Reqwest-backed live feed client with a bounded request timeout.
pub struct ReqwestFeed {
    client: reqwest::Client,
}

impl ReqwestFeed {
    pub fn new(timeout: Duration) -> Result<Self> {
        // The upstream endpoint blocks the default client agent.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LiveFeedPort for ReqwestFeed {
    async fn get(&self, url: &str) -> std::result::Result<FeedResponse, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        Ok(FeedResponse { status, body })
    }
}

/// States of one load attempt. Exactly one source is authoritative per run;
/// there is a single live attempt and a single fallback attempt, never a
/// retry loop or a merge of both sources.
enum LoaderState {
    AttemptLive,
    AttemptFallback { live_error: String },
    Done { records: Vec<RawRecord>, source: DataSource },
    Fatal { live_error: String, fallback_error: String },
}

/// Resolves which upstream representation supplies this run's raw records:
/// the live feed when reachable and well-formed, otherwise the local
/// flat-file fallback.
pub struct SourceLoader {
    config: IngestConfig,
    feed: Box<dyn LiveFeedPort>,
}

impl SourceLoader {
    pub fn new(config: IngestConfig) -> Result<Self> {
        let feed = ReqwestFeed::new(Duration::from_secs(config.timeout_seconds))?;
        Ok(Self { config, feed: Box::new(feed) })
    }

    /// Injects an alternate live-feed client (used by tests).
    pub fn with_feed(config: IngestConfig, feed: Box<dyn LiveFeedPort>) -> Self {
        Self { config, feed }
    }

    /// Drives the loader state machine to a terminal state and returns the
    /// raw records plus which source produced them.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(Vec<RawRecord>, DataSource)> {
        let mut state = LoaderState::AttemptLive;
        loop {
            state = match state {
                LoaderState::AttemptLive => match self.attempt_live().await {
                    Ok(records) => LoaderState::Done { records, source: DataSource::Live },
                    Err(live_error) => {
                        warn!(error = %live_error, "Live feed unavailable, falling back to local file");
                        LoaderState::AttemptFallback { live_error }
                    }
                },
                LoaderState::AttemptFallback { live_error } => match self.attempt_fallback() {
                    Ok(records) => LoaderState::Done { records, source: DataSource::Fallback },
                    Err(fallback_error) => LoaderState::Fatal { live_error, fallback_error },
                },
                LoaderState::Done { records, source } => {
                    info!(source = %source, records = records.len(), "Raw records loaded");
                    return Ok((records, source));
                }
                LoaderState::Fatal { live_error, fallback_error } => {
                    return Err(IngestError::SourceExhausted(format!(
                        "live: {}; fallback: {}",
                        live_error, fallback_error
                    )));
                }
            };
        }
    }

    async fn attempt_live(&self) -> std::result::Result<Vec<RawRecord>, String> {
        let response = self.feed.get(&self.config.live_url).await?;
        if !(200..300).contains(&response.status) {
            return Err(format!("server answered with status {}", response.status));
        }
        parse_feature_collection(&response.body, &self.config.geometry_field)
    }

    fn attempt_fallback(&self) -> std::result::Result<Vec<RawRecord>, String> {
        let content = fs::read_to_string(&self.config.fallback_path)
            .map_err(|e| format!("cannot read '{}': {}", self.config.fallback_path, e))?;
        parse_delimited(&content, &self.config.year_field, &self.config.geometry_field)
    }
}

/// Parses a GeoJSON-style feature collection into raw records. Each
/// feature's properties become the attribute map and its geometry value is
/// attached under the configured geometry field, structured shape intact.
/// A body without a non-empty `features` array is malformed and counts as a
/// live-source failure, not a record-level defect.
fn parse_feature_collection(
    body: &str,
    geometry_field: &str,
) -> std::result::Result<Vec<RawRecord>, String> {
    let document: Value =
        serde_json::from_str(body).map_err(|e| format!("malformed response body: {}", e))?;
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no 'features' array".to_string())?;
    if features.is_empty() {
        return Err("response contains an empty feature collection".to_string());
    }

    let mut records = Vec::with_capacity(features.len());
    for feature in features {
        let mut attributes = match feature.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            // Defects below the collection level stay record-level: the
            // normalizer rejects them one by one.
            _ => Map::new(),
        };
        attributes.insert(
            geometry_field.to_string(),
            feature.get("geometry").cloned().unwrap_or(Value::Null),
        );
        records.push(RawRecord::new(attributes));
    }
    Ok(records)
}

/// Parses the delimited fallback file. The header must name both configured
/// columns; data rows keep every field as a string attribute and the
/// normalizer does all coercion and validation.
fn parse_delimited(
    content: &str,
    year_field: &str,
    geometry_field: &str,
) -> std::result::Result<Vec<RawRecord>, String> {
    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| "fallback file is empty".to_string())?;
    let columns = split_row(header);

    let year_idx = columns
        .iter()
        .position(|c| c == year_field)
        .ok_or_else(|| format!("fallback file has no '{}' column", year_field))?;
    let geometry_idx = columns
        .iter()
        .position(|c| c == geometry_field)
        .ok_or_else(|| format!("fallback file has no '{}' column", geometry_field))?;

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_row(line);
        let mut attributes = Map::new();
        attributes.insert(year_field.to_string(), field_value(&fields, year_idx));
        attributes.insert(geometry_field.to_string(), field_value(&fields, geometry_idx));
        records.push(RawRecord::new(attributes));
    }
    Ok(records)
}

fn field_value(fields: &[String], index: usize) -> Value {
    match fields.get(index) {
        Some(s) if !s.is_empty() => Value::String(s.clone()),
        _ => Value::Null,
    }
}

/// Splits one comma-delimited row, honoring double-quoted fields (the
/// geometry column is usually quoted because WKT contains spaces).
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}
