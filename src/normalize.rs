use crate::config::IngestConfig;
use crate::domain::{RawRecord, RejectReason, TreeRecord};
use crate::epoch::EpochTable;
use crate::error::Result;
use crate::geometry;
use serde_json::Value;

/// Longitude/latitude bounds for a canonical record (WGS84 degrees).
const LON_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;
const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Turns raw source-shaped records into canonical [`TreeRecord`]s.
///
/// This is the single code path both sources funnel through. It never
/// branches on which source supplied a record, only on the shape of the
/// geometry value, and that dispatch lives entirely in [`geometry`].
pub struct Normalizer {
    year_field: String,
    geometry_field: String,
    min_year: i32,
    max_year: i32,
    epochs: EpochTable,
}

impl Normalizer {
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Ok(Self {
            year_field: config.year_field.clone(),
            geometry_field: config.geometry_field.clone(),
            min_year: config.min_plausible_year,
            max_year: config.max_plausible_year,
            epochs: EpochTable::from_bands(config.epochs.clone())?,
        })
    }

    /// Validates one raw record and constructs the immutable canonical
    /// record, or reports why it must be excluded. Deterministic: the same
    /// input always yields the same record or the same reason.
    pub fn normalize(&self, raw: &RawRecord) -> std::result::Result<TreeRecord, RejectReason> {
        let year = self.extract_year(raw)?;

        let geometry_value = raw.get(&self.geometry_field).unwrap_or(&Value::Null);
        let (longitude, latitude) =
            geometry::extract(geometry_value).ok_or(RejectReason::InvalidGeometry)?;

        if !LON_RANGE.contains(&longitude) || !LAT_RANGE.contains(&latitude) {
            return Err(RejectReason::OutOfBounds);
        }

        let epoch = self.epochs.classify(year).to_string();

        Ok(TreeRecord { longitude, latitude, planting_year: year, epoch })
    }

    fn extract_year(&self, raw: &RawRecord) -> std::result::Result<i32, RejectReason> {
        let value = match raw.get(&self.year_field) {
            None | Some(Value::Null) => return Err(RejectReason::MissingYear),
            Some(v) => v,
        };

        let year = coerce_year(value).ok_or(RejectReason::InvalidYear)?;
        // Zero or negative values are upstream placeholders, not dates.
        if year <= 0 || year < self.min_year || year > self.max_year {
            return Err(RejectReason::InvalidYear);
        }
        Ok(year)
    }
}

/// Coerces a year attribute to an integer. The upstream CSV round-trips
/// years through floats, so `1975`, `1975.0` and `"1975.0"` all coerce;
/// fractional values do not.
fn coerce_year(value: &Value) -> Option<i32> {
    let as_float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !as_float.is_finite() || as_float.fract() != 0.0 {
        return None;
    }
    if as_float < i32::MIN as f64 || as_float > i32::MAX as f64 {
        return None;
    }
    Some(as_float as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        let mut config = IngestConfig::default();
        // Pin the upper bound so tests do not depend on the wall clock.
        config.max_plausible_year = 2026;
        Normalizer::from_config(&config).unwrap()
    }

    fn record(fields: Value) -> RawRecord {
        match fields {
            Value::Object(map) => RawRecord::new(map),
            _ => panic!("test record must be a JSON object"),
        }
    }

    #[test]
    fn test_normalizes_wkt_record() {
        let raw = record(json!({ "pflanzjahr": 1975, "geometry": "POINT (8.55 47.37)" }));
        let tree = normalizer().normalize(&raw).unwrap();
        assert_eq!(tree.longitude, 8.55);
        assert_eq!(tree.latitude, 47.37);
        assert_eq!(tree.planting_year, 1975);
        assert_eq!(tree.epoch, "1950–1980");
    }

    #[test]
    fn test_normalizes_structured_record_identically() {
        let n = normalizer();
        let textual = record(json!({ "pflanzjahr": 1975, "geometry": "POINT (8.55 47.37)" }));
        let structured = record(json!({
            "pflanzjahr": 1975,
            "geometry": { "type": "Point", "coordinates": [8.55, 47.37] }
        }));
        assert_eq!(n.normalize(&textual).unwrap(), n.normalize(&structured).unwrap());
    }

    #[test]
    fn test_missing_year_rejected() {
        let n = normalizer();
        let absent = record(json!({ "geometry": [8.5, 47.3] }));
        assert_eq!(n.normalize(&absent), Err(RejectReason::MissingYear));
        let null = record(json!({ "pflanzjahr": null, "geometry": [8.5, 47.3] }));
        assert_eq!(n.normalize(&null), Err(RejectReason::MissingYear));
    }

    #[test]
    fn test_non_numeric_year_rejected() {
        let n = normalizer();
        let raw = record(json!({ "pflanzjahr": "n/a", "geometry": [8.5, 47.3] }));
        assert_eq!(n.normalize(&raw), Err(RejectReason::InvalidYear));
    }

    #[test]
    fn test_implausible_years_rejected() {
        let n = normalizer();
        for year in [json!(0), json!(-5), json!(1750), json!(2050), json!(1975.5)] {
            let raw = record(json!({ "pflanzjahr": year, "geometry": [8.5, 47.3] }));
            assert_eq!(n.normalize(&raw), Err(RejectReason::InvalidYear), "year {year}");
        }
    }

    #[test]
    fn test_float_encoded_year_accepted() {
        let n = normalizer();
        let raw = record(json!({ "pflanzjahr": "1975.0", "geometry": [8.5, 47.3] }));
        assert_eq!(n.normalize(&raw).unwrap().planting_year, 1975);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let n = normalizer();
        for geometry in [json!("KEIN PUNKT"), json!(null), json!(42), json!([8.5])] {
            let raw = record(json!({ "pflanzjahr": 1975, "geometry": geometry }));
            assert_eq!(n.normalize(&raw), Err(RejectReason::InvalidGeometry));
        }
        let absent = record(json!({ "pflanzjahr": 1975 }));
        assert_eq!(n.normalize(&absent), Err(RejectReason::InvalidGeometry));
    }

    #[test]
    fn test_out_of_bounds_coordinates_rejected() {
        let n = normalizer();
        let raw = record(json!({ "pflanzjahr": 1975, "geometry": [200.0, 47.3] }));
        assert_eq!(n.normalize(&raw), Err(RejectReason::OutOfBounds));
        let raw = record(json!({ "pflanzjahr": 1975, "geometry": [8.5, -95.0] }));
        assert_eq!(n.normalize(&raw), Err(RejectReason::OutOfBounds));
    }

    #[test]
    fn test_year_checked_before_geometry() {
        // A record broken in both ways reports the year problem, matching
        // the validation order.
        let n = normalizer();
        let raw = record(json!({ "pflanzjahr": "n/a", "geometry": "KEIN PUNKT" }));
        assert_eq!(n.normalize(&raw), Err(RejectReason::InvalidYear));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = normalizer();
        let raw = record(json!({ "pflanzjahr": 1960, "geometry": "POINT (8.54 47.38)" }));
        assert_eq!(n.normalize(&raw), n.normalize(&raw));
    }

    #[test]
    fn test_configured_field_names_respected() {
        let mut config = IngestConfig::default();
        config.max_plausible_year = 2026;
        config.year_field = "year".to_string();
        config.geometry_field = "geom".to_string();
        let n = Normalizer::from_config(&config).unwrap();
        let raw = record(json!({ "year": 2001, "geom": [8.5, 47.3] }));
        assert_eq!(n.normalize(&raw).unwrap().epoch, "post-2000");
    }
}
