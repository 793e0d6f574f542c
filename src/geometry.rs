use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Matches `POINT (<lon> <lat>)` case-insensitively, tolerating arbitrary
/// internal whitespace and signed/decimal numbers.
static WKT_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*POINT\s*\(\s*(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)\s*\)\s*$")
        .unwrap()
});

/// The two upstream geometry encodings, resolved once at the boundary so
/// nothing downstream ever re-inspects the raw shape.
#[derive(Debug, PartialEq)]
pub enum GeometryShape<'a> {
    /// Nested coordinate pair: a bare `[lon, lat]` or a
    /// `{ "type": ..., "coordinates": [lon, lat] }` envelope.
    Structured(&'a Value),
    /// WKT point string, `POINT (lon lat)`.
    Textual(&'a str),
    /// Anything else: wrong type, null, empty.
    Invalid,
}

impl<'a> GeometryShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => GeometryShape::Textual(s),
            Value::Array(_) => GeometryShape::Structured(value),
            Value::Object(map) if map.contains_key("coordinates") => {
                GeometryShape::Structured(value)
            }
            _ => GeometryShape::Invalid,
        }
    }
}

/// Extracts a single (longitude, latitude) pair from a raw geometry value,
/// or `None` when the record is unusable. Deterministic and side-effect
/// free; both source shapes encoding the same point yield the same pair.
pub fn extract(value: &Value) -> Option<(f64, f64)> {
    match GeometryShape::classify(value) {
        GeometryShape::Structured(v) => extract_structured(v),
        GeometryShape::Textual(s) => extract_textual(s),
        GeometryShape::Invalid => None,
    }
}

/// Unwraps a `coordinates` envelope if present, then requires exactly two
/// numeric elements in source order: longitude first, latitude second.
fn extract_structured(value: &Value) -> Option<(f64, f64)> {
    let coords = match value {
        Value::Object(map) => map.get("coordinates")?,
        other => other,
    };
    let pair = coords.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let lon = pair[0].as_f64()?;
    let lat = pair[1].as_f64()?;
    Some((lon, lat))
}

fn extract_textual(text: &str) -> Option<(f64, f64)> {
    let caps = WKT_POINT.captures(text)?;
    // The pattern only admits valid float syntax, so these parses succeed.
    let lon = caps[1].parse().ok()?;
    let lat = caps[2].parse().ok()?;
    Some((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_bare_pair() {
        assert_eq!(extract(&json!([8.55, 47.37])), Some((8.55, 47.37)));
    }

    #[test]
    fn test_extract_enveloped_pair() {
        let geometry = json!({ "type": "Point", "coordinates": [8.55, 47.37] });
        assert_eq!(extract(&geometry), Some((8.55, 47.37)));
    }

    #[test]
    fn test_extract_wkt_point() {
        assert_eq!(extract(&json!("POINT (8.55 47.37)")), Some((8.55, 47.37)));
    }

    #[test]
    fn test_wkt_is_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(extract(&json!("point(8.55   47.37)")), Some((8.55, 47.37)));
        assert_eq!(extract(&json!("  Point ( -122.33 47.61 )")), Some((-122.33, 47.61)));
        assert_eq!(extract(&json!("POINT (2683450 1250100)")), Some((2683450.0, 1250100.0)));
    }

    #[test]
    fn test_shape_invariance_between_encodings() {
        let structured = extract(&json!([8.55, 47.37]));
        let enveloped = extract(&json!({ "type": "Point", "coordinates": [8.55, 47.37] }));
        let textual = extract(&json!("POINT (8.55 47.37)"));
        assert_eq!(structured, textual);
        assert_eq!(enveloped, textual);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        assert_eq!(extract(&json!([8.55])), None);
        assert_eq!(extract(&json!([8.55, 47.37, 12.0])), None);
        assert_eq!(extract(&json!([])), None);
    }

    #[test]
    fn test_rejects_non_numeric_elements() {
        assert_eq!(extract(&json!(["8.55", 47.37])), None);
        assert_eq!(extract(&json!([null, 47.37])), None);
    }

    #[test]
    fn test_rejects_malformed_wkt() {
        assert_eq!(extract(&json!("KEIN PUNKT")), None);
        assert_eq!(extract(&json!("POINT (8.55)")), None);
        assert_eq!(extract(&json!("POINT (8.55 47.37) extra")), None);
        assert_eq!(extract(&json!("LINESTRING (0 0, 1 1)")), None);
        assert_eq!(extract(&json!("")), None);
    }

    #[test]
    fn test_rejects_wrong_type() {
        assert_eq!(extract(&Value::Null), None);
        assert_eq!(extract(&json!(42)), None);
        assert_eq!(extract(&json!({ "type": "Point" })), None);
    }

    #[test]
    fn test_classify_tags_shapes() {
        assert!(matches!(
            GeometryShape::classify(&json!([1.0, 2.0])),
            GeometryShape::Structured(_)
        ));
        assert!(matches!(
            GeometryShape::classify(&json!("POINT (1 2)")),
            GeometryShape::Textual(_)
        ));
        assert_eq!(GeometryShape::classify(&Value::Null), GeometryShape::Invalid);
    }
}
