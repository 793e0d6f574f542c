use crate::config::EpochBand;
use crate::error::{IngestError, Result};

/// Ordered, gap-free table of epoch bands over the integer year line.
///
/// Bands are lower-inclusive and upper-exclusive: with bounds 1950 and 1980,
/// the year 1950 belongs to the second band and 1979 is its last member.
/// Classification is total; any year that survived validation maps to
/// exactly one label.
#[derive(Debug, Clone)]
pub struct EpochTable {
    bands: Vec<EpochBand>,
}

impl EpochTable {
    /// Builds a table from configured bands, validating that the bounds are
    /// strictly increasing and that exactly the final band is open-ended.
    pub fn from_bands(bands: Vec<EpochBand>) -> Result<Self> {
        let Some((last, closed)) = bands.split_last() else {
            return Err(IngestError::Config("epoch table must not be empty".to_string()));
        };
        if last.upper_before.is_some() {
            return Err(IngestError::Config(
                "final epoch band must be open-ended".to_string(),
            ));
        }
        let mut previous: Option<i32> = None;
        for band in closed {
            let upper = band.upper_before.ok_or_else(|| {
                IngestError::Config(format!(
                    "epoch band '{}' before the last must have an upper bound",
                    band.label
                ))
            })?;
            if let Some(prev) = previous {
                if upper <= prev {
                    return Err(IngestError::Config(format!(
                        "epoch bounds must be strictly increasing ({} after {})",
                        upper, prev
                    )));
                }
            }
            previous = Some(upper);
        }
        Ok(Self { bands })
    }

    /// Pure lookup; linear scan over the ordered bands.
    pub fn classify(&self, year: i32) -> &str {
        for band in &self.bands {
            match band.upper_before {
                Some(upper) if year < upper => return &band.label,
                Some(_) => continue,
                None => return &band.label,
            }
        }
        // The validated table always ends with an open band.
        unreachable!("epoch table ends with an open-ended band")
    }
}
