//! Geographic bounding boxes and named subset regions.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// A geographic bounding box in degrees (WGS84 lon/lat).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Parse "min_lon,min_lat,max_lon,max_lat".
    pub fn parse(s: &str) -> CommonResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CommonError::InvalidBbox(format!(
                "{s}: expected 'min_lon,min_lat,max_lon,max_lat'"
            )));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| CommonError::InvalidBbox(format!("invalid number '{part}'")))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Reject inverted or non-finite boxes.
    pub fn validate(&self) -> CommonResult<()> {
        let finite = [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CommonError::InvalidBbox("coordinates must be finite".into()));
        }
        if self.min_lon > self.max_lon || self.min_lat > self.max_lat {
            return Err(CommonError::InvalidBbox(format!(
                "min must not exceed max: {}",
                self.describe()
            )));
        }
        Ok(())
    }

    /// Width in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if this bbox intersects another (edges count as touching).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Check if a longitude lies within the box, inclusive.
    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon
    }

    /// Check if a latitude lies within the box, inclusive.
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat
    }

    /// Human-readable form used in archive metadata.
    pub fn describe(&self) -> String {
        format!(
            "lat {}..{}, lon {}..{}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// A named subset region; the name becomes part of the archive filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bbox: BoundingBox,
}

impl Region {
    pub fn new(name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            name: name.into(),
            bbox,
        }
    }

    /// Colorado mountain region.
    pub fn colorado() -> Self {
        Self::new("co", BoundingBox::new(-109.0, 37.0, -104.0, 41.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = BoundingBox::parse("-109.0, 37.0, -104.0, 41.0").unwrap();
        assert_eq!(bbox, Region::colorado().bbox);
    }

    #[test]
    fn test_parse_bbox_wrong_arity() {
        assert!(matches!(
            BoundingBox::parse("1,2,3"),
            Err(CommonError::InvalidBbox(_))
        ));
    }

    #[test]
    fn test_parse_bbox_inverted() {
        assert!(BoundingBox::parse("10,0,5,1").is_err());
    }

    #[test]
    fn test_parse_bbox_not_a_number() {
        assert!(BoundingBox::parse("a,0,5,1").is_err());
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_lon(10.0));
        assert!(!a.contains_lat(10.5));
    }
}
