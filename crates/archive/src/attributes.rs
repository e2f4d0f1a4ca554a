//! Group-level attributes of an archive.
//!
//! Attributes carry no build timestamps, so rebuilding the same range from
//! the same inputs yields identical metadata.

use serde_json::{json, Map, Value};
use snow_common::BoundingBox;

use crate::error::{ArchiveError, Result};

pub const SOURCE: &str = "NOAA NSIDC SNODAS";
pub const UNITS: &str = "meters";
pub const NODATA: &str = "NaN";
/// `subset` marker for archives covering the whole grid.
pub const FULL_EXTENT: &str = "full_extent";

/// Descriptive attributes stored on the archive group.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveAttributes {
    pub title: String,
    pub source: String,
    pub units: String,
    pub nodata: String,
    /// Label of the grid geometry the data was decoded on.
    pub grid_config: String,
    /// Retained variables, sorted.
    pub variables: Vec<String>,
    /// Crop box, `None` for the full extent.
    pub subset: Option<BoundingBox>,
    pub region: Option<String>,
}

impl ArchiveAttributes {
    pub fn new(
        title: impl Into<String>,
        grid_config: impl Into<String>,
        variables: impl IntoIterator<Item = String>,
        subset: Option<BoundingBox>,
        region: Option<String>,
    ) -> Self {
        let mut variables: Vec<String> = variables.into_iter().collect();
        variables.sort();
        variables.dedup();
        Self {
            title: title.into(),
            source: SOURCE.to_string(),
            units: UNITS.to_string(),
            nodata: NODATA.to_string(),
            grid_config: grid_config.into(),
            variables,
            subset,
            region,
        }
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("title".to_string(), json!(self.title));
        attrs.insert("source".to_string(), json!(self.source));
        attrs.insert("units".to_string(), json!(self.units));
        attrs.insert("nodata".to_string(), json!(self.nodata));
        attrs.insert("grid_config".to_string(), json!(self.grid_config));
        attrs.insert("variables".to_string(), json!(self.variables));
        attrs.insert(
            "subset".to_string(),
            match &self.subset {
                Some(bbox) => json!({
                    "min_lon": bbox.min_lon,
                    "min_lat": bbox.min_lat,
                    "max_lon": bbox.max_lon,
                    "max_lat": bbox.max_lat,
                }),
                None => json!(FULL_EXTENT),
            },
        );
        attrs.insert("region".to_string(), json!(self.region));
        attrs
    }

    pub fn from_json_map(attrs: &Map<String, Value>) -> Result<Self> {
        let text = |key: &str| -> Result<String> {
            attrs
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ArchiveError::invalid_metadata(format!("missing '{key}'")))
        };

        let variables = attrs
            .get("variables")
            .and_then(Value::as_array)
            .ok_or_else(|| ArchiveError::invalid_metadata("missing 'variables'"))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ArchiveError::invalid_metadata("non-string variable name"))
            })
            .collect::<Result<Vec<_>>>()?;

        let subset = match attrs.get("subset") {
            Some(Value::String(marker)) if marker == FULL_EXTENT => None,
            Some(value @ Value::Object(_)) => Some(serde_json::from_value(value.clone())?),
            _ => return Err(ArchiveError::invalid_metadata("missing or malformed 'subset'")),
        };

        let region = attrs
            .get("region")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            title: text("title")?,
            source: text("source")?,
            units: text("units")?,
            nodata: text("nodata")?,
            grid_config: text("grid_config")?,
            variables,
            subset,
            region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_sorted() {
        let attrs = ArchiveAttributes::new(
            "t",
            "Post-Oct-2013",
            vec!["swe".to_string(), "snow_depth".to_string()],
            None,
            None,
        );
        assert_eq!(attrs.variables, vec!["snow_depth", "swe"]);
    }

    #[test]
    fn test_json_map_layout() {
        let attrs = ArchiveAttributes::new(
            "SNODAS Dataset - 2021 (co)",
            "Post-Oct-2013",
            vec!["swe".to_string()],
            Some(BoundingBox::new(-109.0, 37.0, -104.0, 41.0)),
            Some("co".to_string()),
        );
        let map = attrs.to_json_map();
        assert_eq!(map["source"], "NOAA NSIDC SNODAS");
        assert_eq!(map["units"], "meters");
        assert_eq!(map["nodata"], "NaN");
        assert_eq!(map["subset"]["min_lon"], -109.0);
        assert_eq!(ArchiveAttributes::from_json_map(&map).unwrap(), attrs);
    }

    #[test]
    fn test_full_extent_marker() {
        let attrs = ArchiveAttributes::new("t", "g", Vec::new(), None, None);
        let map = attrs.to_json_map();
        assert_eq!(map["subset"], FULL_EXTENT);
        assert!(map["region"].is_null());
        assert_eq!(ArchiveAttributes::from_json_map(&map).unwrap().subset, None);
    }

    #[test]
    fn test_missing_keys_are_rejected() {
        let mut map = ArchiveAttributes::new("t", "g", Vec::new(), None, None).to_json_map();
        map.remove("grid_config");
        assert!(matches!(
            ArchiveAttributes::from_json_map(&map),
            Err(ArchiveError::InvalidMetadata(_))
        ));
    }
}
