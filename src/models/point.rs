//! Geographic point and extent types.

use geo::{BoundingRect, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point from a `[lat, lon]` row.
    ///
    /// Rows with any other number of columns are rejected, as are
    /// coordinates outside the valid latitude/longitude ranges.
    pub fn from_row(row: &[f64], field: &str) -> Result<Self, AccessError> {
        match row {
            [lat, lon] => {
                let point = Self::new(*lat, *lon);
                point.validate(field)?;
                Ok(point)
            }
            _ => Err(AccessError::invalid(
                field,
                format!("expected 2 columns (lat, lon), got {}", row.len()),
            )),
        }
    }

    /// Check that both components are finite and inside their ranges
    pub fn validate(&self, field: &str) -> Result<(), AccessError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AccessError::invalid(
                format!("{}.lat", field),
                format!("latitude must be within [-90, 90], got {}", self.lat),
            ));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(AccessError::invalid(
                format!("{}.lon", field),
                format!("longitude must be within [-180, 180], got {}", self.lon),
            ));
        }
        Ok(())
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.lon, p.lat)
    }
}

/// Axis-aligned extent in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBbox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBbox {
    /// Smallest box containing every point, or None when there are no points
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let multi: MultiPoint<f64> = points.into_iter().map(|p| Point::from(*p)).collect();
        let rect = multi.bounding_rect()?;
        Some(Self {
            min_lat: rect.min().y,
            min_lon: rect.min().x,
            max_lat: rect.max().y,
            max_lon: rect.max().x,
        })
    }
}
