//! Pairwise great-circle distance and travel time between demand points and sites.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::AccessError;
use crate::models::params::validate_speed;
use crate::models::GeoPoint;

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance in miles between two points on a sphere of
/// radius [`EARTH_RADIUS_MILES`].
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Minutes needed to cover `miles` at a constant `speed_mph`
pub fn travel_minutes(miles: f64, speed_mph: f64) -> f64 {
    miles / speed_mph * 60.0
}

/// Distance, car time and public transport time for every (demand point, site) pair.
///
/// All three matrices are stored row-major with one row per demand point
/// and one column per site.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceTimeMatrix {
    rows: usize,
    cols: usize,
    distance_miles: Vec<f64>,
    car_minutes: Vec<f64>,
    pt_minutes: Vec<f64>,
}

impl DistanceTimeMatrix {
    /// Compute the matrices for the given coordinates and speeds.
    ///
    /// Fails before computing anything if either point set is empty, a
    /// coordinate is out of range, or a speed is not strictly positive.
    pub fn compute(
        demand: &[GeoPoint],
        sites: &[GeoPoint],
        car_speed_mph: f64,
        pt_speed_mph: f64,
    ) -> Result<Self, AccessError> {
        if demand.is_empty() {
            return Err(AccessError::invalid(
                "demand_points",
                "at least one demand point is required",
            ));
        }
        if sites.is_empty() {
            return Err(AccessError::invalid("sites", "at least one site is required"));
        }
        for (i, p) in demand.iter().enumerate() {
            p.validate(&format!("demand_points[{}]", i))?;
        }
        for (j, p) in sites.iter().enumerate() {
            p.validate(&format!("sites[{}]", j))?;
        }
        validate_speed("params.car_speed_mph", car_speed_mph)?;
        validate_speed("params.pt_speed_mph", pt_speed_mph)?;

        let rows = demand.len();
        let cols = sites.len();

        let mut distance_miles = vec![0.0; rows * cols];
        distance_miles
            .par_chunks_mut(cols)
            .zip(demand.par_iter())
            .for_each(|(row, origin)| {
                for (cell, site) in row.iter_mut().zip(sites) {
                    *cell = haversine_miles(*origin, *site);
                }
            });

        let car_minutes = distance_miles
            .iter()
            .map(|d| travel_minutes(*d, car_speed_mph))
            .collect();
        let pt_minutes = distance_miles
            .iter()
            .map(|d| travel_minutes(*d, pt_speed_mph))
            .collect();

        Ok(Self {
            rows,
            cols,
            distance_miles,
            car_minutes,
            pt_minutes,
        })
    }

    /// Compute from raw `[lat, lon]` rows, rejecting rows that are not 2 columns wide
    pub fn from_coordinate_rows(
        demand: &[Vec<f64>],
        sites: &[Vec<f64>],
        car_speed_mph: f64,
        pt_speed_mph: f64,
    ) -> Result<Self, AccessError> {
        let demand = parse_rows(demand, "demand_points")?;
        let sites = parse_rows(sites, "sites")?;
        Self::compute(&demand, &sites, car_speed_mph, pt_speed_mph)
    }

    /// Number of demand points
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of sites
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_miles[i * self.cols + j]
    }

    pub fn car_time(&self, i: usize, j: usize) -> f64 {
        self.car_minutes[i * self.cols + j]
    }

    pub fn pt_time(&self, i: usize, j: usize) -> f64 {
        self.pt_minutes[i * self.cols + j]
    }

    pub fn distance_row(&self, i: usize) -> &[f64] {
        &self.distance_miles[i * self.cols..(i + 1) * self.cols]
    }

    pub fn car_row(&self, i: usize) -> &[f64] {
        &self.car_minutes[i * self.cols..(i + 1) * self.cols]
    }

    pub fn pt_row(&self, i: usize) -> &[f64] {
        &self.pt_minutes[i * self.cols..(i + 1) * self.cols]
    }

    /// Car time from every demand point to site `j`
    pub fn car_column(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |i| self.car_time(i, j))
    }

    /// Public transport time from every demand point to site `j`
    pub fn pt_column(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |i| self.pt_time(i, j))
    }
}

fn parse_rows(rows: &[Vec<f64>], field: &str) -> Result<Vec<GeoPoint>, AccessError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| GeoPoint::from_row(row, &format!("{}[{}]", field, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> (Vec<GeoPoint>, Vec<GeoPoint>) {
        (
            vec![GeoPoint::new(51.50, -0.10), GeoPoint::new(51.52, -0.12)],
            vec![GeoPoint::new(51.51, -0.11), GeoPoint::new(51.60, -0.20)],
        )
    }

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris is roughly 213 miles
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let d = haversine_miles(london, paris);
        assert!((d - 213.0).abs() < 2.0, "got {}", d);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let p = GeoPoint::new(50.7184, -3.5339);
        assert_eq!(haversine_miles(p, p), 0.0);
    }

    #[test]
    fn test_matrix_shape_and_times() {
        let (demand, sites) = london();
        let m = DistanceTimeMatrix::compute(&demand, &sites, 40.0, 25.0).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);

        for i in 0..m.rows() {
            for j in 0..m.cols() {
                let d = m.distance(i, j);
                assert_eq!(d, haversine_miles(demand[i], sites[j]));
                assert_eq!(m.car_time(i, j), d / 40.0 * 60.0);
                assert_eq!(m.pt_time(i, j), d / 25.0 * 60.0);
            }
        }
    }

    #[test]
    fn test_pair_independence() {
        let (demand, sites) = london();
        let full = DistanceTimeMatrix::compute(&demand, &sites, 40.0, 25.0).unwrap();
        let single = DistanceTimeMatrix::compute(&demand[1..], &sites[1..], 40.0, 25.0).unwrap();
        assert_eq!(full.distance(1, 1), single.distance(0, 0));
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let (demand, sites) = london();
        let err = DistanceTimeMatrix::compute(&demand, &sites, 0.0, 25.0).unwrap_err();
        assert_eq!(err.field(), "params.car_speed_mph");

        let err = DistanceTimeMatrix::compute(&demand, &sites, 40.0, -5.0).unwrap_err();
        assert_eq!(err.field(), "params.pt_speed_mph");
    }

    #[test]
    fn test_rejects_empty_sets() {
        let (demand, sites) = london();
        let err = DistanceTimeMatrix::compute(&[], &sites, 40.0, 25.0).unwrap_err();
        assert_eq!(err.field(), "demand_points");
        let err = DistanceTimeMatrix::compute(&demand, &[], 40.0, 25.0).unwrap_err();
        assert_eq!(err.field(), "sites");
    }

    #[test]
    fn test_rejects_malformed_coordinate_rows() {
        let demand = vec![vec![51.50, -0.10], vec![51.52]];
        let sites = vec![vec![51.51, -0.11]];
        let err = DistanceTimeMatrix::from_coordinate_rows(&demand, &sites, 40.0, 25.0)
            .unwrap_err();
        assert_eq!(err.field(), "demand_points[1]");
    }

    #[test]
    fn test_columns_match_cells() {
        let (demand, sites) = london();
        let m = DistanceTimeMatrix::compute(&demand, &sites, 40.0, 25.0).unwrap();
        let col: Vec<f64> = m.car_column(1).collect();
        assert_eq!(col, vec![m.car_time(0, 1), m.car_time(1, 1)]);
        assert_eq!(m.pt_row(1), &[m.pt_time(1, 0), m.pt_time(1, 1)]);
    }
}
