//! Reduction of the distance/time matrix to each demand point's nearest site.

use serde::Serialize;

use super::matrix::DistanceTimeMatrix;
use crate::models::TravelParams;

/// Nearest-site metrics for one demand point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestAssignment {
    /// Column of the site with the smallest car time (first one on ties)
    pub site_index: usize,
    pub distance_miles: f64,
    pub car_minutes: f64,
    pub pt_minutes: f64,
    pub fuel_cost: f64,
    pub co2_kg: f64,
}

/// Car miles implied by a car travel time at the given speed
pub fn implied_miles(car_minutes: f64, car_speed_mph: f64) -> f64 {
    car_minutes / 60.0 * car_speed_mph
}

/// Assign every demand point to its nearest site.
///
/// Nearest distance, car time and public transport time are each the
/// minimum of their own matrix row. With a single speed per mode the three
/// minima fall on the same column, but nothing here relies on that.
/// Fuel cost and CO2 are derived from the nearest car time alone.
pub fn assign_nearest(matrix: &DistanceTimeMatrix, params: &TravelParams) -> Vec<NearestAssignment> {
    (0..matrix.rows())
        .map(|i| {
            let (site_index, car_minutes) = argmin(matrix.car_row(i));
            let distance_miles = row_min(matrix.distance_row(i));
            let pt_minutes = row_min(matrix.pt_row(i));

            let miles = implied_miles(car_minutes, params.car_speed_mph);

            NearestAssignment {
                site_index,
                distance_miles,
                car_minutes,
                pt_minutes,
                fuel_cost: miles * params.fuel_cost_per_mile,
                co2_kg: miles * params.co2_per_mile,
            }
        })
        .collect()
}

/// Index and value of the smallest entry; the first index wins ties.
fn argmin(row: &[f64]) -> (usize, f64) {
    row.iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (j, v)| if v < best.1 { (j, v) } else { best })
}

fn row_min(row: &[f64]) -> f64 {
    row.iter().copied().fold(f64::INFINITY, f64::min)
}
