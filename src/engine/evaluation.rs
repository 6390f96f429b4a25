//! End-to-end evaluation of one scenario.

use serde::{Deserialize, Serialize};

use super::aggregator::{summarize_sites, SiteSummary};
use super::comparator::{Baseline, ScenarioComparison};
use super::matrix::DistanceTimeMatrix;
use super::nearest::{assign_nearest, implied_miles};
use super::weighting::weight_demand;
use crate::error::AccessError;
use crate::models::demand::clamp_referrals;
use crate::models::{DemandPoint, GeoBbox, GeoPoint, Site, TravelParams};

/// Inputs of one evaluation run.
///
/// Site order matters: `reference_site_index` points into `sites` and picks
/// the single site used by the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub demand_points: Vec<DemandPoint>,
    pub sites: Vec<Site>,
    #[serde(default)]
    pub params: TravelParams,
    #[serde(default)]
    pub reference_site_index: usize,
}

/// Metric table row for one demand point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPointMetrics {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub referrals: f64,
    pub nearest_site: String,
    pub distance_miles: f64,
    pub car_minutes: f64,
    pub pt_minutes: f64,
    pub fuel_cost: f64,
    pub co2_kg: f64,
    pub weighted_car: f64,
    pub weighted_pt: f64,
    pub access_score: f64,
    pub baseline_car_minutes: f64,
    pub baseline_pt_minutes: f64,
    /// Car minutes saved against the baseline, never negative
    pub improvement_car_minutes: f64,
}

/// Headline figures for a scenario and its baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub demand_points: usize,
    pub sites: usize,
    pub total_referrals: f64,
    pub mean_car_minutes: f64,
    pub std_car_minutes: f64,
    pub mean_pt_minutes: f64,
    pub std_pt_minutes: f64,
    pub total_weighted_car: f64,
    pub total_weighted_pt: f64,
    pub total_fuel_cost: f64,
    pub total_co2_kg: f64,
    pub reference_site: String,
    pub baseline_mean_car_minutes: f64,
    pub baseline_mean_pt_minutes: f64,
    pub baseline_fuel_cost: f64,
    pub baseline_co2_kg: f64,
    pub improvement_car_pct: f64,
    pub improvement_pt_pct: f64,
    /// Bounding box of every demand point and site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<GeoBbox>,
}

/// Full result of [`Scenario::evaluate`]
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub params: TravelParams,
    pub demand_points: Vec<DemandPointMetrics>,
    pub sites: Vec<SiteSummary>,
    pub comparison: ScenarioComparison,
    pub summary: ScenarioSummary,
    #[serde(skip)]
    matrix: DistanceTimeMatrix,
}

impl Scenario {
    pub fn new(demand_points: Vec<DemandPoint>, sites: Vec<Site>, params: TravelParams) -> Self {
        Self {
            demand_points,
            sites,
            params,
            reference_site_index: 0,
        }
    }

    /// Use `sites[index]` as the baseline site instead of the first one
    pub fn with_reference_site(mut self, index: usize) -> Self {
        self.reference_site_index = index;
        self
    }

    /// Add a what-if site for this scenario only
    pub fn with_proposed_site(mut self, name: impl Into<String>, location: GeoPoint) -> Self {
        self.sites.push(Site::proposed(name, location));
        self
    }

    /// Check every precondition without computing anything
    pub fn validate(&self) -> Result<(), AccessError> {
        self.params.validate()?;
        if self.demand_points.is_empty() {
            return Err(AccessError::invalid(
                "demand_points",
                "at least one demand point is required",
            ));
        }
        if self.sites.is_empty() {
            return Err(AccessError::invalid("sites", "at least one site is required"));
        }
        if self.reference_site_index >= self.sites.len() {
            return Err(AccessError::invalid(
                "reference_site_index",
                format!(
                    "index {} is out of range for {} site(s)",
                    self.reference_site_index,
                    self.sites.len()
                ),
            ));
        }
        Ok(())
    }

    /// Run the full pipeline: matrix, nearest assignment, weighting,
    /// baseline comparison and per-site roll-up.
    pub fn evaluate(&self) -> Result<Evaluation, AccessError> {
        self.validate()?;
        let params = self.params;

        let demand_coords: Vec<GeoPoint> = self.demand_points.iter().map(|d| d.location).collect();
        let site_coords: Vec<GeoPoint> = self.sites.iter().map(|s| s.location).collect();
        // Fields are public, so clamp again rather than trust construction
        let referrals: Vec<f64> = self
            .demand_points
            .iter()
            .map(|d| clamp_referrals(d.referrals))
            .collect();

        let matrix = DistanceTimeMatrix::compute(
            &demand_coords,
            &site_coords,
            params.car_speed_mph,
            params.pt_speed_mph,
        )?;
        let baseline = Baseline::compute(&matrix, &referrals, self.reference_site_index)?;

        let nearest = assign_nearest(&matrix, &params);
        let weighted = weight_demand(&referrals, &nearest);

        let demand_points: Vec<DemandPointMetrics> = self
            .demand_points
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let n = &nearest[i];
                let w = &weighted[i];
                DemandPointMetrics {
                    name: d.name.clone(),
                    lat: d.location.lat,
                    lon: d.location.lon,
                    referrals: referrals[i],
                    nearest_site: self.sites[n.site_index].name.clone(),
                    distance_miles: n.distance_miles,
                    car_minutes: n.car_minutes,
                    pt_minutes: n.pt_minutes,
                    fuel_cost: n.fuel_cost,
                    co2_kg: n.co2_kg,
                    weighted_car: w.weighted_car,
                    weighted_pt: w.weighted_pt,
                    access_score: w.access_score,
                    baseline_car_minutes: baseline.car_minutes[i],
                    baseline_pt_minutes: baseline.pt_minutes[i],
                    improvement_car_minutes: baseline.car_minutes[i] - n.car_minutes,
                }
            })
            .collect();

        let total_weighted_car: f64 = weighted.iter().map(|w| w.weighted_car).sum();
        let total_weighted_pt: f64 = weighted.iter().map(|w| w.weighted_pt).sum();
        let comparison = ScenarioComparison::new(&baseline, total_weighted_car, total_weighted_pt);

        let car_times: Vec<f64> = nearest.iter().map(|n| n.car_minutes).collect();
        let pt_times: Vec<f64> = nearest.iter().map(|n| n.pt_minutes).collect();
        let (mean_car_minutes, std_car_minutes) = mean_std(&car_times);
        let (mean_pt_minutes, std_pt_minutes) = mean_std(&pt_times);
        let (baseline_mean_car_minutes, _) = mean_std(&baseline.car_minutes);
        let (baseline_mean_pt_minutes, _) = mean_std(&baseline.pt_minutes);

        let baseline_miles: f64 = baseline
            .car_minutes
            .iter()
            .map(|t| implied_miles(*t, params.car_speed_mph))
            .sum();

        let summary = ScenarioSummary {
            demand_points: self.demand_points.len(),
            sites: self.sites.len(),
            total_referrals: referrals.iter().sum(),
            mean_car_minutes,
            std_car_minutes,
            mean_pt_minutes,
            std_pt_minutes,
            total_weighted_car,
            total_weighted_pt,
            total_fuel_cost: nearest.iter().map(|n| n.fuel_cost).sum(),
            total_co2_kg: nearest.iter().map(|n| n.co2_kg).sum(),
            reference_site: self.sites[self.reference_site_index].name.clone(),
            baseline_mean_car_minutes,
            baseline_mean_pt_minutes,
            baseline_fuel_cost: baseline_miles * params.fuel_cost_per_mile,
            baseline_co2_kg: baseline_miles * params.co2_per_mile,
            improvement_car_pct: comparison.car.improvement_pct,
            improvement_pt_pct: comparison.pt.improvement_pct,
            extent: GeoBbox::enclosing(demand_coords.iter().chain(&site_coords)),
        };

        let sites = summarize_sites(&self.sites, &matrix, &referrals, &nearest);

        Ok(Evaluation {
            params,
            demand_points,
            sites,
            comparison,
            summary,
            matrix,
        })
    }
}

impl Evaluation {
    /// The distance and travel time matrices the evaluation was built from
    pub fn matrix(&self) -> &DistanceTimeMatrix {
        &self.matrix
    }

    /// Demand points with the largest car-time saving against the baseline,
    /// best first
    pub fn top_improved(&self, n: usize) -> Vec<&DemandPointMetrics> {
        let mut ranked: Vec<&DemandPointMetrics> = self.demand_points.iter().collect();
        ranked.sort_by(|a, b| b.improvement_car_minutes.total_cmp(&a.improvement_car_minutes));
        ranked.truncate(n);
        ranked
    }
}

/// Mean and population standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london_scenario() -> Scenario {
        Scenario::new(
            vec![
                DemandPoint::new("Practice A", GeoPoint::new(51.50, -0.10), 100.0),
                DemandPoint::new("Practice B", GeoPoint::new(51.52, -0.12), 50.0),
            ],
            vec![
                Site::existing("Central", GeoPoint::new(51.51, -0.11)),
                Site::existing("North", GeoPoint::new(51.60, -0.20)),
            ],
            TravelParams::default(),
        )
    }

    #[test]
    fn test_two_practice_scenario() {
        let eval = london_scenario().evaluate().unwrap();

        for row in &eval.demand_points {
            assert_eq!(row.nearest_site, "Central");
            assert!(row.distance_miles > 0.0 && row.distance_miles.is_finite());
            assert_eq!(row.weighted_car, row.referrals * row.car_minutes);
            assert_eq!(row.access_score, row.weighted_car + row.weighted_pt);
        }
        assert_eq!(eval.summary.total_referrals, 150.0);
        assert_eq!(eval.summary.reference_site, "Central");
        assert_eq!(eval.comparison.car.improvement_pct, 0.0);
        assert_eq!(eval.comparison.pt.improvement_pct, 0.0);
    }

    #[test]
    fn test_reference_only_scenario_has_no_improvement() {
        let mut scenario = london_scenario();
        scenario.sites.truncate(1);
        let eval = scenario.evaluate().unwrap();
        assert_eq!(eval.summary.improvement_car_pct, 0.0);
        assert_eq!(eval.summary.improvement_pt_pct, 0.0);
        assert!(!eval.comparison.car.degenerate_baseline);
    }

    #[test]
    fn test_distant_reference_shows_improvement() {
        let eval = london_scenario().with_reference_site(1).evaluate().unwrap();
        assert_eq!(eval.summary.reference_site, "North");
        assert!(eval.comparison.car.improvement_pct > 0.0);
        assert!(eval.comparison.pt.improvement_pct > 0.0);
        assert!(eval.summary.baseline_fuel_cost > eval.summary.total_fuel_cost);
        assert!(eval.summary.baseline_co2_kg > eval.summary.total_co2_kg);

        let top = eval.top_improved(1);
        assert_eq!(top.len(), 1);
        assert!(top[0].improvement_car_minutes >= eval.demand_points[0].improvement_car_minutes);
        assert!(top[0].improvement_car_minutes >= eval.demand_points[1].improvement_car_minutes);
    }

    #[test]
    fn test_proposed_site_on_demand_point() {
        let eval = london_scenario()
            .with_proposed_site("Proposed Site", GeoPoint::new(51.52, -0.12))
            .evaluate()
            .unwrap();

        let row = &eval.demand_points[1];
        assert_eq!(row.nearest_site, "Proposed Site");
        assert!(row.distance_miles.abs() < 1e-9);
        assert!(row.car_minutes.abs() < 1e-9);
        assert!(row.pt_minutes.abs() < 1e-9);
        assert_eq!(eval.sites.len(), 3);
        assert!(eval.sites[2].kind == crate::models::SiteKind::Proposed);
        assert_eq!(eval.sites[2].assigned_referrals, 50.0);
    }

    #[test]
    fn test_no_referrals_is_degenerate_baseline() {
        let mut scenario = london_scenario().with_reference_site(1);
        for d in &mut scenario.demand_points {
            d.referrals = 0.0;
        }
        let eval = scenario.evaluate().unwrap();
        assert!(eval.comparison.car.degenerate_baseline);
        assert_eq!(eval.summary.improvement_car_pct, 0.0);
    }

    #[test]
    fn test_invalid_input_fails_before_compute() {
        let mut scenario = london_scenario();
        scenario.params.car_speed_mph = 0.0;
        assert_eq!(
            scenario.evaluate().unwrap_err().field(),
            "params.car_speed_mph"
        );

        let scenario = london_scenario().with_reference_site(5);
        assert_eq!(
            scenario.evaluate().unwrap_err().field(),
            "reference_site_index"
        );

        let mut scenario = london_scenario();
        scenario.demand_points.clear();
        assert_eq!(scenario.evaluate().unwrap_err().field(), "demand_points");
    }

    #[test]
    fn test_negative_referrals_clamped_not_rejected() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "demand_points": [
                    {"name": "Practice A", "location": {"lat": 51.50, "lon": -0.10}, "referrals": -5},
                    {"name": "Practice B", "location": {"lat": 51.52, "lon": -0.12}, "referrals": 50}
                ],
                "sites": [{"name": "Central", "location": {"lat": 51.51, "lon": -0.11}}]
            }"#,
        )
        .unwrap();
        assert_eq!(scenario.demand_points[0].referrals, 0.0);

        let eval = scenario.evaluate().unwrap();
        assert_eq!(eval.demand_points[0].referrals, 0.0);
        assert_eq!(eval.demand_points[0].weighted_car, 0.0);
        assert_eq!(eval.summary.total_referrals, 50.0);

        let mut scenario = london_scenario();
        scenario.demand_points[0].referrals = -3.0;
        let eval = scenario.evaluate().unwrap();
        assert_eq!(eval.summary.total_referrals, 50.0);
        assert_eq!(eval.sites[0].assigned_referrals, 50.0);
    }

    #[test]
    fn test_summary_statistics() {
        let eval = london_scenario().evaluate().unwrap();
        let times: Vec<f64> = eval.demand_points.iter().map(|d| d.car_minutes).collect();
        let mean = (times[0] + times[1]) / 2.0;
        assert!((eval.summary.mean_car_minutes - mean).abs() < 1e-12);
        let std = ((times[0] - mean).powi(2) + (times[1] - mean).powi(2)) / 2.0;
        assert!((eval.summary.std_car_minutes - std.sqrt()).abs() < 1e-12);
        assert!(eval.summary.extent.is_some());
        assert_eq!(eval.matrix().rows(), 2);
    }

    #[test]
    fn test_mean_std() {
        assert_eq!(mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), (5.0, 2.0));
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }
}
