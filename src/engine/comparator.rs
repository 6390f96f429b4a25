//! Comparison of a scenario against a single-site baseline.
//!
//! The baseline is a centralized counterfactual: every demand point travels
//! to one reference site, regardless of which site is nearest. Which site
//! that is depends on the caller: `reference_site` indexes the site list in
//! the order it was supplied, so reordering sites changes the baseline.

use serde::Serialize;

use super::matrix::DistanceTimeMatrix;
use crate::error::AccessError;

/// Travel times and weighted totals when all demand goes to one site
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub reference_site: usize,
    /// Car minutes from each demand point to the reference site
    pub car_minutes: Vec<f64>,
    /// Public transport minutes from each demand point to the reference site
    pub pt_minutes: Vec<f64>,
    pub weighted_car_total: f64,
    pub weighted_pt_total: f64,
}

impl Baseline {
    /// Route every demand point to column `reference_site` of the matrix
    pub fn compute(
        matrix: &DistanceTimeMatrix,
        referrals: &[f64],
        reference_site: usize,
    ) -> Result<Self, AccessError> {
        if reference_site >= matrix.cols() {
            return Err(AccessError::invalid(
                "reference_site_index",
                format!(
                    "index {} is out of range for {} site(s)",
                    reference_site,
                    matrix.cols()
                ),
            ));
        }
        if referrals.len() != matrix.rows() {
            return Err(AccessError::invalid(
                "referrals",
                format!(
                    "expected {} referral volumes, got {}",
                    matrix.rows(),
                    referrals.len()
                ),
            ));
        }

        let car_minutes: Vec<f64> = matrix.car_column(reference_site).collect();
        let pt_minutes: Vec<f64> = matrix.pt_column(reference_site).collect();

        Ok(Self {
            reference_site,
            weighted_car_total: weighted_total(referrals, &car_minutes),
            weighted_pt_total: weighted_total(referrals, &pt_minutes),
            car_minutes,
            pt_minutes,
        })
    }
}

/// `sum(referrals[i] * minutes[i])`
pub fn weighted_total(referrals: &[f64], minutes: &[f64]) -> f64 {
    referrals.iter().zip(minutes).map(|(r, t)| r * t).sum()
}

/// Percentage reduction of `scenario` relative to `baseline`.
///
/// A zero baseline has nothing to improve on and yields 0 rather than NaN;
/// the second element reports whether that happened.
pub fn improvement_pct(baseline: f64, scenario: f64) -> (f64, bool) {
    if baseline > 0.0 {
        ((baseline - scenario) / baseline * 100.0, false)
    } else {
        (0.0, true)
    }
}

/// One row of the scenario-vs-baseline table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    pub scenario: f64,
    pub baseline: f64,
    /// Positive means the scenario reduces burden
    pub improvement_pct: f64,
    /// Baseline total was zero and the improvement was defined as 0
    pub degenerate_baseline: bool,
}

impl ComparisonRow {
    pub fn new(metric: &str, scenario: f64, baseline: f64) -> Self {
        let (improvement_pct, degenerate_baseline) = improvement_pct(baseline, scenario);
        Self {
            metric: metric.to_string(),
            scenario,
            baseline,
            improvement_pct,
            degenerate_baseline,
        }
    }
}

/// Weighted access totals for the scenario against the baseline, per mode
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioComparison {
    pub car: ComparisonRow,
    pub pt: ComparisonRow,
}

impl ScenarioComparison {
    pub fn new(baseline: &Baseline, scenario_car_total: f64, scenario_pt_total: f64) -> Self {
        Self {
            car: ComparisonRow::new(
                "Weighted Access Score (Car)",
                scenario_car_total,
                baseline.weighted_car_total,
            ),
            pt: ComparisonRow::new(
                "Weighted Access Score (PT)",
                scenario_pt_total,
                baseline.weighted_pt_total,
            ),
        }
    }

    /// Rows in table order
    pub fn rows(&self) -> [&ComparisonRow; 2] {
        [&self.car, &self.pt]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn matrix() -> DistanceTimeMatrix {
        let demand = vec![GeoPoint::new(51.50, -0.10), GeoPoint::new(51.52, -0.12)];
        let sites = vec![GeoPoint::new(51.60, -0.20), GeoPoint::new(51.51, -0.11)];
        DistanceTimeMatrix::compute(&demand, &sites, 40.0, 25.0).unwrap()
    }

    #[test]
    fn test_improvement_pct() {
        assert_eq!(improvement_pct(200.0, 150.0), (25.0, false));
        assert_eq!(improvement_pct(100.0, 100.0), (0.0, false));
        assert_eq!(improvement_pct(100.0, 120.0), (-20.0, false));
    }

    #[test]
    fn test_degenerate_baseline_is_zero_not_nan() {
        let (pct, degenerate) = improvement_pct(0.0, 0.0);
        assert_eq!(pct, 0.0);
        assert!(degenerate);

        let row = ComparisonRow::new("Weighted Access Score (Car)", 0.0, 0.0);
        assert!(row.degenerate_baseline);
        assert!(!row.improvement_pct.is_nan());
    }

    #[test]
    fn test_baseline_uses_reference_column() {
        let m = matrix();
        let referrals = [100.0, 50.0];
        let baseline = Baseline::compute(&m, &referrals, 1).unwrap();

        assert_eq!(baseline.car_minutes, vec![m.car_time(0, 1), m.car_time(1, 1)]);
        assert_eq!(
            baseline.weighted_car_total,
            100.0 * m.car_time(0, 1) + 50.0 * m.car_time(1, 1)
        );
    }

    #[test]
    fn test_baseline_depends_on_site_order() {
        let m = matrix();
        let referrals = [100.0, 50.0];
        let first = Baseline::compute(&m, &referrals, 0).unwrap();
        let second = Baseline::compute(&m, &referrals, 1).unwrap();
        assert!(first.weighted_car_total > second.weighted_car_total);
    }

    #[test]
    fn test_reference_out_of_range() {
        let err = Baseline::compute(&matrix(), &[1.0, 1.0], 2).unwrap_err();
        assert_eq!(err.field(), "reference_site_index");
    }
}
