//! Referral-weighted access burden.

use serde::Serialize;

use super::nearest::NearestAssignment;

/// Referral-weighted travel burden for one demand point.
///
/// Units are minutes × referrals and are never normalized, so totals are
/// plain sums. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedDemand {
    pub weighted_car: f64,
    pub weighted_pt: f64,
    /// `weighted_car + weighted_pt`
    pub access_score: f64,
}

impl WeightedDemand {
    pub fn new(referrals: f64, car_minutes: f64, pt_minutes: f64) -> Self {
        let weighted_car = referrals * car_minutes;
        let weighted_pt = referrals * pt_minutes;
        Self {
            weighted_car,
            weighted_pt,
            access_score: weighted_car + weighted_pt,
        }
    }
}

/// Weight each nearest assignment by the referral volume of its demand point.
///
/// `referrals` and `nearest` must be in the same (demand point) order.
pub fn weight_demand(referrals: &[f64], nearest: &[NearestAssignment]) -> Vec<WeightedDemand> {
    referrals
        .iter()
        .zip(nearest)
        .map(|(r, n)| WeightedDemand::new(*r, n.car_minutes, n.pt_minutes))
        .collect()
}
