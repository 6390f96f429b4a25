//! Per-site roll-up of referrals and weighted demand.

use serde::Serialize;

use super::comparator::weighted_total;
use super::matrix::DistanceTimeMatrix;
use super::nearest::NearestAssignment;
use crate::models::{Site, SiteKind};

/// Totals for one site.
///
/// `assigned_referrals` partitions demand: each demand point counts toward
/// exactly one site, its nearest by car time. The weighted totals are the
/// catchment load instead: every demand point weighted by its time to this
/// site, whether or not it is assigned here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub name: String,
    pub kind: SiteKind,
    pub assigned_points: usize,
    pub assigned_referrals: f64,
    pub weighted_car_total: f64,
    pub weighted_pt_total: f64,
}

pub fn summarize_sites(
    sites: &[Site],
    matrix: &DistanceTimeMatrix,
    referrals: &[f64],
    nearest: &[NearestAssignment],
) -> Vec<SiteSummary> {
    let mut assigned_points = vec![0usize; sites.len()];
    let mut assigned_referrals = vec![0.0; sites.len()];
    for (n, r) in nearest.iter().zip(referrals) {
        assigned_points[n.site_index] += 1;
        assigned_referrals[n.site_index] += r;
    }

    sites
        .iter()
        .enumerate()
        .map(|(j, site)| {
            let car: Vec<f64> = matrix.car_column(j).collect();
            let pt: Vec<f64> = matrix.pt_column(j).collect();
            SiteSummary {
                name: site.name.clone(),
                kind: site.kind,
                assigned_points: assigned_points[j],
                assigned_referrals: assigned_referrals[j],
                weighted_car_total: weighted_total(referrals, &car),
                weighted_pt_total: weighted_total(referrals, &pt),
            }
        })
        .collect()
}
