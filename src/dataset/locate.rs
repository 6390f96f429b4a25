//! Coordinate resolution for input rows and the split into sites and demand.

use anyhow::{bail, Result};
use tracing::{info, warn};

use super::rows::InputRow;
use crate::engine::Scenario;
use crate::geocode::{resolve_batch, CoordinateResolver, Unresolved};
use crate::models::{DemandPoint, GeoPoint, Site, TravelParams};

/// Name given to a what-if site added from a postcode
pub const PROPOSED_SITE_NAME: &str = "Proposed Site";

/// A row with coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRow {
    pub description: String,
    pub postcode: String,
    pub referrals: f64,
    pub location: GeoPoint,
}

/// A row dropped because its postcode did not resolve
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedRow {
    pub description: String,
    pub postcode: String,
    pub reason: Unresolved,
}

/// Rows ready for evaluation, plus the ones that had to be dropped.
///
/// Dropping rows changes every total, so callers should surface `excluded`.
#[derive(Debug, Clone, Default)]
pub struct LocatedDataset {
    pub rows: Vec<LocatedRow>,
    pub excluded: Vec<ExcludedRow>,
}

impl LocatedDataset {
    /// Resolve rows that lack coordinates and drop those that stay unresolved
    pub async fn locate<R, F>(
        rows: Vec<InputRow>,
        resolver: &R,
        concurrency: usize,
        on_resolved: F,
    ) -> Self
    where
        R: CoordinateResolver,
        F: Fn(),
    {
        let pending: Vec<&str> = rows
            .iter()
            .filter(|r| r.location.is_none())
            .map(|r| r.postcode.as_str())
            .collect();
        info!(
            "Resolving {} postcode(s), {} row(s) already located",
            pending.len(),
            rows.len() - pending.len()
        );

        let mut resolved = resolve_batch(resolver, &pending, concurrency, |_| on_resolved())
            .await
            .into_iter();

        let mut dataset = Self::default();
        for row in rows {
            let outcome = match row.location {
                Some(location) => Ok(location),
                None => match resolved.next() {
                    Some(resolution) => resolution,
                    None => Err(Unresolved::NotFound(row.postcode.clone())),
                },
            };
            match outcome {
                Ok(location) => dataset.rows.push(LocatedRow {
                    description: row.description,
                    postcode: row.postcode,
                    referrals: row.referrals,
                    location,
                }),
                Err(reason) => dataset.excluded.push(ExcludedRow {
                    description: row.description,
                    postcode: row.postcode,
                    reason,
                }),
            }
        }

        if !dataset.excluded.is_empty() {
            warn!(
                "{} entries failed geocoding and will be removed",
                dataset.excluded.len()
            );
        }
        dataset
    }

    /// Distinct descriptions in file order
    pub fn descriptions(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.description.as_str()) {
                seen.push(row.description.as_str());
            }
        }
        seen
    }

    /// Rows named in `site_names` become sites (in file order); all others are demand points
    pub fn split(&self, site_names: &[String]) -> Result<(Vec<Site>, Vec<DemandPoint>)> {
        for name in site_names {
            if !self.rows.iter().any(|r| &r.description == name) {
                warn!("Selected site '{}' is not in the located dataset", name);
            }
        }

        let (site_rows, demand_rows): (Vec<&LocatedRow>, Vec<&LocatedRow>) = self
            .rows
            .iter()
            .partition(|r| site_names.contains(&r.description));

        if site_rows.is_empty() {
            bail!("Select at least one site present in the dataset");
        }
        if demand_rows.is_empty() {
            bail!("No demand points remain after removing selected sites");
        }

        let sites = site_rows
            .into_iter()
            .map(|r| Site::existing(r.description.clone(), r.location))
            .collect();
        let demand = demand_rows
            .into_iter()
            .map(|r| DemandPoint::new(r.description.clone(), r.location, r.referrals))
            .collect();
        Ok((sites, demand))
    }

    /// Build a scenario from the selected sites and an optional proposed site
    pub fn scenario(
        &self,
        site_names: &[String],
        proposed: Option<Site>,
        params: TravelParams,
        reference_site_index: usize,
    ) -> Result<Scenario> {
        let (mut sites, demand) = self.split(site_names)?;
        if let Some(site) = proposed {
            sites.push(site);
        }
        info!(
            "Scenario with {} demand point(s) and {} site(s)",
            demand.len(),
            sites.len()
        );
        Ok(Scenario::new(demand, sites, params).with_reference_site(reference_site_index))
    }
}

/// Resolve a what-if site; an unresolvable postcode leaves the scenario unchanged
pub async fn resolve_proposed_site<R: CoordinateResolver>(
    resolver: &R,
    postcode: &str,
) -> Option<Site> {
    match resolver.resolve(postcode).await {
        Ok(location) => {
            info!("Proposed site added to scenario at {}", postcode.trim());
            Some(Site::proposed(PROPOSED_SITE_NAME, location))
        }
        Err(e) => {
            warn!("Proposed site not added: {}", e);
            None
        }
    }
}
