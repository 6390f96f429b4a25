//! Access evaluation engine.
//!
//! Pure, synchronous computation over already-resolved coordinates:
//! distance/time matrix, nearest-site assignment, referral weighting,
//! single-site baseline comparison and per-site aggregation.

pub mod aggregator;
pub mod comparator;
pub mod evaluation;
pub mod matrix;
pub mod nearest;
pub mod weighting;

pub use aggregator::{summarize_sites, SiteSummary};
pub use comparator::{improvement_pct, Baseline, ComparisonRow, ScenarioComparison};
pub use evaluation::{DemandPointMetrics, Evaluation, Scenario, ScenarioSummary};
pub use matrix::{haversine_miles, DistanceTimeMatrix, EARTH_RADIUS_MILES};
pub use nearest::{assign_nearest, NearestAssignment};
pub use weighting::{weight_demand, WeightedDemand};
