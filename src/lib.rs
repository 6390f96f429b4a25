//! Catchment - geographic access evaluation for service site planning
//!
//! This library provides the evaluation engine plus the shared geocoding,
//! ingestion and reporting modules for the evaluate and serve binaries.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod geocode;
pub mod models;
pub mod report;

pub use engine::{Evaluation, Scenario};
pub use error::AccessError;
pub use models::{DemandPoint, GeoPoint, Site, SiteKind, TravelParams};
