//! Core data models for the access evaluation engine.

pub mod demand;
pub mod params;
pub mod point;
pub mod site;

pub use demand::DemandPoint;
pub use params::TravelParams;
pub use point::{GeoBbox, GeoPoint};
pub use site::{Site, SiteKind};
