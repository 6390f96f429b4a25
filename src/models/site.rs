//! Service sites, existing or proposed.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Whether a site is part of the current estate or a what-if addition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    #[default]
    Existing,
    /// Added for a single scenario, never persisted
    Proposed,
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteKind::Existing => write!(f, "existing"),
            SiteKind::Proposed => write!(f, "proposed"),
        }
    }
}

/// A candidate or existing facility location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub kind: SiteKind,
}

impl Site {
    pub fn existing(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location,
            kind: SiteKind::Existing,
        }
    }

    pub fn proposed(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location,
            kind: SiteKind::Proposed,
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.kind == SiteKind::Proposed
    }
}
