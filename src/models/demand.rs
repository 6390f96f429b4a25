//! Demand points: locations generating referral volume.

use serde::{Deserialize, Deserializer, Serialize};

use super::GeoPoint;

/// A location generating referrals that need access to a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub name: String,
    pub location: GeoPoint,
    /// Referral volume, never negative
    #[serde(deserialize_with = "deserialize_referrals")]
    pub referrals: f64,
}

impl DemandPoint {
    /// Create a demand point, clamping the referral volume to `>= 0`.
    ///
    /// Non-finite volumes are treated as missing and become 0.
    pub fn new(name: impl Into<String>, location: GeoPoint, referrals: f64) -> Self {
        Self {
            name: name.into(),
            location,
            referrals: clamp_referrals(referrals),
        }
    }
}

/// Clamp a raw referral count into the non-negative range
pub fn clamp_referrals(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

fn deserialize_referrals<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_referrals)
}
