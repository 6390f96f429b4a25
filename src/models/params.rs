//! Speed and cost assumptions for one evaluation run.

use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Travel and cost parameters, fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelParams {
    /// Average car speed (miles/hour)
    #[serde(default = "default_car_speed")]
    pub car_speed_mph: f64,
    /// Average public transport speed (miles/hour)
    #[serde(default = "default_pt_speed")]
    pub pt_speed_mph: f64,
    /// Fuel cost per car mile
    #[serde(default = "default_fuel_cost")]
    pub fuel_cost_per_mile: f64,
    /// CO2 emitted per car mile (kg)
    #[serde(default = "default_co2")]
    pub co2_per_mile: f64,
}

fn default_car_speed() -> f64 {
    40.0
}

fn default_pt_speed() -> f64 {
    25.0
}

fn default_fuel_cost() -> f64 {
    0.20
}

fn default_co2() -> f64 {
    0.25
}

impl Default for TravelParams {
    fn default() -> Self {
        Self {
            car_speed_mph: default_car_speed(),
            pt_speed_mph: default_pt_speed(),
            fuel_cost_per_mile: default_fuel_cost(),
            co2_per_mile: default_co2(),
        }
    }
}

impl TravelParams {
    /// Speeds must be strictly positive; cost rates may be zero but not negative.
    pub fn validate(&self) -> Result<(), AccessError> {
        validate_speed("params.car_speed_mph", self.car_speed_mph)?;
        validate_speed("params.pt_speed_mph", self.pt_speed_mph)?;
        validate_rate("params.fuel_cost_per_mile", self.fuel_cost_per_mile)?;
        validate_rate("params.co2_per_mile", self.co2_per_mile)?;
        Ok(())
    }

    /// Parameter/value pairs in a fixed order, for assumption tables
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("car_speed_mph", self.car_speed_mph),
            ("pt_speed_mph", self.pt_speed_mph),
            ("fuel_cost_per_mile", self.fuel_cost_per_mile),
            ("co2_per_mile", self.co2_per_mile),
        ]
    }
}

pub(crate) fn validate_speed(field: &str, value: f64) -> Result<(), AccessError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AccessError::invalid(
            field,
            format!("speed must be positive, got {}", value),
        ))
    }
}

fn validate_rate(field: &str, value: f64) -> Result<(), AccessError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AccessError::invalid(
            field,
            format!("rate must be non-negative, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = TravelParams::default();
        assert_eq!(params.car_speed_mph, 40.0);
        assert_eq!(params.pt_speed_mph, 25.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_zero_speed_rejected() {
        let params = TravelParams {
            pt_speed_mph: 0.0,
            ..TravelParams::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.field(), "params.pt_speed_mph");
    }

    #[test]
    fn test_zero_fuel_cost_allowed() {
        let params = TravelParams {
            fuel_cost_per_mile: 0.0,
            ..TravelParams::default()
        };
        assert!(params.validate().is_ok());

        let params = TravelParams {
            co2_per_mile: -0.1,
            ..TravelParams::default()
        };
        assert_eq!(params.validate().unwrap_err().field(), "params.co2_per_mile");
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let params: TravelParams = serde_json::from_str(r#"{"car_speed_mph": 30}"#).unwrap();
        assert_eq!(params.car_speed_mph, 30.0);
        assert_eq!(params.co2_per_mile, 0.25);
    }
}
