//! CSV ingestion of the planning dataset.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::models::demand::clamp_referrals;
use crate::models::GeoPoint;

const REQUIRED_COLUMNS: [&str; 3] = ["Description", "Postcode", "Referrals"];

//schema

//Description,Postcode,Referrals,result_latitude,result_longitude
//Royal Devon Hospital,EX2 5DW,0,50.7167,-3.5064
//Heavitree Practice,EX1 2LU,42,,
//St Thomas Surgery,EX4 1HJ,abc,,

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Postcode", default)]
    postcode: String,
    #[serde(rename = "Referrals", default, deserialize_with = "csv::invalid_option")]
    referrals: Option<f64>,
    #[serde(rename = "result_latitude", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "result_longitude", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

/// One validated input row; a site or a demand point depending on selection
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    pub description: String,
    pub postcode: String,
    /// Non-numeric or negative input becomes 0
    pub referrals: f64,
    /// Pre-resolved coordinates, when the file carries valid ones
    pub location: Option<GeoPoint>,
}

impl From<CsvRow> for InputRow {
    fn from(row: CsvRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                point.validate("row").ok().map(|_| point)
            }
            _ => None,
        };
        Self {
            description: row.description,
            postcode: row.postcode,
            referrals: clamp_referrals(row.referrals.unwrap_or(0.0)),
            location,
        }
    }
}

/// Load and validate the dataset from a CSV file
pub fn load_csv(path: &Path) -> Result<Vec<InputRow>> {
    info!("Loading dataset from {}", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;
    load_rows(file)
}

/// Load and validate the dataset from any CSV reader
pub fn load_rows<R: Read>(reader: R) -> Result<Vec<InputRow>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if !REQUIRED_COLUMNS
        .iter()
        .all(|c| headers.iter().any(|h| h == *c))
    {
        bail!("CSV must contain: {}", REQUIRED_COLUMNS.join(", "));
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        rows.push(InputRow::from(record));
    }

    let distinct: HashSet<&str> = rows.iter().map(|r| r.description.as_str()).collect();
    if distinct.len() < 2 {
        bail!("Dataset must contain demand points and at least one site");
    }

    let quality = ReferralQuality::assess(&rows);
    quality.log();

    info!("Loaded {} rows", rows.len());
    Ok(rows)
}

/// Referral volume outliers worth a planner's attention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferralQuality {
    /// 99th percentile of referral volume
    pub high_threshold: f64,
    /// Rows strictly above the threshold
    pub high: usize,
    /// Rows with no referrals
    pub zero: usize,
}

impl ReferralQuality {
    pub fn assess(rows: &[InputRow]) -> Self {
        let volumes: Vec<f64> = rows.iter().map(|r| r.referrals).collect();
        let high_threshold = quantile(&volumes, 0.99);
        Self {
            high_threshold,
            high: volumes.iter().filter(|v| **v > high_threshold).count(),
            zero: volumes.iter().filter(|v| **v == 0.0).count(),
        }
    }

    pub fn log(&self) {
        if self.high > 0 {
            warn!(
                "{} row(s) have unusually high referrals (above {:.1}, top 1%). Consider reviewing.",
                self.high, self.high_threshold
            );
        }
        if self.zero > 0 {
            info!("{} row(s) have zero referrals", self.zero);
        }
    }
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Description , Postcode , Referrals , result_latitude , result_longitude
Royal Devon Hospital,EX2 5DW,0,50.7167,-3.5064
Heavitree Practice,EX1 2LU,42,,
St Thomas Surgery,EX4 1HJ,abc,,
Topsham Surgery,EX3 0DN,-5,50.6830,-3.4650
";

    #[test]
    fn test_load_rows() {
        let rows = load_rows(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].description, "Royal Devon Hospital");
        assert_eq!(rows[0].location, Some(GeoPoint::new(50.7167, -3.5064)));

        assert_eq!(rows[1].referrals, 42.0);
        assert_eq!(rows[1].location, None);
        assert_eq!(rows[1].postcode, "EX1 2LU");

        // Non-numeric and negative referrals both become zero
        assert_eq!(rows[2].referrals, 0.0);
        assert_eq!(rows[3].referrals, 0.0);
    }

    #[test]
    fn test_missing_columns_rejected() {
        let err = load_rows("Description,Postcode\nA,EX1 1AA\nB,EX2 2BB\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("CSV must contain"));
    }

    #[test]
    fn test_single_description_rejected() {
        let csv = "Description,Postcode,Referrals\nA,EX1 1AA,3\nA,EX1 1AA,4\n";
        assert!(load_rows(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_out_of_range_coordinates_need_geocoding() {
        let csv = "Description,Postcode,Referrals,result_latitude,result_longitude\n\
                   A,EX1 1AA,3,123.0,-3.5\nB,EX2 2BB,4,50.7,-3.5\n";
        let rows = load_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].location, None);
        assert!(rows[1].location.is_some());
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(&[10.0], 0.99), 10.0);
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        assert!((quantile(&values, 0.99) - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_referral_quality() {
        let mut rows: Vec<InputRow> = (0..100)
            .map(|i| InputRow {
                description: format!("Practice {}", i),
                postcode: String::new(),
                referrals: 10.0,
                location: None,
            })
            .collect();
        rows[0].referrals = 0.0;
        rows[1].referrals = 500.0;

        let quality = ReferralQuality::assess(&rows);
        assert_eq!(quality.zero, 1);
        assert_eq!(quality.high, 1);
    }
}
