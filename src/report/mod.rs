//! Plain tabular export of an evaluation.
//!
//! Writes one CSV per table plus a JSON summary into an output directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{DemandPointMetrics, Evaluation, ScenarioComparison, ScenarioSummary};

pub const DEMAND_POINTS_FILE: &str = "demand_points.csv";
pub const SITE_SUMMARY_FILE: &str = "site_summary.csv";
pub const COMPARISON_FILE: &str = "scenario_comparison.csv";
pub const ASSUMPTIONS_FILE: &str = "assumptions.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
struct AssumptionRow {
    parameter: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SummaryDoc<'a> {
    generated_at: DateTime<Utc>,
    summary: &'a ScenarioSummary,
    comparison: &'a ScenarioComparison,
    top_improved: Vec<&'a DemandPointMetrics>,
}

/// Writes evaluation tables into a directory
pub struct ReportWriter {
    dir: PathBuf,
    top_n: usize,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir, top_n: 10 })
    }

    /// Number of most-improved demand points listed in the summary
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Write every table; returns the paths written
    pub fn write(&self, evaluation: &Evaluation) -> Result<Vec<PathBuf>> {
        let written = vec![
            self.write_csv(DEMAND_POINTS_FILE, &evaluation.demand_points)?,
            self.write_csv(SITE_SUMMARY_FILE, &evaluation.sites)?,
            self.write_csv(COMPARISON_FILE, &evaluation.comparison.rows())?,
            self.write_csv(ASSUMPTIONS_FILE, &assumptions(evaluation))?,
            self.write_summary(evaluation)?,
        ];
        info!(
            "Wrote {} report files to {}",
            written.len(),
            self.dir.display()
        );
        Ok(written)
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn write_summary(&self, evaluation: &Evaluation) -> Result<PathBuf> {
        let path = self.dir.join(SUMMARY_FILE);
        let doc = SummaryDoc {
            generated_at: Utc::now(),
            summary: &evaluation.summary,
            comparison: &evaluation.comparison,
            top_improved: evaluation.top_improved(self.top_n),
        };
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &doc)?;
        Ok(path)
    }
}

fn assumptions(evaluation: &Evaluation) -> Vec<AssumptionRow> {
    let mut rows: Vec<AssumptionRow> = evaluation
        .params
        .entries()
        .iter()
        .map(|(name, value)| AssumptionRow {
            parameter: name.to_string(),
            value: value.to_string(),
        })
        .collect();
    rows.push(AssumptionRow {
        parameter: "baseline_reference_site".to_string(),
        value: evaluation.summary.reference_site.clone(),
    });
    rows
}
