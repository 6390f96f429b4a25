//! Scenario evaluation from a planning CSV.
//!
//! Loads demand points and sites, resolves missing coordinates, evaluates
//! the selected sites (plus an optional proposed site) against a
//! single-site baseline and writes the report tables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use catchment::config::Config;
use catchment::dataset::{load_csv, resolve_proposed_site, InputRow, LocatedDataset};
use catchment::geocode::{CachedResolver, PostcodesIoClient};
use catchment::report::ReportWriter;
use catchment::Evaluation;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "evaluate")]
#[command(about = "Evaluate access to a selection of service sites")]
struct Args {
    /// CSV with Description, Postcode, Referrals (and optionally result_latitude/result_longitude)
    #[arg(short, long)]
    input: PathBuf,

    /// Description of a row to treat as a site (repeatable)
    #[arg(short, long = "site")]
    sites: Vec<String>,

    /// Postcode of a proposed site to test
    #[arg(long)]
    proposed: Option<String>,

    /// Index (in file order of selected sites) of the baseline reference site
    #[arg(long, default_value = "0")]
    reference_site: usize,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Car speed (mph), overrides config
    #[arg(long)]
    car_speed: Option<f64>,

    /// Public transport speed (mph), overrides config
    #[arg(long)]
    pt_speed: Option<f64>,

    /// Fuel cost per mile, overrides config
    #[arg(long)]
    fuel_cost: Option<f64>,

    /// CO2 per mile (kg), overrides config
    #[arg(long)]
    co2_per_mile: Option<f64>,

    /// Output directory for report tables
    #[arg(short, long, default_value = "report")]
    output: PathBuf,

    /// Number of most improved demand points to list
    #[arg(long, default_value = "10")]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Catchment Scenario Evaluation");
    info!("Input: {}", args.input.display());

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(v) = args.car_speed {
        config.params.car_speed_mph = v;
    }
    if let Some(v) = args.pt_speed {
        config.params.pt_speed_mph = v;
    }
    if let Some(v) = args.fuel_cost {
        config.params.fuel_cost_per_mile = v;
    }
    if let Some(v) = args.co2_per_mile {
        config.params.co2_per_mile = v;
    }
    config.params.validate()?;

    let rows = load_csv(&args.input)?;

    if args.sites.is_empty() {
        anyhow::bail!(
            "Select at least one site with --site. Available: {}",
            descriptions(&rows).join(", ")
        );
    }

    let resolver = CachedResolver::new(
        PostcodesIoClient::new(&config.resolver).context("Failed to set up postcode lookup")?,
    );

    let pending = rows.iter().filter(|r| r.location.is_none()).count() as u64;
    let pb = ProgressBar::new(pending);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} postcodes",
            )?
            .progress_chars("#>-"),
    );

    let dataset =
        LocatedDataset::locate(rows, &resolver, config.resolver.concurrency, || pb.inc(1)).await;
    pb.finish_and_clear();

    for excluded in &dataset.excluded {
        warn!("Removed '{}': {}", excluded.description, excluded.reason);
    }

    let proposed = match &args.proposed {
        Some(postcode) => resolve_proposed_site(&resolver, postcode).await,
        None => None,
    };

    let scenario = dataset.scenario(&args.sites, proposed, config.params, args.reference_site)?;
    let evaluation = scenario.evaluate()?;

    log_headline(&evaluation, args.top);

    ReportWriter::new(&args.output)?
        .with_top_n(args.top)
        .write(&evaluation)?;

    Ok(())
}

/// Distinct descriptions in file order
fn descriptions(rows: &[InputRow]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for row in rows {
        if !seen.contains(&row.description.as_str()) {
            seen.push(row.description.as_str());
        }
    }
    seen
}

fn log_headline(evaluation: &Evaluation, top: usize) {
    let s = &evaluation.summary;

    info!("Total referrals: {:.0}", s.total_referrals);
    info!(
        "Avg shortest car time: {:.2} min ({:+.2} min vs baseline), std {:.2} min",
        s.mean_car_minutes,
        s.mean_car_minutes - s.baseline_mean_car_minutes,
        s.std_car_minutes
    );
    info!(
        "Avg shortest PT time: {:.2} min ({:+.2} min vs baseline)",
        s.mean_pt_minutes,
        s.mean_pt_minutes - s.baseline_mean_pt_minutes
    );
    info!(
        "Total CO2: {:.2} kg ({:+.2}), total fuel cost: {:.2} ({:+.2})",
        s.total_co2_kg,
        s.total_co2_kg - s.baseline_co2_kg,
        s.total_fuel_cost,
        s.total_fuel_cost - s.baseline_fuel_cost
    );

    for row in evaluation.comparison.rows() {
        info!(
            "{}: {:.2} vs baseline {:.2} ({:.1}% improvement{})",
            row.metric,
            row.scenario,
            row.baseline,
            row.improvement_pct,
            if row.degenerate_baseline {
                ", baseline is zero"
            } else {
                ""
            }
        );
    }

    for site in &evaluation.sites {
        info!(
            "  {} [{}]: {:.0} referrals assigned, weighted demand car {:.2} / PT {:.2}",
            site.name, site.kind, site.assigned_referrals, site.weighted_car_total, site.weighted_pt_total
        );
    }

    info!("Top {} demand points benefiting most:", top);
    for row in evaluation.top_improved(top) {
        info!("  {}: {:.2} car min saved", row.name, row.improvement_car_minutes);
    }
}
