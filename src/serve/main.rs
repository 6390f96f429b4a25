//! HTTP API for scenario evaluation and postcode lookup.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use catchment::config::Config;
use catchment::engine::matrix::DistanceTimeMatrix;
use catchment::geocode::{CachedResolver, CoordinateResolver, PostcodesIoClient, Unresolved};
use catchment::{AccessError, DemandPoint, Evaluation, GeoPoint, Scenario, Site, TravelParams};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Access evaluation server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    resolver: CachedResolver<PostcodesIoClient>,
    default_params: TravelParams,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Catchment Evaluation Server");

    let config = Config::load_or_default(args.config.as_deref())?;
    config.params.validate()?;
    info!("Postcode lookups via {}", config.resolver.base_url);

    let state = Arc::new(AppState {
        resolver: CachedResolver::new(PostcodesIoClient::new(&config.resolver)?),
        default_params: config.params,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/resolve", get(resolve_handler))
        .route("/v1/evaluate", post(evaluate_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_locations: state.resolver.cache_size().await,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cached_locations: usize,
}

/// Postcode to coordinate lookup
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQueryParams>,
) -> Result<Json<ResolveResponse>, (StatusCode, String)> {
    match state.resolver.resolve(&params.postcode).await {
        Ok(location) => Ok(Json(ResolveResponse {
            postcode: params.postcode.trim().to_uppercase(),
            location,
        })),
        Err(e) => {
            let status = match e {
                Unresolved::InvalidFormat(_) => StatusCode::BAD_REQUEST,
                Unresolved::NotFound(_) => StatusCode::NOT_FOUND,
                Unresolved::RetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
            };
            Err((status, e.to_string()))
        }
    }
}

/// Evaluate a scenario given resolved coordinates
async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, (StatusCode, String)> {
    let include_matrix = request.include_matrix;
    let scenario = request
        .into_scenario(state.default_params)
        .map_err(bad_request)?;

    let evaluation = scenario.evaluate().map_err(bad_request)?;
    let matrix = include_matrix.then(|| evaluation.matrix().clone());

    info!(
        "Evaluated {} demand point(s) against {} site(s)",
        evaluation.summary.demand_points, evaluation.summary.sites
    );

    Ok(Json(EvaluateResponse { evaluation, matrix }))
}

fn bad_request(e: AccessError) -> (StatusCode, String) {
    tracing::error!("Evaluation rejected: {}", e);
    (StatusCode::BAD_REQUEST, e.to_string())
}

#[derive(Deserialize)]
struct ResolveQueryParams {
    postcode: String,
}

#[derive(Serialize)]
struct ResolveResponse {
    postcode: String,
    location: GeoPoint,
}

#[derive(Deserialize)]
struct PointInput {
    name: String,
    /// `[lat, lon]`
    coordinates: Vec<f64>,
    /// Ignored for sites
    #[serde(default)]
    referrals: f64,
}

#[derive(Deserialize)]
struct EvaluateRequest {
    demand_points: Vec<PointInput>,
    sites: Vec<PointInput>,
    /// What-if sites appended after `sites`
    #[serde(default)]
    proposed_sites: Vec<PointInput>,
    /// Falls back to the server's configured parameters
    params: Option<TravelParams>,
    #[serde(default)]
    reference_site_index: usize,
    #[serde(default)]
    include_matrix: bool,
}

impl EvaluateRequest {
    fn into_scenario(self, default_params: TravelParams) -> Result<Scenario, AccessError> {
        let demand = self
            .demand_points
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let location = GeoPoint::from_row(&p.coordinates, &format!("demand_points[{}]", i))?;
                Ok(DemandPoint::new(p.name, location, p.referrals))
            })
            .collect::<Result<Vec<_>, AccessError>>()?;

        let mut sites = self
            .sites
            .into_iter()
            .enumerate()
            .map(|(j, p)| {
                let location = GeoPoint::from_row(&p.coordinates, &format!("sites[{}]", j))?;
                Ok(Site::existing(p.name, location))
            })
            .collect::<Result<Vec<_>, AccessError>>()?;

        for (k, p) in self.proposed_sites.into_iter().enumerate() {
            let location = GeoPoint::from_row(&p.coordinates, &format!("proposed_sites[{}]", k))?;
            sites.push(Site::proposed(p.name, location));
        }

        Ok(Scenario::new(demand, sites, self.params.unwrap_or(default_params))
            .with_reference_site(self.reference_site_index))
    }
}

#[derive(Serialize)]
struct EvaluateResponse {
    #[serde(flatten)]
    evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<DistanceTimeMatrix>,
}
