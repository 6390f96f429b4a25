//! Postcode lookups against the postcodes.io REST API.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use super::postcode::{is_valid, normalize};
use super::resolver::{CoordinateResolver, Resolution, Unresolved};
use crate::config::ResolverConfig;
use crate::models::GeoPoint;

/// Resolves UK postcodes with bounded retries and a fixed backoff
pub struct PostcodesIoClient {
    client: Client,
    base_url: Url,
    retries: u32,
    backoff: Duration,
}

#[derive(Debug, Deserialize)]
struct PostcodeResponse {
    result: Option<PostcodeResult>,
}

#[derive(Debug, Deserialize)]
struct PostcodeResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl PostcodeResult {
    fn point(&self) -> Option<GeoPoint> {
        let point = GeoPoint::new(self.latitude?, self.longitude?);
        point.validate("result").ok()?;
        Some(point)
    }
}

impl PostcodesIoClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid resolver base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Resolver base URL cannot be a base: {}", config.base_url);
        }

        let client = Client::builder()
            .user_agent("Catchment/0.1 (access planning)")
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            retries: config.retries.max(1),
            backoff: config.backoff(),
        })
    }

    fn lookup_url(&self, postcode: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("postcodes").push(postcode);
        }
        url
    }
}

impl CoordinateResolver for PostcodesIoClient {
    async fn resolve(&self, address: &str) -> Resolution {
        let postcode = normalize(address);

        if !is_valid(&postcode) {
            warn!("Invalid postcode format: {}", postcode);
            return Err(Unresolved::InvalidFormat(postcode));
        }

        let url = self.lookup_url(&postcode);

        for attempt in 1..=self.retries {
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<PostcodeResponse>().await {
                        Ok(body) => {
                            return match body.result.as_ref().and_then(PostcodeResult::point) {
                                Some(point) => Ok(point),
                                None => {
                                    info!("No results found for postcode {}", postcode);
                                    Err(Unresolved::NotFound(postcode))
                                }
                            };
                        }
                        Err(e) => {
                            warn!(
                                "Attempt {}/{}: unreadable response for postcode {} | {}",
                                attempt, self.retries, postcode, e
                            );
                        }
                    }
                }
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    info!("No results found for postcode {}", postcode);
                    return Err(Unresolved::NotFound(postcode));
                }
                Ok(response) => {
                    warn!(
                        "Attempt {}/{}: API returned status {} for postcode {}",
                        attempt,
                        self.retries,
                        response.status(),
                        postcode
                    );
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{}: network error for postcode {} | {}",
                        attempt, self.retries, postcode, e
                    );
                }
            }

            if attempt < self.retries {
                tokio::time::sleep(self.backoff).await;
            }
        }

        error!(
            "Failed to retrieve postcode {} after {} attempts",
            postcode, self.retries
        );
        Err(Unresolved::RetriesExhausted {
            address: postcode,
            attempts: self.retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::get,
        Router,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn postcode_handler(
        State(hits): State<Arc<AtomicUsize>>,
        Path(postcode): Path<String>,
    ) -> axum::response::Response {
        hits.fetch_add(1, Ordering::SeqCst);
        match postcode.as_str() {
            "EX2 5DW" => Json(json!({
                "status": 200,
                "result": { "postcode": "EX2 5DW", "latitude": 50.7167, "longitude": -3.5064 }
            }))
            .into_response(),
            "EX1 2LU" => Json(json!({
                "status": 200,
                "result": { "postcode": "EX1 2LU", "latitude": null, "longitude": null }
            }))
            .into_response(),
            "ZZ9 9ZZ" => (
                StatusCode::NOT_FOUND,
                Json(json!({ "status": 404, "error": "Postcode not found" })),
            )
                .into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    /// Serve a fake postcode API on an ephemeral port
    async fn spawn_api() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/postcodes/{postcode}", get(postcode_handler))
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn client(base_url: &str, retries: u32) -> PostcodesIoClient {
        PostcodesIoClient::new(&ResolverConfig {
            base_url: base_url.to_string(),
            retries,
            backoff_ms: 0,
            timeout_secs: 5,
            concurrency: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_lookup_url_escapes_space() {
        let c = client("https://api.postcodes.io", 2);
        assert_eq!(
            c.lookup_url("EX2 5DW").as_str(),
            "https://api.postcodes.io/postcodes/EX2%205DW"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = ResolverConfig {
            base_url: "not a url".to_string(),
            ..ResolverConfig::default()
        };
        assert!(PostcodesIoClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_resolves_known_postcode() {
        let (base, hits) = spawn_api().await;
        let c = client(&base, 2);
        let point = c.resolve(" ex2 5dw ").await.unwrap();
        assert_eq!(point, GeoPoint::new(50.7167, -3.5064));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_format_skips_network() {
        let (base, hits) = spawn_api().await;
        let c = client(&base, 2);
        let err = c.resolve("NOT A POSTCODE").await.unwrap_err();
        assert_eq!(err, Unresolved::InvalidFormat("NOT A POSTCODE".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (base, hits) = spawn_api().await;
        let c = client(&base, 3);
        let err = c.resolve("ZZ9 9ZZ").await.unwrap_err();
        assert_eq!(err, Unresolved::NotFound("ZZ9 9ZZ".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_null_coordinates_are_not_found() {
        let (base, _) = spawn_api().await;
        let c = client(&base, 2);
        let err = c.resolve("EX1 2LU").await.unwrap_err();
        assert!(matches!(err, Unresolved::NotFound(_)));
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let (base, hits) = spawn_api().await;
        let c = client(&base, 3);
        let err = c.resolve("EX4 4QJ").await.unwrap_err();
        assert_eq!(
            err,
            Unresolved::RetriesExhausted {
                address: "EX4 4QJ".to_string(),
                attempts: 3
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
