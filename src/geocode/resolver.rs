//! Coordinate resolution contract, memoization and batch lookups.

use futures::stream::{self, StreamExt};
use hashbrown::HashMap;
use std::future::Future;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::postcode::normalize;
use crate::models::GeoPoint;

/// Why an address could not be turned into coordinates.
///
/// All variants mean the same thing to the engine (the row is dropped), but
/// callers can tell a malformed address, which never reached the network,
/// apart from a lookup that ran and failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unresolved {
    #[error("invalid postcode format: {0}")]
    InvalidFormat(String),
    #[error("no location found for {0}")]
    NotFound(String),
    #[error("lookup for {address} failed after {attempts} attempt(s)")]
    RetriesExhausted { address: String, attempts: u32 },
}

impl Unresolved {
    /// Whether the same lookup could succeed if tried again later
    pub fn is_transient(&self) -> bool {
        matches!(self, Unresolved::RetriesExhausted { .. })
    }
}

pub type Resolution = Result<GeoPoint, Unresolved>;

/// Maps an address string to a coordinate.
///
/// Implementations must reject malformed input without a network round trip
/// and return the same answer for the same input.
pub trait CoordinateResolver: Send + Sync {
    fn resolve(&self, address: &str) -> impl Future<Output = Resolution> + Send;
}

/// Memoizing wrapper keyed by the normalized address.
///
/// Transient failures are not cached so a later call can retry them.
pub struct CachedResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, Resolution>>,
}

impl<R: CoordinateResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached outcomes
    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: CoordinateResolver> CoordinateResolver for CachedResolver<R> {
    async fn resolve(&self, address: &str) -> Resolution {
        let key = normalize(address);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!("Resolver cache hit for {}", key);
            return hit.clone();
        }

        let outcome = self.inner.resolve(&key).await;

        let cacheable = match &outcome {
            Ok(_) => true,
            Err(e) => !e.is_transient(),
        };
        if cacheable {
            self.cache.lock().await.insert(key, outcome.clone());
        }
        outcome
    }
}

/// Resolve every address with at most `concurrency` lookups in flight.
///
/// Addresses that normalize to the same key are looked up once. Results come
/// back in input order. `on_resolved` runs once per input address, e.g. to
/// advance a progress bar.
pub async fn resolve_batch<R, S, F>(
    resolver: &R,
    addresses: &[S],
    concurrency: usize,
    on_resolved: F,
) -> Vec<Resolution>
where
    R: CoordinateResolver,
    S: AsRef<str>,
    F: Fn(&Resolution),
{
    let keys: Vec<String> = addresses.iter().map(|a| normalize(a.as_ref())).collect();

    let mut distinct: Vec<&str> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for key in &keys {
        if !slot.contains_key(key.as_str()) {
            slot.insert(key.as_str(), distinct.len());
            distinct.push(key.as_str());
        }
    }
    if distinct.len() < keys.len() {
        debug!(
            "{} duplicate address(es) share a lookup",
            keys.len() - distinct.len()
        );
    }

    let resolved: Vec<Resolution> = stream::iter(&distinct)
        .map(|key| resolver.resolve(key))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    keys.iter()
        .map(|key| {
            let outcome = resolved[slot[key.as_str()]].clone();
            on_resolved(&outcome);
            outcome
        })
        .collect()
}
