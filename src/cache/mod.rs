//! Query cache with single-flight fetches and table-driven invalidation.
//!
//! Reads go through [`QueryCache::get_or_fetch`]: a fresh cached value is
//! returned directly, otherwise one fetch runs per key and concurrent callers
//! wait on its result. Mutations call [`QueryCache::invalidate_for`], which
//! marks every query under the affected resources stale and bumps their
//! generation so a fetch that was already in flight when the mutation landed
//! can never overwrite newer state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::CacheSettings;
use crate::error::ClientError;

pub mod invalidation;

pub use invalidation::{InvalidationTable, MutationKind};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Shared fetch failed: {0}")]
    FlightFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

/// Composite cache key, `resource` or `resource:suffix`.
///
/// List keys canonicalize their parameters by sorting, so logically equal
/// queries always land on the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    /// Key for a filtered list query.
    pub fn list(resource: &str, params: &[(&str, String)]) -> Self {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort();
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        if joined.is_empty() {
            Self(resource.to_string())
        } else {
            Self(format!("{}:{}", resource, joined))
        }
    }

    /// Key for a single-record query.
    pub fn detail(resource: &str, id: i64) -> Self {
        Self(format!("{}:{}", resource, id))
    }

    /// Key for an unparameterized query.
    pub fn bare(resource: &str) -> Self {
        Self(resource.to_string())
    }

    /// The resource segment, used for placeholder lookup and invalidation.
    pub fn resource(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix match on the resource segment only: `ca` covers `ca:31` but
    /// never `ca_board`.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0 == prefix || self.0.starts_with(&format!("{}:", prefix))
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    stored_at: Instant,
    stale: bool,
}

impl StoredEntry {
    fn expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.stored_at.elapsed() > ttl)
    }
}

/// One cache slot per key. The generation counts invalidations; a fetch is
/// only allowed to store its result while the generation it started under is
/// still current.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    entry: Option<StoredEntry>,
}

/// Error broadcast to callers that joined a failed fetch. Watch channels need
/// `Clone`, so the leader's typed error is flattened to status plus message.
#[derive(Debug, Clone)]
struct FlightFailure {
    status: Option<u16>,
    message: String,
}

impl FlightFailure {
    fn into_error(self) -> ClientError {
        match self.status {
            Some(status) => ClientError::Api {
                status,
                message: self.message,
            },
            None => CacheError::FlightFailed(self.message).into(),
        }
    }
}

type FlightResult = Option<Result<Value, FlightFailure>>;

struct Flight {
    generation: u64,
    rx: watch::Receiver<FlightResult>,
}

/// In-memory query cache shared by all workflows.
pub struct QueryCache {
    slots: RwLock<HashMap<QueryKey, Slot>>,
    flights: Mutex<HashMap<QueryKey, Flight>>,
    latest: DashMap<String, Value>,
    table: InvalidationTable,
    ttl: Option<Duration>,
    debug: bool,
}

impl QueryCache {
    pub fn new(ttl: Option<Duration>, debug: bool) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            latest: DashMap::new(),
            table: InvalidationTable::standard(),
            ttl,
            debug,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(
            settings.default_ttl_secs.map(Duration::from_secs),
            settings.debug,
        )
    }

    /// Returns the cached value for `key`, or runs `fetch` to produce it.
    ///
    /// At most one fetch per key is in flight at a time; callers arriving
    /// while it runs wait for its outcome instead of issuing their own
    /// request. A caller arriving after an invalidation never joins a fetch
    /// started before it.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let (fresh, generation) = {
            let mut slots = self.slots.write().unwrap();
            let slot = slots.entry(key.clone()).or_default();
            let fresh = slot
                .entry
                .as_ref()
                .filter(|entry| !entry.stale && !entry.expired(self.ttl))
                .map(|entry| entry.value.clone());
            (fresh, slot.generation)
        };

        if let Some(value) = fresh {
            if self.debug {
                debug!(key = %key, "query cache hit");
            }
            return Ok(serde_json::from_value(value).map_err(CacheError::from)?);
        }

        enum Role {
            Leader(watch::Sender<FlightResult>),
            Joiner(watch::Receiver<FlightResult>),
        }

        let role = {
            let mut flights = self.flights.lock().unwrap();
            match flights.get(&key) {
                Some(flight) if flight.generation == generation => {
                    Role::Joiner(flight.rx.clone())
                }
                _ => {
                    let (tx, rx) = watch::channel(None);
                    flights.insert(key.clone(), Flight { generation, rx });
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Joiner(mut rx) => {
                if self.debug {
                    debug!(key = %key, "joining in-flight query");
                }
                let outcome = rx
                    .wait_for(|result| result.is_some())
                    .await
                    .map_err(|_| CacheError::FlightFailed("query fetch was abandoned".into()))?
                    .clone();
                match outcome {
                    Some(Ok(value)) => {
                        Ok(serde_json::from_value(value).map_err(CacheError::from)?)
                    }
                    Some(Err(failure)) => Err(failure.into_error()),
                    None => {
                        Err(CacheError::FlightFailed("query fetch was abandoned".into()).into())
                    }
                }
            }
            Role::Leader(tx) => {
                if self.debug {
                    debug!(key = %key, "query cache miss, fetching");
                }
                let result = fetch().await;
                match &result {
                    Ok(fetched) => match serde_json::to_value(fetched) {
                        Ok(value) => {
                            self.store(&key, generation, value.clone());
                            let _ = tx.send(Some(Ok(value)));
                        }
                        Err(e) => {
                            warn!(key = %key, "failed to serialize fetched value: {}", e);
                            let _ = tx.send(Some(Err(FlightFailure {
                                status: None,
                                message: e.to_string(),
                            })));
                        }
                    },
                    Err(e) => {
                        let _ = tx.send(Some(Err(FlightFailure {
                            status: e.status(),
                            message: e.to_string(),
                        })));
                    }
                }
                self.finish_flight(&key, generation);
                result
            }
        }
    }

    /// Latest stored value for a resource, regardless of staleness. Embedders
    /// render this while a refetch is in flight, so a mutation does not blank
    /// the page.
    pub fn placeholder<T: DeserializeOwned>(&self, resource: &str) -> Option<T> {
        self.latest
            .get(resource)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Marks every query under `resource` stale and bumps its generation.
    pub fn invalidate(&self, resource: &str) {
        let mut slots = self.slots.write().unwrap();
        let mut touched = 0usize;
        for (key, slot) in slots.iter_mut() {
            if key.matches_prefix(resource) {
                slot.generation += 1;
                if let Some(entry) = &mut slot.entry {
                    entry.stale = true;
                }
                touched += 1;
            }
        }
        debug!(resource, touched, "invalidated cached queries");
    }

    /// Invalidates every resource the dependency table lists for `kind`.
    pub fn invalidate_for(&self, kind: MutationKind) {
        for resource in self.table.affected_resources(kind) {
            self.invalidate(resource);
        }
    }

    /// Drops all cached data, used on logout.
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap();
        for slot in slots.values_mut() {
            slot.generation += 1;
            slot.entry = None;
        }
        drop(slots);
        self.latest.clear();
    }

    fn store(&self, key: &QueryKey, generation: u64, value: Value) {
        let stored = {
            let mut slots = self.slots.write().unwrap();
            match slots.get_mut(key) {
                Some(slot) if slot.generation == generation => {
                    slot.entry = Some(StoredEntry {
                        value: value.clone(),
                        stored_at: Instant::now(),
                        stale: false,
                    });
                    true
                }
                _ => false,
            }
        };
        if stored {
            self.latest.insert(key.resource().to_string(), value);
        } else {
            debug!(key = %key, "discarding superseded fetch result");
        }
    }

    fn finish_flight(&self, key: &QueryKey, generation: u64) {
        let mut flights = self.flights.lock().unwrap();
        if flights.get(key).is_some_and(|f| f.generation == generation) {
            flights.remove(key);
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("ttl", &self.ttl)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
