//! Geocoding collaborator seam and the bounded lookup cache in front
//! of it.
//!
//! The service itself lives outside the core; implementations must
//! return a definite success or error (their own timeouts included).
//! The cache is the only shared mutable structure in the process: it
//! is bounded, keyed by the exact request tuple, and guarantees at
//! most one in-flight lookup per key.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// Bound on distinct request tuples remembered by the cache.
const GEOCODE_CACHE_CAPACITY: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("city not found")]
    NotFound,
    #[error("lookup timed out")]
    Timeout,
    #[error("geocoding failed: {0}")]
    Service(String),
}

/// One ranked geocoding result. The pipeline consumes the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    pub formatted: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
}

pub trait Geocoder: Send + Sync {
    fn lookup(&self, city: &str) -> Result<Vec<GeoCandidate>, GeocodeError>;
}

// ---------------------------
// ## Lookup cache
// ---------------------------

/// Bounded memoizing cache. Each key gets a one-shot slot; concurrent
/// callers for the same key block on the slot instead of recomputing,
/// and a slot is only readable once fully populated. Eviction is
/// oldest-key-first.
pub struct LookupCache<K, V> {
    capacity: usize,
    state: Mutex<CacheState<K, V>>,
}

struct CacheState<K, V> {
    slots: HashMap<K, Arc<OnceLock<V>>>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> LookupCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LookupCache {
            capacity,
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, computing it at most once.
    /// The map lock is released before `compute` runs so unrelated
    /// keys never wait on each other.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let slot = {
            let mut state = self.state.lock().unwrap();
            if let Some(slot) = state.slots.get(&key) {
                Arc::clone(slot)
            } else {
                if state.slots.len() >= self.capacity {
                    if let Some(oldest) = state.order.pop_front() {
                        state.slots.remove(&oldest);
                    }
                }
                let slot = Arc::new(OnceLock::new());
                state.slots.insert(key.clone(), Arc::clone(&slot));
                state.order.push_back(key);
                slot
            }
        };
        slot.get_or_init(compute).clone()
    }
}

/// Memoizing wrapper around a [`Geocoder`]. The key deliberately
/// includes the request date and time, so each distinct request tuple
/// gets its own entry.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: LookupCache<(String, String, String), Result<Vec<GeoCandidate>, GeocodeError>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        CachedGeocoder {
            inner,
            cache: LookupCache::new(GEOCODE_CACHE_CAPACITY),
        }
    }

    pub fn lookup(
        &self,
        city: &str,
        date: &str,
        time: &str,
    ) -> Result<Vec<GeoCandidate>, GeocodeError> {
        let key = (city.to_string(), date.to_string(), time.to_string());
        self.cache.get_or_compute(key, || {
            debug!("geocoding {:?}", city);
            self.inner.lookup(city)
        })
    }
}
