//! The TMC location resolver.
//!
//! Resolution order per call: session cache (positive and negative), local
//! country table, Overpass remote fallback in batches of 50 with a shared
//! 1100 ms inter-request gap. A pending set de-duplicates in-flight LCDs
//! across overlapping calls and is released on every exit path, including
//! errors and cancellation.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::fetch::{Clock, HttpFetch, ReqwestFetch, SystemClock};
use crate::local;
use crate::overpass::{
    OverpassResponse, Strategy, ENDPOINTS, MAX_RETRIES, REQUEST_TIMEOUT_MS, RETRY_BACKOFF_MS,
};
use crate::types::{ResolveError, ResolvedLocation, Result};

/// LCDs per remote request.
pub const BATCH_SIZE: usize = 50;
/// Minimum spacing between remote requests.
pub const MIN_REQUEST_GAP_MS: u64 = 1_100;

type CacheKey = (u16, u16, u32);
type CountryKey = (u16, u16);

#[derive(Default)]
struct Inner {
    locations: HashMap<CacheKey, ResolvedLocation>,
    strategies: HashMap<CountryKey, usize>,
    local_unavailable: HashSet<CountryKey>,
    pending: HashSet<CacheKey>,
    last_query_ms: u64,
    active_endpoint: usize,
}

pub struct LocationResolver {
    fetch: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
    data_dir: PathBuf,
    endpoints: Vec<String>,
    max_retries: usize,
    inner: Mutex<Inner>,
}

impl LocationResolver {
    /// Resolver with production I/O (reqwest + system clock).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_io(Arc::new(ReqwestFetch::new()), Arc::new(SystemClock), data_dir)
    }

    /// Resolver with injected I/O, for tests and embedding.
    pub fn with_io(
        fetch: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        LocationResolver {
            fetch,
            clock,
            data_dir: data_dir.into(),
            endpoints: ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            max_retries: MAX_RETRIES,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Override the endpoint list (tests).
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn clear_cache(&self) {
        let mut inner = self.lock();
        inner.locations.clear();
        inner.strategies.clear();
        inner.local_unavailable.clear();
    }

    pub fn cache_size(&self) -> u64 {
        self.lock().locations.len() as u64
    }

    // The inner lock is never held across an await.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Resolve a set of location codes for one country table.
    ///
    /// Returns every requested LCD that is not currently in flight
    /// elsewhere, each either `Resolved` or `NotFound`.
    pub async fn resolve(
        &self,
        lcds: &[u32],
        cid: u16,
        tabcd: u16,
    ) -> Result<HashMap<u32, ResolvedLocation>> {
        let mut results = HashMap::new();

        let (misses, local_unavailable) = {
            let mut inner = self.lock();
            let mut misses = Vec::new();
            for &lcd in lcds {
                if results.contains_key(&lcd) || misses.contains(&lcd) {
                    continue;
                }
                if let Some(loc) = inner.locations.get(&(cid, tabcd, lcd)) {
                    results.insert(lcd, loc.clone());
                } else if inner.pending.insert((cid, tabcd, lcd)) {
                    misses.push(lcd);
                }
            }
            (misses, inner.local_unavailable.contains(&(cid, tabcd)))
        };

        if misses.is_empty() {
            return Ok(results);
        }
        let _pending = PendingGuard {
            inner: &self.inner,
            cid,
            tabcd,
            lcds: misses.clone(),
        };

        if !local_unavailable {
            match local::load_table(&self.data_dir, cid, tabcd).await {
                Ok(table) => {
                    let mut inner = self.lock();
                    for &lcd in &misses {
                        let loc = table
                            .get(&lcd)
                            .cloned()
                            .unwrap_or_else(|| ResolvedLocation::not_found(lcd));
                        inner.locations.insert((cid, tabcd, lcd), loc.clone());
                        results.insert(lcd, loc);
                    }
                    return Ok(results);
                }
                Err(e) => {
                    debug!(cid, tabcd, error = %e, "local table unavailable, falling back to Overpass");
                    self.lock().local_unavailable.insert((cid, tabcd));
                }
            }
        }

        for batch in misses.chunks(BATCH_SIZE) {
            let found = self.query_batch(batch, cid, tabcd).await?;

            let mut inner = self.lock();
            for loc in found {
                if !batch.contains(&loc.lcd) {
                    continue;
                }
                inner.locations.insert((cid, tabcd, loc.lcd), loc.clone());
                results.insert(loc.lcd, loc);
            }
            for &lcd in batch {
                if !results.contains_key(&lcd) {
                    let loc = ResolvedLocation::not_found(lcd);
                    inner.locations.insert((cid, tabcd, lcd), loc.clone());
                    results.insert(lcd, loc);
                }
            }
        }

        Ok(results)
    }

    /// Reserve the next request slot on the shared rate-limit clock.
    async fn rate_limit(&self) {
        let (depart_at, now) = {
            let mut inner = self.lock();
            let now = self.clock.now_ms();
            let depart_at = now.max(inner.last_query_ms + MIN_REQUEST_GAP_MS);
            inner.last_query_ms = depart_at;
            (depart_at, now)
        };
        if depart_at > now {
            self.clock.sleep_ms(depart_at - now).await;
        }
    }

    /// Run one batch through the memoized strategy, or detect it.
    async fn query_batch(
        &self,
        batch: &[u32],
        cid: u16,
        tabcd: u16,
    ) -> Result<Vec<ResolvedLocation>> {
        let memoized = self.lock().strategies.get(&(cid, tabcd)).copied();
        if let Some(idx) = memoized {
            let strategy = Strategy::ALL[idx];
            let resp = self.query_overpass(&strategy.build_query(batch, cid, tabcd)).await?;
            return Ok(strategy.parse(&resp.elements, cid, tabcd));
        }

        let mut last_err = None;
        let mut any_success = false;
        for (idx, strategy) in Strategy::ALL.iter().enumerate() {
            match self.query_overpass(&strategy.build_query(batch, cid, tabcd)).await {
                Ok(resp) => {
                    any_success = true;
                    let parsed = strategy.parse(&resp.elements, cid, tabcd);
                    if !parsed.is_empty() {
                        debug!(cid, tabcd, ?strategy, "strategy detected");
                        self.lock().strategies.insert((cid, tabcd), idx);
                        return Ok(parsed);
                    }
                }
                Err(e) => {
                    warn!(cid, tabcd, ?strategy, error = %e, "strategy query failed");
                    last_err = Some(e);
                }
            }
        }

        if any_success {
            Ok(Vec::new())
        } else {
            Err(last_err.unwrap_or(ResolveError::Timeout))
        }
    }

    /// One Overpass query with endpoint rotation, backoff and 20 s abort.
    /// Every attempt (first try and retries alike) reserves a slot on the
    /// shared rate-limit clock before departing.
    async fn query_overpass(&self, query: &str) -> Result<OverpassResponse> {
        let active = self.lock().active_endpoint;
        let count = self.endpoints.len();
        let mut last_err = ResolveError::Timeout;

        for attempt in 0..=self.max_retries {
            let idx = (active + attempt) % count;
            if attempt > 0 {
                self.clock.sleep_ms(RETRY_BACKOFF_MS * attempt as u64).await;
            }
            self.rate_limit().await;

            let request = self.fetch.post(&self.endpoints[idx], query.to_string());
            match tokio::time::timeout(Duration::from_millis(REQUEST_TIMEOUT_MS), request).await {
                Err(_) => {
                    warn!(endpoint = %self.endpoints[idx], "Overpass request timed out");
                    last_err = ResolveError::Timeout;
                }
                Ok(Err(e)) => {
                    warn!(endpoint = %self.endpoints[idx], error = %e, "Overpass request failed");
                    last_err = e;
                }
                Ok(Ok(resp)) if (200..300).contains(&resp.status) => {
                    self.lock().active_endpoint = idx;
                    return serde_json::from_str(&resp.body).map_err(ResolveError::from);
                }
                Ok(Ok(resp)) => {
                    debug!(endpoint = %self.endpoints[idx], status = resp.status, "Overpass rejected query");
                    last_err = ResolveError::Http(resp.status);
                }
            }
        }
        Err(last_err)
    }
}

/// Releases pending markers on every exit path out of `resolve`.
struct PendingGuard<'a> {
    inner: &'a Mutex<Inner>,
    cid: u16,
    tabcd: u16,
    lcds: Vec<u32>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        for &lcd in &self.lcds {
            inner.pending.remove(&(self.cid, self.tabcd, lcd));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
