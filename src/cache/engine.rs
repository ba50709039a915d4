//! Cache Engine Module
//!
//! Read-through cache over a persistent store. Lookups are answered from an
//! in-memory mirror without ever waiting on I/O; misses and expired entries
//! are populated by a background worker.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock, DEFAULT_TTL_MS};
use crate::codec;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::fetcher::ResourceFetcher;
use crate::storage::{Entries, PersistentStore};

// == Engine Options ==
/// Tuning knobs for a [`CacheEngine`].
#[derive(Clone)]
pub struct EngineOptions {
    /// Maximum entry age in milliseconds
    pub ttl_ms: u64,
    /// Populates allowed to run at the same time
    pub max_concurrent_fetches: usize,
    /// Populate requests that may wait for a free slot
    pub queue_capacity: usize,
    /// Time source for timestamps and freshness
    pub clock: Arc<dyn Clock>,
}

impl EngineOptions {
    /// Builds options from the service configuration, using the system clock.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl_ms: config.ttl_ms,
            max_concurrent_fetches: config.max_concurrent_fetches,
            queue_capacity: config.queue_capacity,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            max_concurrent_fetches: 8,
            queue_capacity: 1024,
            clock: Arc::new(SystemClock),
        }
    }
}

// == Lookup Result ==
/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Fresh cached value returned
    Hit,
    /// No entry for the key
    Miss,
    /// Entry existed but had expired
    Stale,
    /// Initial store load still running
    NotReady,
}

/// The value handed back by a lookup and why it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Cached payload on a hit, the key itself otherwise
    pub value: String,
    pub outcome: LookupOutcome,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        self.outcome == LookupOutcome::Hit
    }
}

// == Cache Engine ==
/// Read-through cache handle. Cloning is cheap and shares the same state.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<Inner>,
}

struct Inner {
    /// Mirror of the persisted mapping; None until the initial load finishes
    entries: RwLock<Option<Entries>>,
    /// Keys queued for or undergoing a background populate
    in_flight: Mutex<HashSet<String>>,
    stats: Mutex<CacheStats>,
    store: Arc<dyn PersistentStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    /// Serializes every store access that writes, and the initial load
    writer: tokio::sync::Mutex<()>,
    queue: mpsc::Sender<String>,
    ready: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine and starts loading the mirror from `store`.
    ///
    /// Must be called from within a tokio runtime: the initial load and the
    /// populate worker are spawned immediately.
    pub fn new(
        store: Arc<dyn PersistentStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        options: EngineOptions,
    ) -> Self {
        let (queue, jobs) = mpsc::channel(options.queue_capacity.max(1));
        let (ready, _) = watch::channel(false);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let engine = Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(None),
                in_flight: Mutex::new(HashSet::new()),
                stats: Mutex::new(CacheStats::new()),
                store,
                fetcher,
                clock: options.clock,
                ttl_ms: options.ttl_ms,
                writer: tokio::sync::Mutex::new(()),
                queue,
                ready,
                shutdown,
                worker: Mutex::new(None),
            }),
        };

        let loader = engine.clone();
        tokio::spawn(async move { loader.load_initial().await });

        let worker = tokio::spawn(run_worker(
            Arc::downgrade(&engine.inner),
            jobs,
            shutdown_rx,
            options.max_concurrent_fetches.max(1),
        ));
        *engine.inner.worker.lock() = Some(worker);

        engine
    }

    async fn load_initial(&self) {
        let _writer = self.inner.writer.lock().await;

        let loaded = match self.inner.store.load_all().await {
            Ok(entries) => {
                info!(entries = entries.len(), "Loaded image cache from store");
                entries
            }
            Err(err) => {
                error!(error = %err, "Failed to load image cache, starting empty");
                Entries::new()
            }
        };

        *self.inner.entries.write() = Some(loaded);
        self.inner.ready.send_replace(true);
    }

    // == Readiness ==
    /// True once the initial load from the store has completed.
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Resolves when the initial load from the store has completed.
    pub async fn wait_ready(&self) {
        let mut ready = self.inner.ready.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = ready.wait_for(|ready| *ready).await;
    }

    // == Lookup ==
    /// Returns the cached value for `key`, or `key` itself when no fresh
    /// entry exists. Never blocks on I/O.
    pub fn lookup(&self, key: &str) -> String {
        self.lookup_detailed(key).value
    }

    /// Like [`lookup`](Self::lookup), also reporting the outcome.
    ///
    /// Every outcome other than a hit schedules a background populate.
    pub fn lookup_detailed(&self, key: &str) -> Lookup {
        let now = self.inner.clock.now_ms();

        let found = {
            let entries = self.inner.entries.read();
            match entries.as_ref() {
                None => Err(LookupOutcome::NotReady),
                Some(mirror) => match mirror.get(key) {
                    None => Err(LookupOutcome::Miss),
                    Some(entry) if entry.is_fresh(now, self.inner.ttl_ms) => {
                        Ok(entry.value.clone())
                    }
                    Some(_) => Err(LookupOutcome::Stale),
                },
            }
        };

        match found {
            Ok(value) => {
                self.inner.stats.lock().hits += 1;
                Lookup {
                    value,
                    outcome: LookupOutcome::Hit,
                }
            }
            Err(outcome) => {
                {
                    let mut stats = self.inner.stats.lock();
                    match outcome {
                        LookupOutcome::Miss => stats.misses += 1,
                        LookupOutcome::Stale => stats.stale += 1,
                        LookupOutcome::NotReady => stats.not_ready += 1,
                        LookupOutcome::Hit => {}
                    }
                }
                self.schedule(key);
                Lookup {
                    value: key.to_string(),
                    outcome,
                }
            }
        }
    }

    /// Hands `key` to the populate worker unless it is already in flight.
    fn schedule(&self, key: &str) {
        if *self.inner.shutdown.borrow() {
            self.inner.stats.lock().dropped += 1;
            return;
        }

        if !self.inner.in_flight.lock().insert(key.to_string()) {
            self.inner.stats.lock().deduplicated += 1;
            return;
        }

        match self.inner.queue.try_send(key.to_string()) {
            Ok(()) => self.inner.stats.lock().scheduled += 1,
            Err(err) => {
                self.inner.in_flight.lock().remove(key);
                self.inner.stats.lock().dropped += 1;
                debug!(key, reason = %err, "Populate request dropped");
            }
        }
    }

    // == Populate ==
    /// Fetches, encodes and persists `key`, then updates the mirror.
    ///
    /// On any error nothing is written and the previous entry, if any, stays.
    pub async fn populate(&self, key: &str) -> Result<CacheEntry> {
        let result = self.fetch_and_store(key).await;

        let mut stats = self.inner.stats.lock();
        match result {
            Ok(_) => stats.populated += 1,
            Err(_) => stats.failed += 1,
        }
        drop(stats);

        result
    }

    async fn fetch_and_store(&self, key: &str) -> Result<CacheEntry> {
        let resource = self.inner.fetcher.fetch(key).await?;
        let value = codec::encode(&resource.bytes, resource.content_type.as_deref())?;

        let _writer = self.inner.writer.lock().await;
        let entry = CacheEntry::new(value, self.inner.clock.now_ms());

        let mut persisted = match self.inner.store.load_all().await {
            Ok(persisted) => persisted,
            Err(StoreError::Serde(err)) => {
                // The save below replaces the unreadable document.
                warn!(key, error = %err, "Store unreadable, rebuilding from mirror");
                let mirror = self.inner.entries.read().clone();
                mirror.unwrap_or_default()
            }
            Err(err) => return Err(err.into()),
        };
        persisted.insert(key.to_string(), entry.clone());
        self.inner.store.save_all(&persisted).await?;

        // The initial load runs under `writer` too, so if the mirror is not
        // there yet the load has not read the store and will see this entry.
        if let Some(mirror) = self.inner.entries.write().as_mut() {
            mirror.insert(key.to_string(), entry.clone());
        }

        debug!(key, size = entry.value.len(), "Cached resource");
        Ok(entry)
    }

    async fn run_scheduled(&self, key: String) {
        let _in_flight = InFlightGuard {
            in_flight: &self.inner.in_flight,
            key: &key,
        };

        if let Err(err) = self.populate(&key).await {
            warn!(key = %key, error = %err, "Background caching failed");
        }
    }

    // == Clear Expired ==
    /// Drops expired entries from the mirror and, if any were removed,
    /// overwrites the store with what is left.
    ///
    /// Returns the number of entries removed. Store failures are logged.
    pub async fn clear_expired(&self) -> usize {
        let _writer = self.inner.writer.lock().await;
        let now = self.inner.clock.now_ms();
        let ttl_ms = self.inner.ttl_ms;

        let (removed, remaining) = {
            let mut entries = self.inner.entries.write();
            let Some(mirror) = entries.as_mut() else {
                return 0;
            };

            let before = mirror.len();
            mirror.retain(|_, entry| entry.is_fresh(now, ttl_ms));
            let removed = before - mirror.len();
            if removed == 0 {
                debug!("Sweep found no expired entries");
                return 0;
            }
            (removed, mirror.clone())
        };

        self.inner.stats.lock().swept += removed as u64;

        match self.inner.store.save_all(&remaining).await {
            Ok(()) => info!(removed, remaining = remaining.len(), "Swept expired entries"),
            Err(err) => error!(removed, error = %err, "Failed to persist sweep"),
        }

        removed
    }

    // == Shutdown ==
    /// Stops accepting populate requests and waits for running ones.
    ///
    /// Requests still queued are discarded. Lookups keep working afterwards.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                warn!(error = %err, "Populate worker ended abnormally");
            }
        }
    }

    // == Introspection ==
    /// The mirror's entry for `key`, fresh or not, without scheduling anything.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.inner
            .entries
            .read()
            .as_ref()
            .and_then(|mirror| mirror.get(key).cloned())
    }

    /// Number of keys queued for or undergoing a background populate.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    pub fn ttl_ms(&self) -> u64 {
        self.inner.ttl_ms
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.inner.stats.lock().clone();
        stats.set_total_entries(self.len());
        stats
    }

    /// Returns the current number of entries in the mirror.
    pub fn len(&self) -> usize {
        self.inner.entries.read().as_ref().map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clears a key's in-flight mark when its populate ends, however it ends.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.key);
    }
}

/// Pulls keys off the queue and runs their populates, at most
/// `max_concurrent` at a time.
///
/// Holds only a weak handle so that dropping every engine handle stops it.
async fn run_worker(
    engine: Weak<Inner>,
    mut jobs: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
    max_concurrent: usize,
) {
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut running = JoinSet::new();

    loop {
        let permit = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let key = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            key = jobs.recv() => match key {
                Some(key) => key,
                None => break,
            },
        };

        let Some(inner) = engine.upgrade() else {
            break;
        };
        let handle = CacheEngine { inner };
        running.spawn(async move {
            let _permit = permit;
            handle.run_scheduled(key).await;
        });

        while running.try_join_next().is_some() {}
    }

    jobs.close();
    if let Some(inner) = engine.upgrade() {
        let mut in_flight = inner.in_flight.lock();
        while let Ok(key) = jobs.try_recv() {
            in_flight.remove(&key);
        }
    }

    while running.join_next().await.is_some() {}
    debug!("Populate worker stopped");
}
