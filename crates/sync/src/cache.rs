//! Resource query cache
//!
//! The one place list results live. Every list view, option list, and form
//! reads through a [`ResourceQueryCache`]; only [`ResourceQueryCache::mutate`]
//! and [`ResourceQueryCache::invalidate`] write through it.
//!
//! ## Entries
//!
//! Each [`QueryKey`] maps to an entry `{page, generation, status, error}`.
//! Status moves between:
//!
//! - `Fresh`: fetched under the resource's current generation
//! - `Stale`: invalidated, expired, or the last refresh failed; still served
//!   by [`peek`](ResourceQueryCache::peek)
//! - `Revalidating`: a refresh is in flight; the old page is still served
//!
//! ## Generations
//!
//! Every resource has a monotonically increasing generation, bumped by each
//! invalidation. A request remembers the generation it started under:
//!
//! - a fetch never joins an in-flight request from an older generation
//! - a request whose generation is no longer current stores its result as
//!   `Stale`, so the next fetch goes back to the server
//! - a request replaced by a newer one for the same key stores nothing
//!
//! Together these guarantee that a fetch issued after a successful mutation
//! observes that mutation.
//!
//! A fetch dropped before its request settles (closed view, timeout) hands
//! the entry back as `Stale` if nobody else is waiting on the request.
//!
//! The map holds at most `cache.max_entries` keys; past that the oldest
//! settled entries are evicted.

use campus_core::{
    CacheConfig, ConsoleError, ConsoleResult, Entity, EntityId, ListPage, Payload, QueryKey,
    Resource, ResourceApi,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OnceCell, watch};
use tokio::time::Instant;

type SharedResult = ConsoleResult<Arc<ListPage>>;

// ============================================================================
// Snapshots
// ============================================================================

/// Freshness of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Fresh,
    Stale,
    Revalidating,
}

/// What a consumer sees of one cache entry
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub page: Arc<ListPage>,
    pub generation: u64,
    pub status: EntryStatus,
    /// Error of the last refresh, shown next to the still-rendered page
    pub error: Option<ConsoleError>,
}

impl QuerySnapshot {
    pub fn is_fresh(&self) -> bool {
        self.status == EntryStatus::Fresh
    }
}

#[derive(Debug)]
struct CacheEntry {
    page: Arc<ListPage>,
    generation: u64,
    status: EntryStatus,
    error: Option<ConsoleError>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            page: Arc::clone(&self.page),
            generation: self.generation,
            status: self.status,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    cell: Arc<OnceCell<SharedResult>>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    generations: HashMap<Resource, u64>,
    in_flight: HashMap<QueryKey, InFlight>,
}

impl CacheState {
    fn generation(&self, resource: Resource) -> u64 {
        self.generations.get(&resource).copied().unwrap_or(0)
    }

    /// Drop the oldest settled entries until at most `max` remain
    ///
    /// `keep` (the entry just stored) and keys with a request in flight are
    /// never evicted.
    fn evict(&mut self, max: usize, keep: &QueryKey) {
        while self.entries.len() > max {
            let oldest = self
                .entries
                .iter()
                .filter(|(key, _)| *key != keep && !self.in_flight.contains_key(*key))
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(key, _)| key.clone());
            let Some(oldest) = oldest else {
                return;
            };
            tracing::debug!(key = %oldest, "evicting cache entry");
            self.entries.remove(&oldest);
        }
    }
}

/// Resets a fetch's bookkeeping if its future is dropped before the request
/// settles
///
/// Only the last waiter cleans up: while another caller still awaits the
/// same cell, that caller drives the request and settles it.
struct PendingFetch<'a, A> {
    cache: &'a ResourceQueryCache<A>,
    key: &'a QueryKey,
    cell: &'a Arc<OnceCell<SharedResult>>,
    settled: bool,
}

impl<A> Drop for PendingFetch<'_, A> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        {
            let mut state = self.cache.lock();
            let owned = state
                .in_flight
                .get(self.key)
                .is_some_and(|flight| Arc::ptr_eq(&flight.cell, self.cell));
            // The map and this fetch hold the only references
            if !owned || Arc::strong_count(self.cell) > 2 {
                return;
            }
            state.in_flight.remove(self.key);
            if let Some(entry) = state.entries.get_mut(self.key) {
                if entry.status == EntryStatus::Revalidating {
                    entry.status = EntryStatus::Stale;
                }
            }
        }
        tracing::debug!(key = %self.key, "fetch dropped before it settled");
        self.cache.bump();
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// The write half of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    Create { payload: Payload },
    Update { id: EntityId, payload: Payload },
    Delete { id: EntityId },
}

/// A create, update, or delete against one resource
#[derive(Debug, Clone, PartialEq)]
pub struct MutationIntent {
    pub resource: Resource,
    pub op: MutationOp,
}

impl MutationIntent {
    pub fn create(resource: Resource, payload: Payload) -> Self {
        Self {
            resource,
            op: MutationOp::Create { payload },
        }
    }

    pub fn update(resource: Resource, id: EntityId, payload: Payload) -> Self {
        Self {
            resource,
            op: MutationOp::Update { id, payload },
        }
    }

    pub fn delete(resource: Resource, id: EntityId) -> Self {
        Self {
            resource,
            op: MutationOp::Delete { id },
        }
    }

    fn verb(&self) -> &'static str {
        match self.op {
            MutationOp::Create { .. } => "create",
            MutationOp::Update { .. } => "update",
            MutationOp::Delete { .. } => "delete",
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Cache of list results over a [`ResourceApi`]
///
/// Instances are independent; share one behind an `Arc`.
pub struct ResourceQueryCache<A> {
    api: A,
    config: CacheConfig,
    state: Mutex<CacheState>,
    revision: watch::Sender<u64>,
}

impl<A: ResourceApi> ResourceQueryCache<A> {
    pub fn new(api: A, config: CacheConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            config,
            state: Mutex::new(CacheState::default()),
            revision,
        }
    }

    /// The backing API
    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve a list query
    ///
    /// A fresh entry is returned without I/O. Otherwise exactly one request
    /// per key is in flight no matter how many callers wait on it. A
    /// transient failure with a previous page on hand resolves to that page,
    /// marked stale and carrying the error.
    pub async fn fetch(&self, key: &QueryKey) -> ConsoleResult<QuerySnapshot> {
        let (generation, cell) = {
            let mut state = self.lock();
            let generation = state.generation(key.resource);

            if let Some(entry) = state.entries.get(key) {
                if entry.status == EntryStatus::Fresh
                    && entry.generation == generation
                    && !self.is_expired(entry)
                {
                    tracing::debug!(%key, "cache hit");
                    return Ok(entry.snapshot());
                }
            }

            match state.in_flight.get(key) {
                Some(flight) if flight.generation == generation => {
                    tracing::debug!(%key, "joining in-flight request");
                    (generation, Arc::clone(&flight.cell))
                }
                _ => {
                    tracing::debug!(%key, generation, "cache miss");
                    let cell = Arc::new(OnceCell::new());
                    state.in_flight.insert(
                        key.clone(),
                        InFlight {
                            generation,
                            cell: Arc::clone(&cell),
                        },
                    );
                    if let Some(entry) = state.entries.get_mut(key) {
                        entry.status = EntryStatus::Revalidating;
                    }
                    (generation, cell)
                }
            }
        };

        let mut pending = PendingFetch {
            cache: self,
            key,
            cell: &cell,
            settled: false,
        };
        let result = cell
            .get_or_init(|| async { self.api.list(key).await.map(Arc::new) })
            .await
            .clone();
        pending.settled = true;

        let outcome = self.settle(key, generation, &cell, result);
        self.bump();
        outcome
    }

    /// Store a resolved request and decide what the caller gets back
    fn settle(
        &self,
        key: &QueryKey,
        generation: u64,
        cell: &Arc<OnceCell<SharedResult>>,
        result: SharedResult,
    ) -> ConsoleResult<QuerySnapshot> {
        let mut state = self.lock();
        let owner = state
            .in_flight
            .get(key)
            .is_some_and(|flight| Arc::ptr_eq(&flight.cell, cell));
        if owner {
            state.in_flight.remove(key);
        }
        let current = state.generation(key.resource);

        match result {
            Ok(page) => {
                let status = if generation == current {
                    EntryStatus::Fresh
                } else {
                    EntryStatus::Stale
                };
                let snapshot = QuerySnapshot {
                    page: Arc::clone(&page),
                    generation,
                    status,
                    error: None,
                };
                if owner {
                    state.entries.insert(
                        key.clone(),
                        CacheEntry {
                            page,
                            generation,
                            status,
                            error: None,
                            fetched_at: Instant::now(),
                        },
                    );
                    state.evict(self.config.max_entries, key);
                }
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "list request failed");
                let Some(entry) = state.entries.get_mut(key) else {
                    return Err(err);
                };
                if owner {
                    entry.status = EntryStatus::Stale;
                    entry.error = Some(err.clone());
                }
                if err.is_transient() {
                    let mut snapshot = entry.snapshot();
                    snapshot.status = EntryStatus::Stale;
                    snapshot.error = Some(err);
                    Ok(snapshot)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Cached snapshot of a key, without I/O
    pub fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let state = self.lock();
        state.entries.get(key).map(|entry| {
            let mut snapshot = entry.snapshot();
            if snapshot.status == EntryStatus::Fresh && self.is_expired(entry) {
                snapshot.status = EntryStatus::Stale;
            }
            snapshot
        })
    }

    /// Mark every cached page of a resource stale
    ///
    /// Stale pages stay readable through [`peek`](Self::peek) until their
    /// refresh resolves.
    pub fn invalidate(&self, resource: Resource) {
        let generation = {
            let mut state = self.lock();
            let generation = state.generations.entry(resource).or_insert(0);
            *generation += 1;
            let generation = *generation;
            for (_, entry) in state
                .entries
                .iter_mut()
                .filter(|(key, _)| key.resource == resource)
            {
                if entry.status == EntryStatus::Fresh {
                    entry.status = EntryStatus::Stale;
                }
            }
            generation
        };
        tracing::info!(%resource, generation, "invalidated");
        self.bump();
    }

    /// Current generation of a resource
    pub fn generation(&self, resource: Resource) -> u64 {
        self.lock().generation(resource)
    }

    /// Create, update, or delete a record
    ///
    /// Invalidation happens only after the backend confirmed the write. A
    /// failed mutation leaves the cache untouched and returns the error as is.
    /// Creates and updates return the persisted record.
    pub async fn mutate(&self, intent: MutationIntent) -> ConsoleResult<Option<Entity>> {
        let resource = intent.resource;
        let result = match &intent.op {
            MutationOp::Create { payload } => self.api.create(resource, payload).await.map(Some),
            MutationOp::Update { id, payload } => {
                self.api.update(resource, *id, payload).await.map(Some)
            }
            MutationOp::Delete { id } => self.api.delete(resource, *id).await.map(|()| None),
        };

        match result {
            Ok(entity) => {
                tracing::info!(%resource, op = intent.verb(), "mutation succeeded");
                self.invalidate(resource);
                Ok(entity)
            }
            Err(err) => {
                tracing::warn!(%resource, op = intent.verb(), error = %err, "mutation failed");
                Err(err)
            }
        }
    }

    /// Fetch one record (seeds edit forms); not cached
    pub async fn get(&self, resource: Resource, id: EntityId) -> ConsoleResult<Entity> {
        self.api.get(resource, id).await
    }

    /// Receiver of a revision counter bumped on every cache change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Drop every entry
    pub fn clear(&self) {
        {
            let mut state = self.lock();
            state.entries.clear();
            state.in_flight.clear();
        }
        tracing::debug!("cache cleared");
        self.bump();
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .stale_after()
            .is_some_and(|ttl| entry.fetched_at.elapsed() >= ttl)
    }

}

impl<A> ResourceQueryCache<A> {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================
