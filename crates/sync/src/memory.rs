//! In-process resource backend
//!
//! [`MemoryBackend`] serves the same contract as the HTTP API from tables
//! held in memory: case-insensitive search, exact status filter, parent
//! scoping, and server-side pagination. The command line uses it in fixture
//! mode; tests use its hooks to add latency, inject failures, and count
//! calls.
//!
//! Fixture directories hold one `<resource>.json` file per table, each a JSON
//! array of records (`[{"id": 1, "name": "Sciences"}]`).

use campus_core::{
    ConsoleError, ConsoleResult, Entity, EntityId, ListPage, Payload, QueryKey, Resource,
    ResourceApi, WireListResponse, WireMeta,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use walkdir::WalkDir;

/// Operations of the resource contract, for call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<Resource, BTreeMap<EntityId, Entity>>,
    latency: Duration,
    failures: VecDeque<ConsoleError>,
    calls: HashMap<(ApiOp, Resource), usize>,
    requested: Vec<QueryKey>,
}

/// Resource tables in memory
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (tokio time, so paused tests control it)
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Insert or replace records
    pub fn seed(&self, resource: Resource, entities: impl IntoIterator<Item = Entity>) {
        let mut state = self.lock();
        let table = state.tables.entry(resource).or_default();
        for entity in entities {
            table.insert(entity.id, entity);
        }
    }

    /// Load every `<resource>.json` file of a directory
    pub fn from_fixture_dir(dir: impl AsRef<Path>) -> ConsoleResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConsoleError::FileRead {
                path: dir.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let backend = Self::new();
        for entry in WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let resource: Resource = match stem.parse() {
                Ok(resource) => resource,
                Err(_) => {
                    tracing::warn!(file = %path.display(), "skipping fixture for unknown resource");
                    continue;
                }
            };

            let json = std::fs::read_to_string(path).map_err(|e| ConsoleError::FileRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let entities: Vec<Entity> =
                serde_json::from_str(&json).map_err(|e| ConsoleError::FileRead {
                    path: path.to_path_buf(),
                    message: format!("Invalid fixture: {e}"),
                })?;
            tracing::debug!(%resource, rows = entities.len(), "loaded fixture");
            backend.seed(resource, entities);
        }
        Ok(backend)
    }

    /// Fail the next call (of any operation) with `error`
    pub fn fail_next(&self, error: ConsoleError) {
        self.lock().failures.push_back(error);
    }

    /// Number of calls of one operation against one resource
    pub fn calls(&self, op: ApiOp, resource: Resource) -> usize {
        self.lock().calls.get(&(op, resource)).copied().unwrap_or(0)
    }

    /// Every list query received, in order
    pub fn requested_keys(&self) -> Vec<QueryKey> {
        self.lock().requested.clone()
    }

    /// All rows of a table, by id
    pub fn rows(&self, resource: Resource) -> Vec<Entity> {
        self.lock()
            .tables
            .get(&resource)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Count the call and wait out the configured latency
    async fn begin(&self, op: ApiOp, resource: Resource) -> ConsoleResult<()> {
        let latency = {
            let mut state = self.lock();
            *state.calls.entry((op, resource)).or_insert(0) += 1;
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(resource: Resource, id: EntityId) -> ConsoleError {
    ConsoleError::NotFound {
        resource: resource.display_name().to_string(),
        id,
    }
}

fn matches(entity: &Entity, key: &QueryKey) -> bool {
    let filters = &key.filters;
    filters.status.is_none_or(|status| entity.status == Some(status))
        && filters
            .search
            .as_deref()
            .is_none_or(|needle| entity.matches_search(needle))
        && filters
            .scope
            .iter()
            .all(|(param, id)| entity.id_field(param) == Some(*id))
}

impl ResourceApi for MemoryBackend {
    async fn list(&self, key: &QueryKey) -> ConsoleResult<ListPage> {
        self.lock().requested.push(key.clone());
        self.begin(ApiOp::List, key.resource).await?;

        let state = self.lock();
        let rows: Vec<&Entity> = state
            .tables
            .get(&key.resource)
            .map(|table| table.values().filter(|e| matches(e, key)).collect())
            .unwrap_or_default();

        let total = rows.len() as u64;
        let limit = key.pagination.limit();
        let data = rows
            .into_iter()
            .skip(key.pagination.offset())
            .take(limit as usize)
            .cloned()
            .collect();

        // Same shape as the older endpoints: lastPage, no navigation flags
        let response = WireListResponse {
            data,
            meta: WireMeta {
                page: Some(key.pagination.page()),
                limit: Some(limit),
                total,
                last_page: Some(total.div_ceil(u64::from(limit)) as u32),
                ..WireMeta::default()
            },
        };
        Ok(response.into_page(key.pagination))
    }

    async fn get(&self, resource: Resource, id: EntityId) -> ConsoleResult<Entity> {
        self.begin(ApiOp::Get, resource).await?;
        self.lock()
            .tables
            .get(&resource)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| not_found(resource, id))
    }

    async fn create(&self, resource: Resource, payload: &Payload) -> ConsoleResult<Entity> {
        self.begin(ApiOp::Create, resource).await?;
        let mut state = self.lock();
        let table = state.tables.entry(resource).or_default();
        let id = table.keys().next_back().map_or(1, |last| last + 1);
        let mut entity = Entity::new(id);
        entity.merge(payload);
        table.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(
        &self,
        resource: Resource,
        id: EntityId,
        payload: &Payload,
    ) -> ConsoleResult<Entity> {
        self.begin(ApiOp::Update, resource).await?;
        let mut state = self.lock();
        let entity = state
            .tables
            .get_mut(&resource)
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(|| not_found(resource, id))?;
        entity.merge(payload);
        Ok(entity.clone())
    }

    async fn delete(&self, resource: Resource, id: EntityId) -> ConsoleResult<()> {
        self.begin(ApiOp::Delete, resource).await?;
        self.lock()
            .tables
            .get_mut(&resource)
            .and_then(|table| table.remove(&id))
            .map(|_| ())
            .ok_or_else(|| not_found(resource, id))
    }
}

// ============================================================================
// Tests
// ============================================================================
