//! Paginated list views
//!
//! A [`ListView`] is one mounted table: a resource, a page window, and the
//! search/status/scope filters, read through the shared cache. It keeps its
//! last successful page through any fetch error, and steps back a page when
//! the current one comes back empty (e.g. after deleting its only row).
//!
//! Every change of the query retargets the view's mount, so a result that
//! arrives for a query the user already moved away from is dropped instead
//! of overwriting the newer one.

use crate::cache::{MutationIntent, QuerySnapshot, ResourceQueryCache};
use crate::debounce::SearchDebouncer;
use campus_core::{
    ConsoleError, ConsoleResult, EntityId, Mount, QueryKey, Resource, ResourceApi, Status,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct ListState {
    key: QueryKey,
    snapshot: Option<QuerySnapshot>,
    error: Option<ConsoleError>,
}

/// One mounted list of records
pub struct ListView<A> {
    cache: Arc<ResourceQueryCache<A>>,
    debouncer: SearchDebouncer,
    mount: Mount,
    state: Mutex<ListState>,
}

impl<A: ResourceApi> ListView<A> {
    /// First page of `resource`, `limit` rows per page
    pub fn new(
        cache: Arc<ResourceQueryCache<A>>,
        resource: Resource,
        limit: u32,
    ) -> ConsoleResult<Self> {
        Ok(Self::with_key(cache, QueryKey::first_page(resource, limit)?))
    }

    /// Start from an arbitrary query
    pub fn with_key(cache: Arc<ResourceQueryCache<A>>, key: QueryKey) -> Self {
        let debouncer = SearchDebouncer::new(cache.config().search_debounce());
        Self {
            cache,
            debouncer,
            mount: Mount::new(),
            state: Mutex::new(ListState {
                key,
                snapshot: None,
                error: None,
            }),
        }
    }

    pub fn key(&self) -> QueryKey {
        self.lock().key.clone()
    }

    pub fn page(&self) -> u32 {
        self.lock().key.pagination.page()
    }

    /// Last page applied to the view
    pub fn snapshot(&self) -> Option<QuerySnapshot> {
        self.lock().snapshot.clone()
    }

    /// Error of the last load, shown above the still-rendered rows
    pub fn error(&self) -> Option<ConsoleError> {
        self.lock().error.clone()
    }

    pub fn mount_handle(&self) -> &Mount {
        &self.mount
    }

    /// Load the current query
    ///
    /// An empty page past the first steps back until it finds rows or
    /// reaches page 1.
    pub async fn refresh(&self) -> ConsoleResult<QuerySnapshot> {
        loop {
            let snapshot = self.load().await?;
            let meta = snapshot.page.meta;
            if !(snapshot.page.is_empty() && meta.page > 1) {
                return Ok(snapshot);
            }
            let back = meta.total_pages.clamp(1, meta.page - 1);
            tracing::debug!(from = meta.page, to = back, "empty page, stepping back");
            self.retarget(|key| key.with_page(back))?;
        }
    }

    async fn load(&self) -> ConsoleResult<QuerySnapshot> {
        let key = self.key();
        let token = self.mount.token();
        let result = self.cache.fetch(&key).await;

        if !token.is_active() {
            tracing::warn!(%key, "dropping result for a query the view moved away from");
            return Err(ConsoleError::Cancelled);
        }

        let mut state = self.lock();
        match result {
            Ok(snapshot) => {
                state.error = snapshot.error.clone();
                state.snapshot = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn go_to_page(&self, page: u32) -> ConsoleResult<QuerySnapshot> {
        self.retarget(|key| key.with_page(page))?;
        self.refresh().await
    }

    pub async fn next_page(&self) -> ConsoleResult<QuerySnapshot> {
        let page = self.page();
        self.go_to_page(page + 1).await
    }

    pub async fn previous_page(&self) -> ConsoleResult<QuerySnapshot> {
        let page = self.page();
        self.go_to_page(page.saturating_sub(1).max(1)).await
    }

    /// Search input; `None` when a newer keystroke superseded this one
    pub async fn search(&self, text: &str) -> ConsoleResult<Option<QuerySnapshot>> {
        let Some(text) = self.debouncer.settle(text.to_string()).await else {
            return Ok(None);
        };
        self.retarget(|key| Ok(key.with_search(&text)))?;
        self.refresh().await.map(Some)
    }

    /// Status filter; back to page 1
    pub async fn set_status(&self, status: Option<Status>) -> ConsoleResult<QuerySnapshot> {
        self.retarget(|key| {
            let mut next = key.with_page(1)?;
            next.filters.status = status;
            Ok(next)
        })?;
        self.refresh().await
    }

    /// Parent scope filter (`program_id=1`); back to page 1
    pub async fn set_scope(
        &self,
        param: &str,
        id: Option<EntityId>,
    ) -> ConsoleResult<QuerySnapshot> {
        self.retarget(|key| {
            let mut next = key.with_page(1)?;
            match id {
                Some(id) => next.filters.scope.insert(param.to_string(), id),
                None => next.filters.scope.remove(param),
            };
            Ok(next)
        })?;
        self.refresh().await
    }

    /// Delete a row and reload, stepping back if the page emptied
    pub async fn delete(&self, id: EntityId) -> ConsoleResult<QuerySnapshot> {
        let resource = self.lock().key.resource;
        self.cache.mutate(MutationIntent::delete(resource, id)).await?;
        self.refresh().await
    }

    /// Unmount; pending loads and searches are dropped
    pub fn close(&self) {
        self.debouncer.cancel();
        self.mount.dispose();
    }

    fn retarget(
        &self,
        change: impl FnOnce(&QueryKey) -> ConsoleResult<QueryKey>,
    ) -> ConsoleResult<()> {
        let mut state = self.lock();
        let next = change(&state.key)?;
        if next != state.key {
            state.key = next;
            self.mount.retarget();
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ApiOp, MemoryBackend};
    use campus_core::{CacheConfig, Entity};
    use std::time::Duration;

    fn administrators(count: i64) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(
            Resource::Administrator,
            (1..=count).map(|id| {
                let name = match id {
                    1 => "Alice".to_string(),
                    2 => "Alioune".to_string(),
                    _ => format!("Admin {id}"),
                };
                Entity::new(id).with_field("first_name", name).with_status(Status::Active)
            }),
        );
        backend
    }

    fn view(backend: &MemoryBackend, limit: u32) -> ListView<MemoryBackend> {
        let cache = Arc::new(ResourceQueryCache::new(backend.clone(), CacheConfig::default()));
        ListView::new(cache, Resource::Administrator, limit).unwrap()
    }

    #[tokio::test]
    async fn test_delete_only_row_of_last_page_steps_back() {
        let backend = administrators(21);
        let cache = Arc::new(ResourceQueryCache::new(backend.clone(), CacheConfig::default()));
        let view = ListView::new(Arc::clone(&cache), Resource::Administrator, 10).unwrap();
        let before = view.go_to_page(3).await.unwrap();
        assert_eq!(before.page.meta.total_pages, 3);
        assert_eq!(before.page.data.len(), 1);

        let after = view.delete(21).await.unwrap();
        assert_eq!(view.page(), 2);
        assert_eq!(after.page.meta.page, 2);
        assert_eq!(after.page.meta.total, 20);
        assert_eq!(after.page.meta.total_pages, 2);
        assert!(after.page.meta.has_previous);
        assert!(!after.page.meta.has_next);
        assert_eq!(after.page.data.len(), 10);

        // Page 3 itself reports the accurate meta before the step back
        let page3 = backend
            .requested_keys()
            .into_iter()
            .filter(|key| key.pagination.page() == 3)
            .count();
        assert_eq!(page3, 2);

        let page3_key = QueryKey::first_page(Resource::Administrator, 10)
            .unwrap()
            .with_page(3)
            .unwrap();
        let page3 = cache.peek(&page3_key).unwrap();
        assert!(page3.page.data.is_empty());
        assert_eq!(page3.page.meta.page, 3);
        assert_eq!(page3.page.meta.total, 20);
        assert_eq!(page3.page.meta.total_pages, 2);
        assert!(page3.page.meta.has_previous);
        assert!(!page3.page.meta.has_next);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_search_fires_one_request() {
        let backend = administrators(5);
        let view = view(&backend, 10);
        let typed = |text: &'static str, after: u64| {
            let view = &view;
            async move {
                tokio::time::sleep(Duration::from_millis(after)).await;
                view.search(text).await
            }
        };
        let (al, ali, alice) = tokio::join!(typed("Al", 0), typed("Ali", 100), typed("Alice", 200));
        assert!(al.unwrap().is_none());
        assert!(ali.unwrap().is_none());
        let alice = alice.unwrap().unwrap();
        assert_eq!(alice.page.meta.total, 1);

        let keys = backend.requested_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].filters.search.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_status_filter_resets_page() {
        let backend = administrators(25);
        backend.seed(Resource::Administrator, [Entity::new(26).with_status(Status::Suspended)]);
        let view = view(&backend, 10);
        view.go_to_page(2).await.unwrap();

        let snapshot = view.set_status(Some(Status::Suspended)).await.unwrap();
        assert_eq!(view.page(), 1);
        assert_eq!(snapshot.page.meta.total, 1);
        assert_eq!(view.key().filters.status, Some(Status::Suspended));
    }

    #[tokio::test]
    async fn test_keeps_last_page_through_errors() {
        let backend = administrators(15);
        let view = view(&backend, 10);
        view.refresh().await.unwrap();

        backend.fail_next(ConsoleError::transient("connection refused"));
        assert!(view.next_page().await.is_err());
        assert_eq!(view.snapshot().unwrap().page.meta.page, 1);
        assert!(view.error().is_some());

        let snapshot = view.refresh().await.unwrap();
        assert_eq!(snapshot.page.meta.page, 2);
        assert!(view.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_for_abandoned_page_is_dropped() {
        let backend = administrators(30).with_latency(Duration::from_millis(100));
        let view = view(&backend, 10);
        let slow = view.go_to_page(2);
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            view.go_to_page(3).await
        };
        let (slow, fast) = tokio::join!(slow, fast);
        assert!(matches!(slow, Err(ConsoleError::Cancelled)));
        assert_eq!(fast.unwrap().page.meta.page, 3);
        assert_eq!(view.snapshot().unwrap().page.meta.page, 3);
    }

    #[tokio::test]
    async fn test_closed_view_ignores_results() {
        let backend = administrators(3);
        let view = view(&backend, 10);
        view.close();
        assert!(matches!(view.refresh().await, Err(ConsoleError::Cancelled)));
        assert!(view.snapshot().is_none());
        assert_eq!(backend.calls(ApiOp::List, Resource::Administrator), 1);
    }

    #[tokio::test]
    async fn test_scope_filter() {
        let backend = MemoryBackend::new();
        backend.seed(
            Resource::Level,
            [
                Entity::new(1).with_field("name", "6e").with_field("specialization_id", 4),
                Entity::new(2).with_field("name", "5e").with_field("specialization_id", 5),
            ],
        );
        let cache = Arc::new(ResourceQueryCache::new(backend.clone(), CacheConfig::default()));
        let view = ListView::new(cache, Resource::Level, 10).unwrap();
        let scoped = view.set_scope("specialization_id", Some(4)).await.unwrap();
        assert_eq!(scoped.page.data.len(), 1);
        let all = view.set_scope("specialization_id", None).await.unwrap();
        assert_eq!(all.page.data.len(), 2);
    }
}
