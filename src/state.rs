use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::view::{self, FilterState, PageInfo};
use crate::cache::{CacheEntry, CacheKey, GapCache};
use crate::error::{GapError, Result};
use crate::gaps::types::{GapRecord, GapRequest, Resolution, Tier};
use crate::gaps::prepare_request;
use crate::resolver::GapResolver;
use crate::session::selection::SelectionSet;
use crate::session::{selection_key, SessionStore};

type SharedResolution = Shared<BoxFuture<'static, Result<Resolution>>>;

/// What the caller renders: the current page plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct GapView {
    pub records: Vec<GapRecord>,
    pub page: PageInfo,
    pub tier: Tier,
    pub resolved_at: DateTime<Utc>,
    pub cache_hit: bool,
}

impl GapView {
    fn of(entry: &CacheEntry, cache_hit: bool) -> Self {
        Self {
            records: view::view(entry),
            page: view::page_info(entry),
            tier: entry.tier,
            resolved_at: entry.resolved_at,
            cache_hit,
        }
    }
}

/// One analysis session: the gap cache, the user's selection and the
/// in-flight guard, owned by the caller and shared by handle.
pub struct GapAnalysis {
    session_id: String,
    resolver: Arc<GapResolver>,
    store: Arc<dyn SessionStore>,
    cache: RwLock<GapCache>,
    selection: RwLock<SelectionSet>,
    in_flight: Mutex<HashMap<CacheKey, SharedResolution>>,
}

impl GapAnalysis {
    pub fn new(session_id: &str, resolver: Arc<GapResolver>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            session_id: session_id.to_string(),
            resolver,
            store,
            cache: RwLock::new(GapCache::new()),
            selection: RwLock::new(SelectionSet::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Reload cache and selection saved by an earlier session with the same id.
    pub async fn restore(&self) -> Result<bool> {
        let restored = self
            .cache
            .write()
            .await
            .restore(self.store.as_ref(), &self.session_id)
            .await?;

        let bytes = self
            .store
            .load(&selection_key(&self.session_id))
            .await
            .map_err(|e| GapError::Storage(format!("{:#}", e)))?;
        if let Some(bytes) = bytes {
            match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(keywords) => *self.selection.write().await = SelectionSet::from_keywords(keywords),
                Err(e) => warn!(session_id = %self.session_id, "Ignoring unreadable selection: {}", e),
            }
        }

        info!(session_id = %self.session_id, restored, "Session state restored");
        Ok(restored)
    }

    /// Resolve (or reuse) the gap list for a request and return the current page.
    pub async fn analyze(&self, request: &GapRequest) -> Result<GapView> {
        let request = prepare_request(request)?;
        let key = CacheKey::from_request(&request);

        if let Some(entry) = self.cache.read().await.get(&key) {
            debug!(fingerprint = %key.fingerprint(), "Gap cache hit");
            return Ok(GapView::of(entry, true));
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            // A resolution may have landed between the cache check and the lock.
            if let Some(entry) = self.cache.read().await.get(&key) {
                return Ok(GapView::of(entry, true));
            }
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(fingerprint = %key.fingerprint(), "Joining in-flight resolution");
                    pending.clone()
                }
                None => {
                    let resolver = self.resolver.clone();
                    let pending = async move { resolver.resolve(&request).await }
                        .boxed()
                        .shared();
                    in_flight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let outcome = shared.clone().await;

        // Whoever finishes first while the entry is still ours stores the
        // list. Anyone later only reads, so a stale key never overwrites a
        // newer entry.
        let mut in_flight = self.in_flight.lock().await;
        let owner = matches!(in_flight.get(&key), Some(pending) if pending.ptr_eq(&shared));
        if owner {
            in_flight.remove(&key);
        }
        let resolution = outcome?;
        if !owner {
            drop(in_flight);
            return Ok(self.joined_view(&key, resolution).await);
        }

        let view = self.store_resolution(&key, resolution).await;
        drop(in_flight);
        self.persist().await;
        Ok(view)
    }

    /// Drop the cached list and resolve again.
    pub async fn refresh(&self, request: &GapRequest) -> Result<GapView> {
        if self.cache.write().await.invalidate().is_some() {
            info!(session_id = %self.session_id, "Gap cache invalidated for refresh");
        }
        self.analyze(request).await
    }

    /// Put a fresh list into the cache and prune the selection against it.
    async fn store_resolution(&self, key: &CacheKey, resolution: Resolution) -> GapView {
        let mut cache = self.cache.write().await;
        let entry = cache.put(key.clone(), resolution.records, resolution.tier);

        let universe: HashSet<&str> = entry.records.iter().map(|r| r.keyword.as_str()).collect();
        let dropped = self.selection.write().await.retain_in(&universe);
        if !dropped.is_empty() {
            info!(dropped = dropped.len(), "Pruned selections missing from new gap list");
        }
        GapView::of(entry, false)
    }

    /// View for a caller that joined someone else's resolution. Nothing is
    /// stored; the cache may already hold a different key.
    async fn joined_view(&self, key: &CacheKey, resolution: Resolution) -> GapView {
        if let Some(entry) = self.cache.read().await.get(key) {
            return GapView::of(entry, true);
        }
        debug!(fingerprint = %key.fingerprint(), "Joined resolution superseded, returning uncached view");
        let entry = CacheEntry::new(key.clone(), resolution.records, resolution.tier);
        GapView::of(&entry, false)
    }

    /// The current page of whatever is cached.
    pub async fn current_view(&self) -> Option<GapView> {
        self.cache.read().await.current().map(|e| GapView::of(e, true))
    }

    pub async fn set_filter(&self, filter: FilterState) -> Result<GapView> {
        self.update_entry(|entry| {
            entry.set_filter(filter);
            Ok(())
        })
        .await
    }

    pub async fn set_page(&self, index: usize) -> Result<GapView> {
        self.update_entry(|entry| {
            entry.set_page(index);
            Ok(())
        })
        .await
    }

    pub async fn set_page_size(&self, page_size: usize) -> Result<GapView> {
        self.update_entry(|entry| entry.set_page_size(page_size)).await
    }

    async fn update_entry<F>(&self, update: F) -> Result<GapView>
    where
        F: FnOnce(&mut CacheEntry) -> Result<()>,
    {
        let view = {
            let mut cache = self.cache.write().await;
            let entry = cache
                .current_mut()
                .ok_or_else(|| GapError::Input("no gap list resolved yet".to_string()))?;
            update(entry)?;
            GapView::of(entry, true)
        };
        self.persist().await;
        Ok(view)
    }

    pub async fn select(&self, keyword: &str) -> Result<()> {
        self.selection.write().await.add(keyword)?;
        self.persist().await;
        Ok(())
    }

    pub async fn deselect(&self, keyword: &str) -> bool {
        let removed = self.selection.write().await.remove(keyword);
        if removed {
            self.persist().await;
        }
        removed
    }

    pub async fn is_selected(&self, keyword: &str) -> bool {
        self.selection.read().await.contains(keyword)
    }

    pub async fn selected(&self) -> Vec<String> {
        self.selection.read().await.all().to_vec()
    }

    /// Save cache and selection. Failures are logged; the session keeps
    /// working from memory.
    async fn persist(&self) {
        if let Err(e) = self
            .cache
            .read()
            .await
            .persist(self.store.as_ref(), &self.session_id)
            .await
        {
            warn!(session_id = %self.session_id, error = %e, "Failed to persist gap cache");
        }

        let keywords = self.selection.read().await.all().to_vec();
        let saved = match serde_json::to_vec(&keywords) {
            Ok(bytes) => self
                .store
                .save(&selection_key(&self.session_id), bytes)
                .await
                .map_err(|e| format!("{:#}", e)),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = saved {
            warn!(session_id = %self.session_id, error = %e, "Failed to persist selection");
        }
    }
}
