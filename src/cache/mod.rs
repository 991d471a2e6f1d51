pub mod view;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain;
use crate::error::{GapError, Result};
use crate::gaps::types::{ApiSource, GapRecord, GapRequest, Tier};
use crate::session::{entry_key, SessionStore};

use view::{page_count, FilterState, PageState, ALL};

/// Composite key deciding when a resolved gap list may be reused.
///
/// Competitors are normalized, sorted and deduplicated so reordering the
/// input list never invalidates the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub domain: String,
    pub competitors: Vec<String>,
    pub corpus_size: usize,
    pub location: u32,
    pub source: ApiSource,
}

impl CacheKey {
    pub fn new(
        domain: &str,
        competitors: &[String],
        corpus_size: usize,
        location: u32,
        source: ApiSource,
    ) -> Self {
        let mut competitors: Vec<String> = domain::normalize_list(competitors)
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect();
        competitors.sort();
        competitors.dedup();
        Self {
            domain: domain::normalize(domain),
            competitors,
            corpus_size,
            location,
            source,
        }
    }

    pub fn from_request(request: &GapRequest) -> Self {
        Self::new(
            &request.domain,
            &request.competitors,
            request.corpus.len(),
            request.location,
            request.source,
        )
    }

    /// Stable blake3 hex digest of the key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        for competitor in &self.competitors {
            hasher.update(b"\0");
            hasher.update(competitor.as_bytes());
        }
        hasher.update(b"\0");
        hasher.update(&(self.corpus_size as u64).to_le_bytes());
        hasher.update(&self.location.to_le_bytes());
        hasher.update(self.source.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Which key component differs from `other`, if any.
    pub fn invalidation_reason(&self, other: &CacheKey) -> Option<&'static str> {
        if self.domain != other.domain {
            Some("domain changed")
        } else if self.competitors != other.competitors {
            Some("competitor set changed")
        } else if self.corpus_size != other.corpus_size {
            Some("corpus size changed")
        } else if self.location != other.location {
            Some("location changed")
        } else if self.source != other.source {
            Some("api source changed")
        } else {
            None
        }
    }
}

/// One resolved gap list plus the view state layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub records: Vec<GapRecord>,
    pub tier: Tier,
    pub resolved_at: DateTime<Utc>,
    pub filter: FilterState,
    pub page: PageState,
}

impl CacheEntry {
    pub fn new(key: CacheKey, records: Vec<GapRecord>, tier: Tier) -> Self {
        Self {
            key,
            records,
            tier,
            resolved_at: Utc::now(),
            filter: FilterState::default(),
            page: PageState::default(),
        }
    }

    fn total_pages(&self, page_size: usize) -> usize {
        let matching = view::filtered(&self.records, &self.filter).len();
        page_count(matching, page_size).max(1)
    }

    /// Replace the filter. Any change sends the cursor back to page 1.
    pub fn set_filter(&mut self, mut filter: FilterState) {
        if !filter.competitor.eq_ignore_ascii_case(ALL) {
            filter.competitor = domain::normalize(&filter.competitor);
        }
        if filter != self.filter {
            self.filter = filter;
            self.page.index = 1;
        }
    }

    /// Move to a page, clamped to `1..=total_pages`.
    pub fn set_page(&mut self, index: usize) {
        self.page.index = index.clamp(1, self.total_pages(self.page.page_size));
    }

    /// Change the page size, keeping the index when still valid and clamping
    /// to the last page otherwise.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(GapError::Input("page size must be positive".to_string()));
        }
        let last = self.total_pages(page_size);
        self.page = PageState {
            index: self.page.index.clamp(1, last),
            page_size,
        };
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    fingerprint: String,
    entry: CacheEntry,
}

/// Single-slot memo of the most recently resolved gap list.
#[derive(Debug, Default)]
pub struct GapCache {
    slot: Option<CacheEntry>,
}

impl GapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached entry, if it was resolved for exactly this key.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.slot.as_ref().filter(|entry| &entry.key == key)
    }

    pub fn current(&self) -> Option<&CacheEntry> {
        self.slot.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut CacheEntry> {
        self.slot.as_mut()
    }

    /// Store a freshly resolved list, replacing whatever was cached.
    pub fn put(&mut self, key: CacheKey, records: Vec<GapRecord>, tier: Tier) -> &CacheEntry {
        if let Some(old) = &self.slot {
            match old.key.invalidation_reason(&key) {
                Some(reason) => info!(reason, "Replacing cached gap list"),
                None => debug!("Refreshing cached gap list for the same key"),
            }
        }
        self.slot.insert(CacheEntry::new(key, records, tier))
    }

    /// Drop the cached entry.
    pub fn invalidate(&mut self) -> Option<CacheEntry> {
        self.slot.take()
    }

    /// Save the slot (empty bytes when cleared) under the session's key.
    pub async fn persist(&self, store: &dyn SessionStore, session_id: &str) -> Result<()> {
        let bytes = match &self.slot {
            Some(entry) => serde_json::to_vec(&PersistedEntry {
                fingerprint: entry.key.fingerprint(),
                entry: entry.clone(),
            })
            .map_err(|e| GapError::Storage(e.to_string()))?,
            None => Vec::new(),
        };
        store
            .save(&entry_key(session_id), bytes)
            .await
            .map_err(|e| GapError::Storage(format!("{:#}", e)))
    }

    /// Load the session's saved entry. Returns whether an entry was restored.
    pub async fn restore(&mut self, store: &dyn SessionStore, session_id: &str) -> Result<bool> {
        let bytes = store
            .load(&entry_key(session_id))
            .await
            .map_err(|e| GapError::Storage(format!("{:#}", e)))?;
        let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
            return Ok(false);
        };

        let persisted: PersistedEntry = match serde_json::from_slice(&bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!(session_id, "Discarding unreadable cached entry: {}", e);
                return Ok(false);
            }
        };
        if persisted.entry.key.fingerprint() != persisted.fingerprint {
            warn!(session_id, "Discarding cached entry with mismatched fingerprint");
            return Ok(false);
        }

        debug!(
            session_id,
            records = persisted.entry.records.len(),
            fingerprint = %persisted.fingerprint,
            "Restored cached gap list"
        );
        self.slot = Some(persisted.entry);
        Ok(true)
    }
}
