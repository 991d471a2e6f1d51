//! Paged, filtered views over a cached gap list.
//!
//! Everything here reads `CacheEntry::records` and never writes to it. Filter
//! order is competitor, volume, difficulty, then category.

use serde::{Deserialize, Serialize};

use super::CacheEntry;
use crate::gaps::types::GapRecord;

/// Wildcard value for the competitor and category filters.
pub const ALL: &str = "all";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Normalized competitor domain or `"all"`.
    pub competitor: String,
    /// Inclusive.
    pub volume_range: (u64, u64),
    /// Inclusive.
    pub difficulty_range: (u8, u8),
    /// Opportunity label (`high`, `medium`, `low`) or `"all"`.
    pub category: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            competitor: ALL.to_string(),
            volume_range: (0, u64::MAX),
            difficulty_range: (0, 100),
            category: ALL.to_string(),
        }
    }
}

impl FilterState {
    fn is_wildcard(value: &str) -> bool {
        value.is_empty() || value.eq_ignore_ascii_case(ALL)
    }

    pub fn matches(&self, record: &GapRecord) -> bool {
        (Self::is_wildcard(&self.competitor) || record.competitor == self.competitor)
            && (self.volume_range.0..=self.volume_range.1).contains(&record.volume)
            && (self.difficulty_range.0..=self.difficulty_range.1).contains(&record.difficulty)
            && (Self::is_wildcard(&self.category)
                || record.opportunity.as_str().eq_ignore_ascii_case(self.category.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// 1-based.
    pub index: usize,
    pub page_size: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            index: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Summary of the current page for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub index: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Number of non-empty pages for `total` items.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Records passing the entry's filter, in cached order.
pub fn filtered<'a>(records: &'a [GapRecord], filter: &FilterState) -> Vec<&'a GapRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Slice out one page, clamped to bounds.
pub fn paginate<T: Clone>(items: &[T], page: PageState) -> Vec<T> {
    if page.page_size == 0 || page.index == 0 {
        return Vec::new();
    }
    let start = (page.index - 1).saturating_mul(page.page_size).min(items.len());
    let end = page.index.saturating_mul(page.page_size).min(items.len());
    items[start..end].to_vec()
}

/// The visible slice of an entry under its filter and page cursor.
pub fn view(entry: &CacheEntry) -> Vec<GapRecord> {
    let matching = filtered(&entry.records, &entry.filter);
    paginate(&matching, entry.page).into_iter().cloned().collect()
}

pub fn page_info(entry: &CacheEntry) -> PageInfo {
    let total_items = filtered(&entry.records, &entry.filter).len();
    PageInfo {
        index: entry.page.index,
        page_size: entry.page.page_size,
        total_items,
        total_pages: page_count(total_items, entry.page.page_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::gaps::types::{ApiSource, GapRecord, Tier};

    fn records() -> Vec<GapRecord> {
        (0..25)
            .map(|i| {
                let competitor = if i % 2 == 0 { "a.com" } else { "b.com" };
                GapRecord::new(&format!("kw {}", i), i * 50, ((i * 4) % 50) as u32, competitor, None)
            })
            .collect()
    }

    fn entry() -> CacheEntry {
        let key = CacheKey::new("example.com", &["a.com".to_string(), "b.com".to_string()], 25, 2840, ApiSource::DataForSeo);
        CacheEntry::new(key, records(), Tier::Direct)
    }

    #[test]
    fn test_default_view_is_first_page() {
        let entry = entry();
        let page = view(&entry);
        assert_eq!(page.len(), DEFAULT_PAGE_SIZE);
        assert_eq!(page[0].keyword, "kw 0");
        assert_eq!(page_info(&entry).total_pages, 3);
    }

    #[test]
    fn test_filter_by_competitor_and_ranges() {
        let mut entry = entry();
        entry.set_filter(FilterState {
            competitor: "a.com".to_string(),
            volume_range: (100, 600),
            difficulty_range: (0, 40),
            category: ALL.to_string(),
        });
        let keywords: Vec<String> = view(&entry).into_iter().map(|r| r.keyword).collect();
        // even i, volume i*50 in [100,600], difficulty i*4 <= 40
        assert_eq!(keywords, vec!["kw 2", "kw 4", "kw 6", "kw 8", "kw 10"]);
    }

    #[test]
    fn test_filter_by_category() {
        let mut entry = entry();
        entry.set_filter(FilterState {
            category: "HIGH".to_string(),
            ..Default::default()
        });
        let page = view(&entry);
        assert!(!page.is_empty());
        assert!(page.iter().all(|r| r.volume > 500 && r.difficulty < 30));
    }

    #[test]
    fn test_view_does_not_mutate_records() {
        let mut entry = entry();
        let before = entry.records.clone();
        entry.set_filter(FilterState {
            competitor: "b.com".to_string(),
            ..Default::default()
        });
        let _ = view(&entry);
        assert_eq!(entry.records, before);
    }

    #[test]
    fn test_pages_concatenate_to_filtered_list() {
        let items: Vec<u32> = (0..23).collect();
        for page_size in 1..=30 {
            let pages = page_count(items.len(), page_size);
            let mut joined = Vec::new();
            let mut non_empty = 0;
            for index in 1..=pages + 2 {
                let page = paginate(&items, PageState { index, page_size });
                if !page.is_empty() {
                    non_empty += 1;
                }
                joined.extend(page);
            }
            assert_eq!(non_empty, pages);
            assert_eq!(joined, items);
        }
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let items = vec![1, 2, 3];
        assert!(paginate(&items, PageState { index: 5, page_size: 2 }).is_empty());
        assert!(paginate(&items, PageState { index: 0, page_size: 2 }).is_empty());
        assert_eq!(paginate(&items, PageState { index: 2, page_size: 2 }), vec![3]);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut entry = entry();
        entry.set_page(3);
        assert_eq!(entry.page.index, 3);
        entry.set_filter(FilterState {
            competitor: "a.com".to_string(),
            ..Default::default()
        });
        assert_eq!(entry.page.index, 1);
    }

    #[test]
    fn test_page_size_change_clamps() {
        let mut entry = entry();
        entry.set_page(3);
        entry.set_page_size(5).unwrap();
        // 25 items / 5 = 5 pages, index 3 still valid
        assert_eq!(entry.page.index, 3);
        entry.set_page_size(20).unwrap();
        assert_eq!(entry.page.index, 2);
        assert!(entry.set_page_size(0).is_err());
        assert_eq!(entry.page.page_size, 20);
    }

    #[test]
    fn test_set_page_clamps_to_range() {
        let mut entry = entry();
        entry.set_page(99);
        assert_eq!(entry.page.index, 3);
        entry.set_page(0);
        assert_eq!(entry.page.index, 1);
    }
}
