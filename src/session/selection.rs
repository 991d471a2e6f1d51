use std::collections::HashSet;

use crate::error::{GapError, Result};

/// Most keywords a user may select for content generation.
pub const MAX_SELECTED: usize = 10;

/// Ordered, bounded set of keywords picked by the user.
///
/// Keyed only by keyword string; independent of the gap cache. Callers prune
/// it with [`SelectionSet::retain_in`] when the keyword universe changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    keywords: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored keywords, dropping blanks, duplicates and anything
    /// past the limit.
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for keyword in keywords {
            let _ = set.add(keyword.as_ref());
        }
        set
    }

    /// Add a keyword. Re-adding a selected keyword is a no-op; adding an
    /// 11th keyword fails and leaves the set unchanged.
    pub fn add(&mut self, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(GapError::Input("keyword is empty".to_string()));
        }
        if self.contains(keyword) {
            return Ok(());
        }
        if self.keywords.len() >= MAX_SELECTED {
            return Err(GapError::LimitExceeded { limit: MAX_SELECTED });
        }
        self.keywords.push(keyword.to_string());
        Ok(())
    }

    /// Returns whether the keyword was selected.
    pub fn remove(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        let before = self.keywords.len();
        self.keywords.retain(|k| k != keyword);
        self.keywords.len() != before
    }

    pub fn contains(&self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        self.keywords.iter().any(|k| k == keyword)
    }

    /// Selected keywords in insertion order.
    pub fn all(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keep only keywords present in `universe`; returns the ones dropped.
    pub fn retain_in(&mut self, universe: &HashSet<&str>) -> Vec<String> {
        let (kept, dropped): (Vec<String>, Vec<String>) = self
            .keywords
            .drain(..)
            .partition(|k| universe.contains(k.as_str()));
        self.keywords = kept;
        dropped
    }
}
