//! Keyword gap resolution and caching for SEO competitor analysis.
//!
//! [`state::GapAnalysis`] is the entry point: it owns the single-slot
//! [`cache::GapCache`], the user's [`session::selection::SelectionSet`] and
//! the in-flight guard, and delegates resolution to
//! [`resolver::GapResolver`].

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod gaps;
pub mod llm;
pub mod resolver;
pub mod session;
pub mod state;

pub use cache::view::{FilterState, PageInfo, PageState};
pub use cache::{CacheEntry, CacheKey, GapCache};
pub use error::{GapError, Result};
pub use gaps::types::{ApiSource, GapRecord, GapRequest, KeywordRecord, Opportunity, Resolution, Tier};
pub use resolver::GapResolver;
pub use state::{GapAnalysis, GapView};
