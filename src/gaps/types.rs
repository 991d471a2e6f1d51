use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GapError;

/// Opportunity level of a gap, derived from volume and difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opportunity {
    High,
    Medium,
    Low,
}

impl Opportunity {
    pub fn derive(volume: u64, difficulty: u8) -> Self {
        if volume > 500 && difficulty < 30 {
            Opportunity::High
        } else if volume < 100 && difficulty > 60 {
            Opportunity::Low
        } else {
            Opportunity::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Opportunity::High => "high",
            Opportunity::Medium => "medium",
            Opportunity::Low => "low",
        }
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword a competitor ranks for and the analyzed domain does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub keyword: String,
    pub volume: u64,
    /// 0..=100
    pub difficulty: u8,
    pub opportunity: Opportunity,
    /// Normalized competitor domain.
    pub competitor: String,
    #[serde(default)]
    pub rank: Option<u32>,
}

impl GapRecord {
    /// Build a record, trimming the keyword, clamping difficulty and deriving
    /// the opportunity level.
    pub fn new(
        keyword: &str,
        volume: u64,
        difficulty: u32,
        competitor: &str,
        rank: Option<u32>,
    ) -> Self {
        let difficulty = difficulty.min(100) as u8;
        Self {
            keyword: keyword.trim().to_string(),
            volume,
            difficulty,
            opportunity: Opportunity::derive(volume, difficulty),
            competitor: competitor.to_string(),
            rank,
        }
    }
}

/// Raw keyword data for the analyzed domain, as returned by a corpus provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
    pub keyword: String,
    #[serde(default)]
    pub monthly_search_volume: u64,
    /// Competition on a 0-100 scale, used as keyword difficulty.
    #[serde(default)]
    pub competition_index: u32,
    /// The analyzed domain's own position, if it ranks.
    #[serde(default)]
    pub position: Option<u32>,
    /// Competitor positions keyed by (unnormalized) domain.
    #[serde(default)]
    pub competitor_positions: HashMap<String, Option<u32>>,
}

/// Data source the corpus was fetched from. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSource {
    DataForSeo,
    Manual,
}

impl FromStr for ApiSource {
    type Err = GapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dataforseo" | "data_for_seo" | "data-for-seo" => Ok(ApiSource::DataForSeo),
            "manual" => Ok(ApiSource::Manual),
            other => Err(GapError::Input(format!("unknown api source '{}'", other))),
        }
    }
}

impl fmt::Display for ApiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiSource::DataForSeo => f.write_str("dataforseo"),
            ApiSource::Manual => f.write_str("manual"),
        }
    }
}

/// Which resolution strategy produced a gap list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Direct,
    Assisted,
    Synthetic,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Direct => f.write_str("direct"),
            Tier::Assisted => f.write_str("assisted"),
            Tier::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Everything needed to resolve one gap list.
#[derive(Debug, Clone)]
pub struct GapRequest {
    pub domain: String,
    pub competitors: Vec<String>,
    pub corpus: Vec<KeywordRecord>,
    pub target_count: usize,
    pub source: ApiSource,
    pub location: u32,
}

/// An accepted gap list and the tier that produced it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<GapRecord>,
    pub tier: Tier,
}
