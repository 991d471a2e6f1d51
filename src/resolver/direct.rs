use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::debug;

use crate::domain;
use crate::gaps::types::{GapRecord, KeywordRecord};

/// Positions at or better than this count as ranking.
pub const RANKING_THRESHOLD: u32 = 30;

/// Looks up competitor SERP positions for keywords the corpus has no
/// competitor data for.
#[async_trait]
pub trait RankEnricher: Send + Sync {
    /// Returns `keyword -> (competitor domain -> position)`.
    async fn competitor_positions(
        &self,
        keywords: &[String],
        competitors: &[String],
        location: u32,
    ) -> anyhow::Result<HashMap<String, HashMap<String, Option<u32>>>>;
}

/// Keywords in the corpus that carry no competitor positions at all.
pub fn keywords_missing_positions(corpus: &[KeywordRecord]) -> Vec<String> {
    corpus
        .iter()
        .filter(|r| r.competitor_positions.values().all(Option::is_none))
        .map(|r| r.keyword.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Merge enrichment results into the corpus. Existing positions win.
pub fn apply_enrichment(
    corpus: &mut [KeywordRecord],
    positions: HashMap<String, HashMap<String, Option<u32>>>,
) {
    for record in corpus.iter_mut() {
        if let Some(found) = positions.get(record.keyword.trim()) {
            for (competitor, position) in found {
                let slot = record
                    .competitor_positions
                    .entry(competitor.clone())
                    .or_insert(None);
                if slot.is_none() {
                    *slot = *position;
                }
            }
        }
    }
}

fn ranks(position: Option<u32>) -> bool {
    matches!(position, Some(p) if (1..=RANKING_THRESHOLD).contains(&p))
}

/// Best-ranking requested competitor for a keyword. Ties go to the competitor
/// listed first.
fn best_competitor<'a>(
    record: &KeywordRecord,
    competitors: &'a [String],
) -> Option<(&'a String, u32)> {
    // Raw keys like `a.com` and `www.a.com` collapse; keep the better rank.
    let mut positions: HashMap<String, u32> = HashMap::new();
    for (raw, position) in &record.competitor_positions {
        if let Some(position) = position {
            let slot = positions.entry(domain::normalize(raw)).or_insert(*position);
            *slot = (*slot).min(*position);
        }
    }

    let mut best: Option<(&String, u32)> = None;
    for competitor in competitors {
        let Some(&position) = positions.get(competitor) else {
            continue;
        };
        if !ranks(Some(position)) {
            continue;
        }
        if best.map_or(true, |(_, p)| position < p) {
            best = Some((competitor, position));
        }
    }
    best
}

/// Pull gaps straight out of the corpus: keywords where the domain is absent
/// from the top 30 and some competitor is in it. Stops at `target_count`.
pub fn extract(corpus: &[KeywordRecord], competitors: &[String], target_count: usize) -> Vec<GapRecord> {
    let mut gaps = Vec::new();
    let mut seen = HashSet::new();

    for record in corpus {
        if gaps.len() >= target_count {
            break;
        }
        let keyword = record.keyword.trim();
        if keyword.is_empty() || ranks(record.position) {
            continue;
        }
        let Some((competitor, position)) = best_competitor(record, competitors) else {
            continue;
        };
        if !seen.insert(keyword.to_lowercase()) {
            continue;
        }
        gaps.push(GapRecord::new(
            keyword,
            record.monthly_search_volume,
            record.competition_index,
            competitor,
            Some(position),
        ));
    }

    debug!(
        corpus = corpus.len(),
        extracted = gaps.len(),
        target_count,
        "direct extraction finished"
    );
    gaps
}
