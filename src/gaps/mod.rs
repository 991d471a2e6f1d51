pub mod types;

use std::collections::{HashMap, HashSet};

use crate::domain;
use crate::error::{GapError, Result};

use types::{GapRecord, GapRequest};

/// `ceil(target_count / competitors)`, the per-competitor coverage floor.
pub fn min_per_competitor(target_count: usize, competitors: usize) -> usize {
    if competitors == 0 {
        return 0;
    }
    target_count.div_ceil(competitors)
}

/// Count records per competitor.
pub fn competitor_counts(records: &[GapRecord]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.competitor.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Check that every competitor has at least `required` records and that no
/// record belongs to a competitor outside the requested set.
pub fn check_coverage(records: &[GapRecord], competitors: &[String], required: usize) -> Result<()> {
    let allowed: HashSet<&str> = competitors.iter().map(String::as_str).collect();
    if let Some(stray) = records.iter().find(|r| !allowed.contains(r.competitor.as_str())) {
        return Err(GapError::Validation(format!(
            "record '{}' attributed to unrequested competitor '{}'",
            stray.keyword, stray.competitor
        )));
    }

    let counts = competitor_counts(records);
    for competitor in competitors {
        let found = counts.get(competitor.as_str()).copied().unwrap_or(0);
        if found < required {
            return Err(GapError::InsufficientCoverage {
                competitor: competitor.clone(),
                found,
                required,
            });
        }
    }
    Ok(())
}

/// Validate a request and normalize its domain and competitors.
///
/// Competitors are normalized, blank entries dropped and duplicates removed
/// keeping first occurrence order. An empty corpus is allowed.
pub fn prepare_request(request: &GapRequest) -> Result<GapRequest> {
    let domain = domain::normalize(&request.domain);
    if domain.is_empty() {
        return Err(GapError::Input("domain is empty".to_string()));
    }

    let mut seen = HashSet::new();
    let competitors: Vec<String> = domain::normalize_list(&request.competitors)
        .into_iter()
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.clone()))
        .collect();
    if competitors.is_empty() {
        return Err(GapError::Input("no competitors supplied".to_string()));
    }

    if request.target_count == 0 {
        return Err(GapError::Input("target count must be positive".to_string()));
    }

    Ok(GapRequest {
        domain,
        competitors,
        corpus: request.corpus.clone(),
        target_count: request.target_count,
        source: request.source,
        location: request.location,
    })
}
