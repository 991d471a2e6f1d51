use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain;
use crate::error::{GapError, Result};
use crate::gaps::types::{GapRecord, KeywordRecord};

/// Corpus records sent to the inference collaborator.
pub const SAMPLE_SIZE: usize = 50;

/// Payload for the inference collaborator.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub domain_name: String,
    pub competitor_names: Vec<String>,
    pub sample_corpus: Vec<KeywordRecord>,
    pub min_per_competitor: usize,
}

impl InferenceRequest {
    pub fn new(
        domain_name: &str,
        competitor_names: &[String],
        corpus: &[KeywordRecord],
        min_per_competitor: usize,
    ) -> Self {
        Self {
            domain_name: domain_name.to_string(),
            competitor_names: competitor_names.to_vec(),
            sample_corpus: corpus.iter().take(SAMPLE_SIZE).cloned().collect(),
            min_per_competitor,
        }
    }
}

/// A model (or anything else) that proposes gaps from a corpus sample.
///
/// Output is untrusted: it comes back as raw JSON and goes through
/// [`validate_response`] before use.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer_gaps(&self, request: &InferenceRequest) -> anyhow::Result<Value>;
}

/// Accepts either a bare array or an object with a `gaps` array.
fn gap_array(response: &Value) -> Result<&Vec<Value>> {
    let array = match response {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("gaps") {
            Some(Value::Array(items)) => items,
            _ => return Err(GapError::Validation("response has no `gaps` array".to_string())),
        },
        _ => return Err(GapError::Validation("response is not an array".to_string())),
    };
    if array.is_empty() {
        return Err(GapError::Validation("response contains no gaps".to_string()));
    }
    Ok(array)
}

fn non_negative_int(item: &Value, field: &str, index: usize) -> Result<u64> {
    let value = item
        .get(field)
        .ok_or_else(|| GapError::Validation(format!("gap {} is missing `{}`", index, field)))?;
    let number = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()));
    number.ok_or_else(|| GapError::Validation(format!("gap {} has invalid `{}`", index, field)))
}

/// Turn an untrusted response into gap records.
///
/// Every element must be an object with a non-empty `keyword`, numeric
/// `volume` and `difficulty`, and a `competitor` from the requested set.
/// Any bad element rejects the whole response.
pub fn validate_response(response: &Value, competitors: &[String]) -> Result<Vec<GapRecord>> {
    let allowed: HashSet<&str> = competitors.iter().map(String::as_str).collect();
    let mut records = Vec::new();

    for (index, item) in gap_array(response)?.iter().enumerate() {
        if !item.is_object() {
            return Err(GapError::Validation(format!("gap {} is not an object", index)));
        }

        let competitor = item
            .get("competitor")
            .and_then(Value::as_str)
            .map(domain::normalize)
            .ok_or_else(|| GapError::Validation(format!("gap {} is missing `competitor`", index)))?;
        if !allowed.contains(competitor.as_str()) {
            return Err(GapError::Validation(format!(
                "gap {} names unrequested competitor '{}'",
                index, competitor
            )));
        }

        let keyword = item
            .get("keyword")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GapError::Validation(format!("gap {} is missing `keyword`", index)))?;

        let volume = non_negative_int(item, "volume", index)?;
        let difficulty = non_negative_int(item, "difficulty", index)?;
        if difficulty > 100 {
            return Err(GapError::Validation(format!(
                "gap {} has difficulty {} outside 0-100",
                index, difficulty
            )));
        }
        let rank = item
            .get("rank")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok());

        records.push(GapRecord::new(keyword, volume, difficulty as u32, &competitor, rank));
    }

    Ok(records)
}
