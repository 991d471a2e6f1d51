pub mod assisted;
pub mod direct;
pub mod prompts;
pub mod synthetic;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{GapError, Result};
use crate::gaps::types::{GapRecord, GapRequest, Resolution, Tier};
use crate::gaps::{self, check_coverage, min_per_competitor};

use assisted::{InferenceClient, InferenceRequest};
use direct::RankEnricher;
use synthetic::SyntheticFallback;

/// Three-tier gap resolution: direct extraction, assisted inference, then
/// synthetic fallback. Never fails once the request passes validation.
pub struct GapResolver {
    inference: Option<Arc<dyn InferenceClient>>,
    enricher: Option<Arc<dyn RankEnricher>>,
    fallback: SyntheticFallback,
    call_timeout: Duration,
}

impl GapResolver {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            inference: None,
            enricher: None,
            fallback: SyntheticFallback::new(),
            call_timeout,
        }
    }

    pub fn with_inference(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.inference = Some(client);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn RankEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_fallback(mut self, fallback: SyntheticFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub async fn resolve(&self, request: &GapRequest) -> Result<Resolution> {
        let request = gaps::prepare_request(request)?;
        let required = min_per_competitor(request.target_count, request.competitors.len());

        info!(
            domain = %request.domain,
            competitors = request.competitors.len(),
            corpus = request.corpus.len(),
            target_count = request.target_count,
            min_per_competitor = required,
            "Resolving keyword gaps"
        );

        match self.direct_tier(&request, required).await {
            Ok(records) => return Ok(self.accept(Tier::Direct, records)),
            Err(e) => self.fall_through(Tier::Direct, e)?,
        }

        match self.assisted_tier(&request, required).await {
            Ok(records) => return Ok(self.accept(Tier::Assisted, records)),
            Err(e) => self.fall_through(Tier::Assisted, e)?,
        }

        let records = self.fallback.synthesize_at_least(&request.competitors, required);
        Ok(self.accept(Tier::Synthetic, records))
    }

    fn accept(&self, tier: Tier, records: Vec<GapRecord>) -> Resolution {
        info!(%tier, records = records.len(), "Gap resolution accepted");
        Resolution { records, tier }
    }

    /// Decide whether a tier failure may degrade to the next tier.
    fn fall_through(&self, tier: Tier, err: GapError) -> Result<()> {
        if err.is_recoverable() {
            warn!(%tier, error = %err, "Tier rejected, falling through");
            Ok(())
        } else {
            Err(err)
        }
    }

    async fn direct_tier(&self, request: &GapRequest, required: usize) -> Result<Vec<GapRecord>> {
        let mut corpus = request.corpus.clone();

        if let Some(enricher) = &self.enricher {
            let missing = direct::keywords_missing_positions(&corpus);
            if !missing.is_empty() {
                let call =
                    enricher.competitor_positions(&missing, &request.competitors, request.location);
                match tokio::time::timeout(self.call_timeout, call).await {
                    Ok(Ok(positions)) => {
                        debug!(keywords = positions.len(), "Applied rank enrichment");
                        direct::apply_enrichment(&mut corpus, positions);
                    }
                    Ok(Err(e)) => warn!("Rank enrichment failed: {:#}", e),
                    Err(_) => warn!(timeout = ?self.call_timeout, "Rank enrichment timed out"),
                }
            }
        }

        let records = direct::extract(&corpus, &request.competitors, request.target_count);
        check_coverage(&records, &request.competitors, required)?;
        Ok(records)
    }

    async fn assisted_tier(&self, request: &GapRequest, required: usize) -> Result<Vec<GapRecord>> {
        let Some(client) = &self.inference else {
            return Err(GapError::Transport("no inference client configured".to_string()));
        };

        let payload =
            InferenceRequest::new(&request.domain, &request.competitors, &request.corpus, required);
        let response = tokio::time::timeout(self.call_timeout, client.infer_gaps(&payload)).await??;

        let records = assisted::validate_response(&response, &request.competitors)?;
        check_coverage(&records, &request.competitors, required)?;
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::gaps::competitor_counts;
    use crate::gaps::types::{ApiSource, KeywordRecord};

    /// Inference fake returning a canned response, counting calls.
    pub(crate) struct FakeInference {
        pub response: Option<Value>,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl FakeInference {
        pub(crate) fn returning(response: Value) -> Self {
            Self {
                response: Some(response),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                response: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn hanging() -> Self {
            Self {
                response: Some(json!([])),
                delay: Duration::from_secs(3600),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InferenceClient for FakeInference {
        async fn infer_gaps(&self, _request: &InferenceRequest) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    pub(crate) fn gap_corpus(per_competitor: usize, competitors: &[&str]) -> Vec<KeywordRecord> {
        let mut corpus = Vec::new();
        for i in 0..per_competitor {
            for competitor in competitors {
                corpus.push(KeywordRecord {
                    keyword: format!("{} keyword {}", competitor, i),
                    monthly_search_volume: 100 + i as u64,
                    competition_index: 40,
                    position: None,
                    competitor_positions: [(competitor.to_string(), Some(5))].into_iter().collect(),
                });
            }
        }
        corpus
    }

    pub(crate) fn inference_response(per_competitor: usize, competitors: &[&str]) -> Value {
        let gaps: Vec<Value> = competitors
            .iter()
            .flat_map(|c| {
                (0..per_competitor).map(move |i| {
                    json!({"keyword": format!("inferred {} {}", c, i), "volume": 300, "difficulty": 40, "competitor": c})
                })
            })
            .collect();
        json!({ "gaps": gaps })
    }

    pub(crate) fn request(corpus: Vec<KeywordRecord>, target_count: usize) -> GapRequest {
        GapRequest {
            domain: "https://www.example.com".to_string(),
            competitors: vec!["a.com".to_string(), "b.com".to_string()],
            corpus,
            target_count,
            source: ApiSource::DataForSeo,
            location: 2840,
        }
    }

    #[tokio::test]
    async fn test_direct_tier_accepted() {
        let inference = Arc::new(FakeInference::failing());
        let resolver = GapResolver::new(Duration::from_secs(5)).with_inference(inference.clone());

        let resolution = resolver
            .resolve(&request(gap_corpus(20, &["a.com", "b.com"]), 30))
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Direct);
        assert!(resolution.records.len() >= 30);
        let counts = competitor_counts(&resolution.records);
        assert!(counts["a.com"] >= 15);
        assert!(counts["b.com"] >= 15);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_assisted_tier_when_direct_is_thin() {
        let mut corpus = gap_corpus(3, &["a.com", "b.com"]);
        corpus.truncate(5);
        let inference = Arc::new(FakeInference::returning(inference_response(12, &["a.com", "b.com"])));
        let resolver = GapResolver::new(Duration::from_secs(5)).with_inference(inference.clone());

        let resolution = resolver.resolve(&request(corpus, 24)).await.unwrap();

        assert_eq!(resolution.tier, Tier::Assisted);
        assert_eq!(resolution.records.len(), 24);
        assert!(resolution.records.iter().all(|r| r.keyword.starts_with("inferred")));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_assisted_without_coverage_falls_through() {
        let inference = Arc::new(FakeInference::returning(inference_response(12, &["a.com"])));
        let resolver = GapResolver::new(Duration::from_secs(5)).with_inference(inference);

        let resolution = resolver.resolve(&request(vec![], 24)).await.unwrap();
        assert_eq!(resolution.tier, Tier::Synthetic);
    }

    #[tokio::test]
    async fn test_malformed_inference_falls_through() {
        let inference = Arc::new(FakeInference::returning(json!({"gaps": [{"keyword": "x"}]})));
        let resolver = GapResolver::new(Duration::from_secs(5)).with_inference(inference);

        let resolution = resolver.resolve(&request(vec![], 24)).await.unwrap();
        assert_eq!(resolution.tier, Tier::Synthetic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_through_to_synthetic() {
        let inference = Arc::new(FakeInference::hanging());
        let resolver = GapResolver::new(Duration::from_secs(60)).with_inference(inference);

        let resolution = resolver.resolve(&request(vec![], 24)).await.unwrap();

        assert_eq!(resolution.tier, Tier::Synthetic);
        assert_eq!(resolution.records.len(), 24);
        for competitor in ["a.com", "b.com"] {
            let suffix = format!(" {}", competitor.trim_end_matches(".com"));
            let named = resolution
                .records
                .iter()
                .filter(|r| r.competitor == competitor && r.keyword.ends_with(&suffix))
                .count();
            assert!(named >= 1);
        }
    }

    #[tokio::test]
    async fn test_synthetic_meets_coverage_floor() {
        // Default target of 30 over two competitors needs 15 each.
        let resolver = GapResolver::new(Duration::from_secs(5)).with_fallback(SyntheticFallback::with_seed(9));
        let resolution = resolver.resolve(&request(vec![], 30)).await.unwrap();

        assert_eq!(resolution.tier, Tier::Synthetic);
        assert_eq!(resolution.records.len(), 30);
        let competitors = vec!["a.com".to_string(), "b.com".to_string()];
        assert!(check_coverage(&resolution.records, &competitors, 15).is_ok());
        let counts = competitor_counts(&resolution.records);
        assert_eq!(counts["a.com"], 15);
        assert_eq!(counts["b.com"], 15);
    }

    #[tokio::test]
    async fn test_no_inference_client_uses_synthetic() {
        let resolver = GapResolver::new(Duration::from_secs(5)).with_fallback(SyntheticFallback::with_seed(1));
        let resolution = resolver.resolve(&request(vec![], 10)).await.unwrap();
        assert_eq!(resolution.tier, Tier::Synthetic);
        check_coverage(
            &resolution.records,
            &["a.com".to_string(), "b.com".to_string()],
            12,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_input_error_surfaces() {
        let resolver = GapResolver::new(Duration::from_secs(5));
        let mut req = request(vec![], 10);
        req.competitors.clear();
        assert!(matches!(resolver.resolve(&req).await, Err(GapError::Input(_))));
    }

    struct FixedEnricher;

    #[async_trait]
    impl RankEnricher for FixedEnricher {
        async fn competitor_positions(
            &self,
            keywords: &[String],
            _competitors: &[String],
            _location: u32,
        ) -> anyhow::Result<std::collections::HashMap<String, std::collections::HashMap<String, Option<u32>>>> {
            Ok(keywords
                .iter()
                .enumerate()
                .map(|(i, k)| {
                    let competitor = if i % 2 == 0 { "a.com" } else { "b.com" };
                    (k.clone(), [(competitor.to_string(), Some(3))].into_iter().collect())
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_enrichment_feeds_direct_tier() {
        let corpus: Vec<KeywordRecord> = (0..10)
            .map(|i| KeywordRecord {
                keyword: format!("bare {}", i),
                monthly_search_volume: 200,
                competition_index: 10,
                ..Default::default()
            })
            .collect();
        let resolver = GapResolver::new(Duration::from_secs(5)).with_enricher(Arc::new(FixedEnricher));

        let resolution = resolver.resolve(&request(corpus, 10)).await.unwrap();
        assert_eq!(resolution.tier, Tier::Direct);
        assert_eq!(resolution.records.len(), 10);
    }
}
