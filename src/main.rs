use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};

use keyword_gap::config::EngineConfig;
use keyword_gap::llm::LlmClient;
use keyword_gap::session::CnidariumStore;
use keyword_gap::{GapAnalysis, GapRequest, GapResolver, KeywordRecord};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    let level = dotenv::var("GAP_LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(Level::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = EngineConfig::from_env();
    info!(?config, "Engine configuration loaded");

    let domain = dotenv::var("GAP_DOMAIN").context("GAP_DOMAIN required")?;
    let competitors: Vec<String> = dotenv::var("GAP_COMPETITORS")
        .context("GAP_COMPETITORS required")?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let session_id = dotenv::var("GAP_SESSION_ID").unwrap_or_else(|_| "default".to_string());

    // Corpus file is optional; resolution degrades without one
    let corpus: Vec<KeywordRecord> = match dotenv::var("GAP_CORPUS_PATH") {
        Ok(path) => {
            let raw = std::fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
            serde_json::from_slice(&raw).with_context(|| format!("Invalid corpus in {}", path))?
        }
        Err(_) => {
            warn!("GAP_CORPUS_PATH not set, resolving with an empty corpus");
            Vec::new()
        }
    };

    // Init storage
    let data_dir = PathBuf::from(
        dotenv::var("GAP_DATA_DIR").unwrap_or_else(|_| "./data/sessions".to_string()),
    );
    let store = Arc::new(CnidariumStore::new(&data_dir).await?);
    info!("Session store initialized at {:?}", data_dir);

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!("LLM client initialized");

    let resolver = Arc::new(GapResolver::new(config.call_timeout).with_inference(llm_client));
    let analysis = GapAnalysis::new(&session_id, resolver, store);
    if let Err(e) = analysis.restore().await {
        warn!("Could not restore session {}: {}", session_id, e);
    }

    let request = GapRequest {
        domain,
        competitors,
        corpus,
        target_count: config.target_count,
        source: config.source,
        location: config.location,
    };

    let view = if dotenv::var("GAP_REFRESH").is_ok() {
        analysis.refresh(&request).await?
    } else {
        analysis.analyze(&request).await?
    };

    info!(
        tier = %view.tier,
        cache_hit = view.cache_hit,
        total = view.page.total_items,
        page = view.page.index,
        pages = view.page.total_pages,
        "Gap analysis ready"
    );
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
