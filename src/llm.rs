use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolver::assisted::{InferenceClient, InferenceRequest};
use crate::resolver::prompts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat-completions client used for assisted gap inference.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:1234/v1".to_string());
        let model =
            dotenv::var("LLM_MODEL").unwrap_or_else(|_| "qwen/qwen3-8b".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.2,
            "max_tokens": 4096,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            anyhow::bail!("LLM returned {}: {}", status, snippet);
        }
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        // Extract content from choices[0].message.content (handle null)
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl InferenceClient for LlmClient {
    async fn infer_gaps(&self, request: &InferenceRequest) -> Result<serde_json::Value> {
        let sample = serde_json::to_string(&request.sample_corpus).context("serialize corpus sample")?;
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: prompts::SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: prompts::gap_request_prompt(
                    &request.domain_name,
                    &request.competitor_names,
                    &sample,
                    request.min_per_competitor,
                ),
            },
        ];

        let reply = self.chat(&messages).await?;
        debug!(reply_len = reply.len(), "Gap inference reply");

        let payload = prompts::extract_json(&reply)
            .ok_or_else(|| anyhow::anyhow!("LLM reply contained no JSON"))?;
        serde_json::from_str(payload).context("LLM reply JSON is malformed")
    }
}
