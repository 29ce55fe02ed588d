//! `reqwest`-backed [`LlmClient`] against an Anthropic-style messages API
//! (spec §1, §4.A).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roomforge_core::LlmClient;
use serde_json::Value;
use tracing::warn;

pub struct HttpLlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("roomforge-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client, base_url, api_key }
    }

    async fn complete(&self, prompt: &str, input: &Value) -> Option<Value> {
        let body = serde_json::json!({
            "model": "claude-3-5-sonnet-latest",
            "max_tokens": 8192,
            "system": prompt,
            "messages": [{
                "role": "user",
                "content": input.to_string(),
            }],
        });

        let resp = match self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("llm request failed: {e}");
                return None;
            }
        };

        let resp = match resp.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                warn!("llm provider returned an error status: {e}");
                return None;
            }
        };

        let parsed: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("llm response body was not JSON: {e}");
                return None;
            }
        };

        let text = parsed
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())?;

        serde_json::from_str::<Value>(text).ok()
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate_scenario(&self, prompt: &str, input: Value) -> Option<Value> {
        self.complete(prompt, &input).await
    }

    async fn generate_scripts(
        &self,
        prompt: &str,
        input: Value,
    ) -> Option<HashMap<String, String>> {
        let value = self.complete(prompt, &input).await?;
        serde_json::from_value(value).ok()
    }
}
