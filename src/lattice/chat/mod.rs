// SPDX-License-Identifier: MIT

//! Chat-completion proxy
//!
//! Forwards a prompt to an OpenAI-style chat-completions endpoint and stores
//! the upstream response verbatim in the `chat_completions` collection. The
//! proxy does not reshape the completion; callers see exactly what the
//! service returned.

use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::env;
use std::sync::Arc;

use crate::docstore::{fields_from_json, DocumentStore};
use crate::lattice::error::LatticeError;

pub const CHAT_COMPLETIONS: &str = "chat_completions";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generation parameters sent with every request.
static DEFAULT_PARAMS: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "temperature": 0.7,
        "max_tokens": 1024,
    })
});

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

pub struct ChatProxy {
    client: Client,
    api_key: String,
    base_url: String,
    store: Arc<dyn DocumentStore>,
}

impl ChatProxy {
    /// Requires `CHAT_API_KEY`; `CHAT_BASE_URL` overrides the default
    /// OpenAI endpoint.
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, LatticeError> {
        let api_key =
            env::var("CHAT_API_KEY").map_err(|_| LatticeError::from("CHAT_API_KEY must be set"))?;
        let base_url =
            env::var("CHAT_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url,
            store,
        })
    }

    /// Forward the prompt, persist the verbatim response, return the stored
    /// document id plus the response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<JsonValue, LatticeError> {
        if request.prompt.trim().is_empty() {
            return Err(LatticeError::validation("prompt is required"));
        }
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut body = json!({
            "model": model,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(params) = DEFAULT_PARAMS.as_object() {
            for (key, value) in params {
                body[key] = value.clone();
            }
        }

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LatticeError::upstream("chat", message));
        }
        let response: JsonValue = resp.json().await?;
        log::debug!("chat completion for model {}", model);

        let record = json!({
            "prompt": request.prompt,
            "model": model,
            "response": response,
            "created_at": Utc::now().to_rfc3339(),
        });
        let id = self
            .store
            .add(CHAT_COMPLETIONS, fields_from_json(&record)?)
            .await?;

        Ok(json!({ "id": id, "response": response }))
    }
}
