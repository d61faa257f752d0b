use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::AdvisoryGenerator;
use crate::config::AdvisoryConfig;

const SYSTEM_PROMPT: &str = "You are a race engineer giving radio updates to your driver. \
Be concise - max 2 sentences. Use plain text suitable for voice/TTS. \
No bullets, no formatting. Be calm but urgent when needed. Give actionable advice.";

/// Client for an OpenAI-compatible chat completion server (LM Studio,
/// llama-server and friends).
#[derive(Clone)]
pub struct AdvisoryService {
    client: Client,
    base_url: String,
    model: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl AdvisoryService {
    pub fn new(config: &AdvisoryConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout()) // network-level cap; the engine adds its own
                .build()
                .unwrap_or_default(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.as_deref(),
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .context("advisory request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("advisory server error: {}", response.status()));
        }

        let reply: ChatResponse = response.json().await.context("malformed advisory reply")?;
        extract_text(reply).ok_or_else(|| anyhow!("advisory reply had no text"))
    }
}

fn extract_text(reply: ChatResponse) -> Option<String> {
    let content = reply.choices.into_iter().next()?.message.content?;
    let text = content.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl AdvisoryGenerator for AdvisoryService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}
