use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use pilot_common::{PilotError, Result};
use pilot_http::{HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local model served by `ollama serve`, spoken to over `/api/chat`.
///
/// Construction does not touch the network. Every call is preceded by a
/// short `/api/tags` probe so a stopped server is reported as
/// [`LlmError::Unavailable`] within the probe budget instead of a long
/// connect timeout.
pub struct OllamaClient {
    http: HttpClient,
    model: String,
    probe_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ChatReply>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self> {
        let http = HttpClient::new(base_url)
            .map_err(|e| PilotError::Config(format!("ollama base url: {e}")))?
            .with_retries(0);
        Ok(Self {
            http,
            model: model.into(),
            probe_timeout: Duration::from_millis(800),
        })
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    async fn chat(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: f32,
        json_mode: bool,
    ) -> Result<LlmResponse> {
        if !self.health_check().await? {
            return Err(LlmError::Unavailable { provider: "ollama" }.into());
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens,
            },
            format: json_mode.then_some("json"),
        };

        let resp: ChatResponse = self
            .http
            .post_json("api/chat", &request, RequestOpts::default())
            .await
            .map_err(|e| {
                // The server can go away between the probe and the request.
                if e.is_unreachable() {
                    LlmError::Unavailable { provider: "ollama" }
                } else {
                    LlmError::Api(e.to_string())
                }
            })?;

        let text = resp.message.map(|m| m.content).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::Empty { provider: "ollama" }.into());
        }
        tracing::debug!(
            target: "pilot.planner",
            model = %self.model,
            json_mode,
            chars = text.len(),
            "ollama.chat.ok"
        );
        Ok(LlmResponse {
            text,
            model: resp.model.or_else(|| Some(self.model.clone())),
            tokens_used: resp.eval_count,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        self.chat(prompt, system_prompt, max_tokens, temperature.unwrap_or(0.0), false)
            .await
    }

    async fn generate_json(&self, prompt: &str, system_prompt: Option<&str>) -> Result<LlmResponse> {
        self.chat(prompt, system_prompt, None, 0.0, true).await
    }

    fn supports_json_mode(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<bool> {
        let opts = RequestOpts {
            timeout: Some(self.probe_timeout),
            retries: Some(0),
            ..Default::default()
        };
        match self.http.get_json::<serde_json::Value>("api/tags", opts).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(target: "pilot.planner", error = %e, "ollama.probe.down");
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &'static str {
        "ollama"
    }
}
