use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use pilot_common::{PilotError, Result};
use pilot_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};

/// Hosted chat-completions endpoint with an ordered model fallback list.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    models: Vec<String>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiClient {
    /// `models` is tried in order; the first model that answers wins.
    pub fn new(api_key: String, base_url: &str, models: Vec<String>) -> Result<Self> {
        if models.is_empty() {
            return Err(PilotError::Config("openai: at least one model is required".into()));
        }
        let client = HttpClient::new(base_url)
            .map_err(|e| PilotError::Agent(format!("HttpClient init failed: {e}")))?
            .with_retries(1);

        Ok(Self {
            client,
            api_key,
            models,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        let mut last_error = None;
        for model in &self.models {
            let req = CompletionRequest {
                model,
                messages: messages
                    .iter()
                    .map(|m| Message {
                        role: m.role,
                        content: m.content,
                    })
                    .collect(),
                temperature: temperature.unwrap_or(0.0),
                max_tokens: max_tokens.unwrap_or(800),
            };
            let opts = RequestOpts {
                auth: Some(Auth::Bearer(&self.api_key)),
                ..Default::default()
            };
            match self
                .client
                .post_json::<_, CompletionResponse>("chat/completions", &req, opts)
                .await
            {
                Ok(resp) => {
                    let text = resp
                        .choices
                        .into_iter()
                        .find_map(|c| c.message.content)
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    return Ok(LlmResponse {
                        text,
                        model: resp.model.or_else(|| Some(model.clone())),
                        tokens_used: resp.usage.map(|u| u.total_tokens),
                    });
                }
                Err(e) => {
                    tracing::warn!(target: "pilot.planner", %model, error = %e, "openai.model_failed");
                    last_error = Some(e);
                }
            }
        }

        Err(LlmError::Api(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no models configured".into()),
        )
        .into())
    }

    fn model_name(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or_default()
    }

    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.api_key.trim().is_empty())
    }
}
