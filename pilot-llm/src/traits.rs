use async_trait::async_trait;
use pilot_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("{provider} is not reachable")]
    Unavailable { provider: &'static str },

    #[error("API error: {0}")]
    Api(String),

    #[error("{provider} returned an empty completion")]
    Empty { provider: &'static str },
}

impl From<LlmError> for pilot_common::PilotError {
    fn from(e: LlmError) -> Self {
        pilot_common::PilotError::Agent(e.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Generate with output constrained to JSON where the provider supports
    /// it. Providers without a JSON mode answer free-form.
    async fn generate_json(&self, prompt: &str, system_prompt: Option<&str>) -> Result<LlmResponse> {
        self.generate(prompt, system_prompt, None, Some(0.0)).await
    }

    /// Whether the JSON-constrained path differs from [`LlmClient::generate`].
    fn supports_json_mode(&self) -> bool {
        false
    }

    /// Cheap availability probe; never an error for "not running".
    async fn health_check(&self) -> Result<bool>;

    fn model_name(&self) -> &str;

    /// Short provider label used in logs.
    fn provider(&self) -> &'static str;
}
