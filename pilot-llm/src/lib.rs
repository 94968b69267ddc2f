//! Model clients for the command planner.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and three
//! concrete clients: the local Ollama HTTP API, the local `ollama run`
//! binary and the hosted OpenAI chat-completions API. [`ModelTiers`] builds
//! the set the planner's fallback ladder walks from a [`LlmSettings`].
//!
//! # Examples
//! ```no_run
//! use pilot_config::LlmSettings;
//! use pilot_llm::ModelTiers;
//!
//! let tiers = ModelTiers::from_settings(&LlmSettings::default()).unwrap();
//! assert!(tiers.remote.is_none()); // no API key, no remote tier
//! ```
pub mod cli;
pub mod ollama;
pub mod openai;
pub mod traits;

use cli::OllamaCliClient;
use ollama::OllamaClient;
use openai::OpenAiClient;
use pilot_config::LlmSettings;
use std::sync::Arc;
use std::time::Duration;
use traits::LlmClient;

pub type SharedLlm = Arc<dyn LlmClient + Send + Sync + 'static>;

/// The generative tiers, in ladder order. Any of them may be absent; the
/// planner's deterministic tier is always available on top of these.
#[derive(Clone, Default)]
pub struct ModelTiers {
    /// Local model over HTTP (tiers 1 and 2).
    pub local: Option<SharedLlm>,
    /// Local model via the CLI (code generation only).
    pub local_cli: Option<SharedLlm>,
    /// Hosted model; absent when no credential is configured.
    pub remote: Option<SharedLlm>,
}

impl ModelTiers {
    pub fn from_settings(settings: &LlmSettings) -> pilot_common::Result<Self> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let local = OllamaClient::new(&settings.ollama_base_url, settings.ollama_model.clone())?
            .with_probe_timeout(Duration::from_millis(settings.probe_timeout_ms))
            .with_request_timeout(timeout);
        let local_cli = OllamaCliClient::new(settings.ollama_binary.clone(), settings.ollama_model.clone())
            .with_timeout(timeout);

        let remote: Option<SharedLlm> = match settings.openai_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(Arc::new(OpenAiClient::new(
                key.to_string(),
                &settings.openai_base_url,
                settings.openai_models.clone(),
            )?)),
            _ => {
                tracing::debug!(target: "pilot.planner", "remote tier disabled: no API key");
                None
            }
        };

        Ok(Self {
            local: Some(Arc::new(local)),
            local_cli: Some(Arc::new(local_cli)),
            remote,
        })
    }

    /// No generative tiers at all; everything falls to the heuristics.
    pub fn offline() -> Self {
        Self::default()
    }
}
