//! Secondary local invocation path: pipe the prompt into `ollama run <model>`.
//!
//! Used when the HTTP API is down but the binary is installed, e.g. the
//! server was started under another user or on a socket we can't reach.
use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use pilot_common::{PilotError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct OllamaCliClient {
    binary: String,
    model: String,
    timeout: Duration,
}

impl OllamaCliClient {
    pub fn new(binary: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, input: &str) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::debug!(target: "pilot.planner", binary = %self.binary, error = %e, "ollama_cli.spawn_failed");
                PilotError::from(LlmError::Unavailable { provider: "ollama-cli" })
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| PilotError::Agent(format!("ollama cli stdin: {e}")))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PilotError::Timeout)?
            .map_err(|e| PilotError::Agent(format!("ollama cli: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::Api(format!(
                "ollama run exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl LlmClient for OllamaCliClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let input = match system_prompt {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        };
        let text = self.run(&input).await?;
        if text.trim().is_empty() {
            return Err(LlmError::Empty { provider: "ollama-cli" }.into());
        }
        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match tokio::time::timeout(Duration::from_secs(2), probe).await {
            Ok(Ok(status)) => Ok(status.success()),
            _ => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &'static str {
        "ollama-cli"
    }
}
