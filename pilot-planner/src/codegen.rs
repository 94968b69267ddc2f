use pilot_llm::{ModelTiers, SharedLlm};
use serde::Serialize;
use tracing::{debug, info};

use crate::stubs;

const CODE_SYSTEM_PROMPT: &str = "You write minimal, self-contained code snippets. Return ONLY code without explanations.";

/// Which rung of the ladder produced the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeTier {
    Local,
    LocalCli,
    Remote,
    Stub,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedCode {
    pub language: String,
    pub code: String,
    pub tier: CodeTier,
}

/// Language tags commonly written after an opening fence.
const FENCE_TAGS: [&str; 14] = [
    "python", "py", "js", "javascript", "java", "c++", "cpp", "c#", "csharp", "typescript", "ts",
    "go", "ruby", "php",
];

/// Body of the first fenced block, minus a leading language tag line.
/// Text without a complete fence is returned trimmed.
pub fn strip_code_fences(text: &str, language: &str) -> String {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split("```").collect();
    if parts.len() < 3 {
        return trimmed.to_string();
    }
    let mut lines = parts[1].lines();
    let block: Vec<&str> = match lines.next() {
        Some(first) => {
            let tag = first.trim().to_ascii_lowercase();
            let lang = language.trim().to_ascii_lowercase();
            let is_tag = FENCE_TAGS.contains(&tag.as_str())
                || (!lang.is_empty() && (tag == lang || lang.starts_with(&tag) && !tag.is_empty()));
            if is_tag || tag.is_empty() {
                lines.collect()
            } else {
                std::iter::once(first).chain(lines).collect()
            }
        }
        None => Vec::new(),
    };
    block.join("\n").trim().to_string()
}

/// Code generation over the model tiers, ending in the offline stub library.
#[derive(Clone)]
pub struct CodeGenerator {
    tiers: ModelTiers,
}

impl CodeGenerator {
    pub fn new(tiers: ModelTiers) -> Self {
        Self { tiers }
    }

    async fn ask(&self, client: &SharedLlm, prompt: &str, combined: bool) -> Option<String> {
        let result = if combined {
            // The CLI path has no separate system role.
            let full = format!("{CODE_SYSTEM_PROMPT}\n\n{prompt}");
            client.generate(&full, None, None, Some(0.0)).await
        } else {
            client
                .generate(prompt, Some(CODE_SYSTEM_PROMPT), None, Some(0.0))
                .await
        };
        match result {
            Ok(resp) => Some(resp.text),
            Err(e) => {
                debug!(target: "pilot.planner", provider = client.provider(), error = %e, "codegen.tier_failed");
                None
            }
        }
    }

    pub async fn generate(&self, language: &str, prompt: &str) -> GeneratedCode {
        let request = format!("Write {language} code for: {prompt}. Keep it minimal.");
        let ladder = [
            (self.tiers.local.as_ref(), CodeTier::Local, false),
            (self.tiers.local_cli.as_ref(), CodeTier::LocalCli, true),
            (self.tiers.remote.as_ref(), CodeTier::Remote, false),
        ];
        for (client, tier, combined) in ladder {
            let Some(client) = client else { continue };
            if let Some(reply) = self.ask(client, &request, combined).await {
                let code = strip_code_fences(&reply, language);
                if !code.is_empty() {
                    info!(target: "pilot.planner", ?tier, language, "codegen.generated");
                    return GeneratedCode {
                        language: language.to_string(),
                        code,
                        tier,
                    };
                }
            }
        }
        info!(target: "pilot.planner", language, "codegen.stub");
        GeneratedCode {
            language: language.to_string(),
            code: stubs::stub_for(language, prompt),
            tier: CodeTier::Stub,
        }
    }
}
