//! Loader for `webpilot.yaml` with environment overlays.
//!
//! Precedence, lowest first:
//!
//! 1. built-in defaults (every field has one, an empty document is valid)
//! 2. legacy provider variables `OLLAMA_BASE_URL`, `OLLAMA_MODEL`,
//!    `OPENAI_API_KEY` (only where the field was left at its default)
//! 3. YAML files and inline snippets, in the order they were added
//! 4. `PILOT__SECTION__FIELD` environment variables
//!
//! String values may reference `${VAR}`; references are expanded recursively
//! (bounded depth) after all sources are merged.
use config::{Config, ConfigError, Environment, File};
use pilot_common::StealthLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// File name looked up under the user config directory.
pub const DEFAULT_CONFIG_FILE: &str = "webpilot.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub llm: LlmSettings,
    pub browser: BrowserSettings,
    pub limits: Limits,
    pub search: SearchSettings,
    pub server: ServerSettings,
}

/// Model endpoints used by the planner tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Executable used by the secondary local invocation path (`ollama run`).
    pub ollama_binary: String,
    /// Availability probe budget against `/api/tags`.
    pub probe_timeout_ms: u64,
    pub request_timeout_secs: u64,
    /// Absent key disables the remote tier.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    /// Tried in order until one answers.
    pub openai_models: Vec<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://127.0.0.1:11434".into(),
            ollama_model: "llama3.1".into(),
            ollama_binary: "ollama".into(),
            probe_timeout_ms: 800,
            request_timeout_secs: 60,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_models: vec!["gpt-4o-mini".into(), "gpt-4o".into(), "gpt-3.5-turbo".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    /// Explicit Chrome/Chromium binary; chromedriver's discovery otherwise.
    pub binary: Option<String>,
    pub connect_retries: u32,
    /// Base delay, doubled per attempt.
    pub connect_backoff_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            stealth: StealthLevel::Balanced,
            binary: None,
            connect_retries: 3,
            connect_backoff_ms: 1000,
        }
    }
}

/// Per-action timeouts and extraction caps for the script interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub captcha_poll_ms: u64,
    pub captcha_budget_ms: u64,
    pub consent_timeout_ms: u64,
    /// Visibility wait before `click`.
    pub click_timeout_ms: u64,
    /// Visibility wait before `press_key` on a selector.
    pub press_timeout_ms: u64,
    /// Visibility wait per smart-fill candidate.
    pub fill_timeout_ms: u64,
    pub max_tables: usize,
    pub max_rows: usize,
    pub max_cells: usize,
    /// Scroll step while hunting for an editor that is below the fold.
    pub focus_scroll_step_px: i64,
    pub focus_scroll_max_px: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            captcha_poll_ms: 1000,
            captcha_budget_ms: 180_000,
            consent_timeout_ms: 1500,
            click_timeout_ms: 5000,
            press_timeout_ms: 3000,
            fill_timeout_ms: 4000,
            max_tables: 10,
            max_rows: 200,
            max_cells: 50,
            focus_scroll_step_px: 400,
            focus_scroll_max_px: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Default engine for planned searches.
    pub home_url: String,
    pub query_selector: String,
    /// Organic result links on the engine's result page.
    pub result_selector: String,
    /// Where a command with no recognisable target lands.
    pub landing_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            home_url: "https://duckduckgo.com/".into(),
            query_selector: "input[name='q']".into(),
            result_selector: "a[data-testid='result-title-a']".into(),
            landing_url: "https://www.google.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub keepalive_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
            keepalive_secs: 15,
        }
    }
}

impl PilotConfig {
    /// Fill provider settings from the unprefixed variables older
    /// deployments export, without overriding anything configured explicitly.
    pub fn apply_legacy_env(&mut self) {
        let defaults = LlmSettings::default();
        if self.llm.ollama_base_url == defaults.ollama_base_url {
            if let Some(url) = non_empty_env("OLLAMA_BASE_URL") {
                self.llm.ollama_base_url = url;
            }
        }
        if self.llm.ollama_model == defaults.ollama_model {
            if let Some(model) = non_empty_env("OLLAMA_MODEL") {
                self.llm.ollama_model = model;
            }
        }
        if self.llm.openai_api_key.is_none() {
            self.llm.openai_api_key = non_empty_env("OPENAI_API_KEY");
        }
    }

    /// Render the effective configuration (secrets masked).
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let mut masked = self.clone();
        if masked.llm.openai_api_key.is_some() {
            masked.llm.openai_api_key = Some("***".into());
        }
        serde_yaml::to_string(&masked).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `~/.config/webpilot/webpilot.yaml` (platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("webpilot").join(DEFAULT_CONFIG_FILE))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PilotConfigLoader {
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
    legacy_env: bool,
}

impl Default for PilotConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PilotConfigLoader {
    /// Defaults plus `PILOT__` env overrides and legacy provider variables.
    ///
    /// ```
    /// use pilot_config::PilotConfigLoader;
    ///
    /// let config = PilotConfigLoader::new()
    ///     .without_legacy_env()
    ///     .with_yaml_str("limits:\n  max_tables: 3\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.limits.max_tables, 3);
    /// assert_eq!(config.limits.max_rows, 200);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            inline: Vec::new(),
            legacy_env: true,
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that may be absent, e.g. [`default_config_path`].
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Ignore `OLLAMA_BASE_URL`/`OLLAMA_MODEL`/`OPENAI_API_KEY`.
    pub fn without_legacy_env(mut self) -> Self {
        self.legacy_env = false;
        self
    }

    /// Merge all sources, expand `${VAR}` references and deserialize.
    pub fn load(self) -> Result<PilotConfig, ConfigError> {
        let mut builder = Config::builder();
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("PILOT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("llm.openai_models"),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: PilotConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        if self.legacy_env {
            typed.apply_legacy_env();
        }
        Ok(typed)
    }
}
