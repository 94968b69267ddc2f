use pilot_common::StealthLevel;
use pilot_config::PilotConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_expand_and_env_overrides_win() {
    let tmp = TempDir::new().unwrap();
    let file_yaml = r#"
llm:
  ollama_model: "codellama"
  openai_api_key: "${PILOT_TEST_OPENAI_KEY}"
browser:
  headless: true
  stealth: maximum
limits:
  captcha_budget_ms: 5000
  max_rows: 20
"#;
    let p = write_yaml(&tmp, "webpilot.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("PILOT_TEST_OPENAI_KEY", Some("sk-from-env")),
            ("PILOT__LIMITS__MAX_ROWS", Some("7")),
            ("PILOT__SEARCH__HOME_URL", Some("https://search.example/")),
        ],
        || {
            let config = PilotConfigLoader::new()
                .without_legacy_env()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.llm.ollama_model, "codellama");
            assert_eq!(config.llm.openai_api_key.as_deref(), Some("sk-from-env"));
            assert!(config.browser.headless);
            assert_eq!(config.browser.stealth, StealthLevel::Maximum);
            assert_eq!(config.limits.captcha_budget_ms, 5000);
            assert_eq!(config.limits.max_rows, 7);
            assert_eq!(config.limits.max_cells, 50);
            assert_eq!(config.search.home_url, "https://search.example/");
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = PilotConfigLoader::new()
        .without_legacy_env()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults load");

    assert_eq!(config.search.home_url, "https://duckduckgo.com/");
    assert_eq!(config.limits.captcha_poll_ms, 1000);
    assert_eq!(config.llm.openai_models.len(), 3);
    assert!(config.llm.openai_api_key.is_none());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = PilotConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
