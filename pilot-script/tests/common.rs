#![allow(dead_code)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pilot_common::observability::{LogConfig, LogFormat};
use pilot_config::Limits;
use pilot_drivers::{Locator, Page};
use pilot_script::editor::scripts;
use pilot_script::EditorKind;
use serde_json::{json, Value};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "webpilot-tests",
            emit_stderr: true,
            format: if std::env::var("PILOT_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug",
            ..LogConfig::default()
        };

        pilot_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Limits small enough that gating and scroll searches finish instantly.
pub fn fast_limits() -> Limits {
    Limits {
        captcha_poll_ms: 1,
        captcha_budget_ms: 5,
        consent_timeout_ms: 1,
        click_timeout_ms: 1,
        press_timeout_ms: 1,
        fill_timeout_ms: 1,
        focus_scroll_step_px: 400,
        focus_scroll_max_px: 4000,
        ..Limits::default()
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub locator: Locator,
    pub visible: bool,
    pub text: String,
    pub class: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub url: String,
    pub title: String,
    pub body: String,
    pub elements: Vec<FakeElement>,
    pub editor: Option<EditorKind>,
    pub editor_value: String,
    /// Editor widgets only show up once the page is scrolled this far.
    pub editor_revealed_at: i64,
    /// Programmatic editor writes report failure.
    pub write_blocked: bool,
    pub focused: bool,
    pub selected_all: bool,
    pub scroll_y: i64,
    /// `Some(n)`: a challenge that disappears after `n` more checks.
    pub captcha_checks_left: Option<u32>,
    /// Present elements whose text can no longer be read.
    pub detached: Vec<Locator>,
    /// Side tabs open but their page never loads.
    pub tab_load_fails: bool,
    pub tables: Value,
    pub links: Value,
    pub typed: String,
    pub log: Vec<String>,
}

pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                url: url.to_string(),
                tables: json!([]),
                links: json!([]),
                ..FakeState::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_element(self, locator: Locator, text: &str) -> Self {
        self.state().elements.push(FakeElement {
            locator,
            visible: true,
            text: text.to_string(),
            class: String::new(),
            value: String::new(),
        });
        self
    }

    pub fn with_hidden_element(self, locator: Locator) -> Self {
        self.state().elements.push(FakeElement {
            locator,
            visible: false,
            text: String::new(),
            class: String::new(),
            value: String::new(),
        });
        self
    }

    pub fn with_editor(self, kind: EditorKind) -> Self {
        self.state().editor = Some(kind);
        self
    }

    pub fn with_body(self, title: &str, body: &str) -> Self {
        {
            let mut state = self.state();
            state.title = title.to_string();
            state.body = body.to_string();
        }
        self
    }

    pub fn with_captcha(self, checks_left: u32) -> Self {
        self.state().captcha_checks_left = Some(checks_left);
        self
    }

    pub fn with_tables(self, tables: Value) -> Self {
        self.state().tables = tables;
        self
    }

    pub fn logged(&self, entry: &str) -> bool {
        self.state().log.iter().any(|l| l == entry)
    }
}

fn editor_scripts(kind: EditorKind) -> (&'static str, &'static str) {
    match kind {
        EditorKind::Monaco => (scripts::MONACO_WRITE, scripts::MONACO_READ),
        EditorKind::CodeMirror5 => (scripts::CM5_WRITE, scripts::CM5_READ),
        EditorKind::CodeMirror6 => (scripts::CM6_WRITE, scripts::CM6_READ),
        EditorKind::Ace => (scripts::ACE_WRITE, scripts::ACE_READ),
        EditorKind::Textarea => (scripts::TEXTAREA_WRITE, scripts::TEXTAREA_READ),
        EditorKind::ContentEditable => {
            (scripts::CONTENTEDITABLE_WRITE, scripts::CONTENTEDITABLE_READ)
        }
        EditorKind::Unknown => ("", ""),
    }
}

impl FakeState {
    fn editor_visible(&self) -> Option<EditorKind> {
        self.editor
            .filter(|_| self.scroll_y >= self.editor_revealed_at)
    }

    fn is_editor_part(&self, locator: &Locator) -> bool {
        let (Some(kind), Locator::Css(css)) = (self.editor_visible(), locator) else {
            return false;
        };
        kind.root_selector() == Some(css.as_str()) || kind.focus_selectors().contains(&css.as_str())
    }

    fn count(&mut self, locator: &Locator, visible_only: bool) -> usize {
        if *locator == Locator::css("#g-recaptcha") {
            if let Some(left) = self.captcha_checks_left {
                if left == 0 {
                    self.captcha_checks_left = None;
                    return 0;
                }
                self.captcha_checks_left = Some(left - 1);
                return 1;
            }
        }
        if self.is_editor_part(locator) {
            return 1;
        }
        self.elements
            .iter()
            .filter(|e| e.locator == *locator && (e.visible || !visible_only))
            .count()
    }

    fn element_mut(&mut self, locator: &Locator) -> Option<&mut FakeElement> {
        self.elements.iter_mut().find(|e| e.locator == *locator)
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.url = url.to_string();
        state.log.push(format!("goto:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.state().count(locator, false))
    }

    async fn visible_count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.state().count(locator, true))
    }

    async fn wait_visible(&self, locator: &Locator, _timeout: Duration) -> Result<bool> {
        Ok(self.state().count(locator, true) > 0)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let mut state = self.state();
        if state.count(locator, false) == 0 {
            return Err(anyhow!("no element matches {locator}"));
        }
        if state.is_editor_part(locator) {
            state.focused = true;
        } else if state.count(locator, true) == 0 {
            state.log.push(format!("click_blocked:{locator}"));
            return Err(anyhow!("element {locator} is not interactable"));
        }
        state.log.push(format!("click:{locator}"));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let mut state = self.state();
        let element = state
            .element_mut(locator)
            .ok_or_else(|| anyhow!("no element matches {locator}"))?;
        element.value = text.to_string();
        state.log.push(format!("fill:{locator}={text}"));
        Ok(())
    }

    async fn press_on(&self, locator: &Locator, key: &str) -> Result<()> {
        let mut state = self.state();
        if state.count(locator, false) == 0 {
            return Err(anyhow!("no element matches {locator}"));
        }
        state.log.push(format!("press_on:{locator}={key}"));
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        self.state().log.push(format!("hover:{locator}"));
        Ok(())
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String> {
        let state = self.state();
        if *locator == Locator::css("body") {
            return Ok(state.body.clone());
        }
        if state.detached.contains(locator) {
            return Err(anyhow!("stale element reference: {locator}"));
        }
        state
            .elements
            .iter()
            .find(|e| e.locator == *locator)
            .map(|e| e.text.clone())
            .ok_or_else(|| anyhow!("no element matches {locator}"))
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        Ok(self
            .state()
            .elements
            .iter()
            .filter(|e| e.locator == *locator)
            .map(|e| e.text.clone())
            .collect())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let state = self.state();
        Ok(state
            .elements
            .iter()
            .find(|e| e.locator == *locator)
            .filter(|_| name == "class")
            .map(|e| e.class.clone()))
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.state();
        for kind in EditorKind::WRITE_ORDER {
            let (write, read) = editor_scripts(kind);
            let here = state.editor_visible() == Some(kind);
            if script == write {
                if !here || state.write_blocked {
                    return Ok(json!(false));
                }
                state.editor_value = args
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Ok(json!(true));
            }
            if script == read {
                if here {
                    return Ok(json!(state.editor_value));
                }
                // Stray editable nodes, such as a comment box, answer the generic reader.
                let stray = kind
                    .root_selector()
                    .filter(|_| kind == EditorKind::ContentEditable)
                    .and_then(|css| {
                        state
                            .elements
                            .iter()
                            .find(|e| e.locator == Locator::css(css))
                    });
                return Ok(stray.map_or(Value::Null, |e| json!(e.text)));
            }
        }
        if script == scripts::SCROLL_TO_TOP {
            state.scroll_y = 0;
            return Ok(json!(true));
        }
        if script.contains("querySelectorAll('table')") {
            return Ok(state.tables.clone());
        }
        if script.contains("out.push") {
            return Ok(state.links.clone());
        }
        Ok(Value::Null)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut state = self.state();
        match key {
            "Control+A" if state.focused => state.selected_all = true,
            "Delete" if state.selected_all => {
                state.editor_value.clear();
                state.selected_all = false;
            }
            _ => {}
        }
        state.log.push(format!("press:{key}"));
        Ok(())
    }

    async fn type_text(&self, text: &str, _delay: Duration) -> Result<()> {
        let mut state = self.state();
        if state.focused {
            state.editor_value.push_str(text);
        }
        state.typed.push_str(text);
        Ok(())
    }

    async fn scroll_by(&self, _dx: i64, dy: i64) -> Result<()> {
        let mut state = self.state();
        state.scroll_y += dy;
        state.log.push(format!("scroll:{dy}"));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"\x89PNG")?;
        Ok(())
    }

    async fn open_tab(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.log.push(format!("open_tab:{url}"));
        if state.tab_load_fails {
            return Err(anyhow!("navigation to {url} timed out"));
        }
        Ok(())
    }

    async fn close_tab(&self) -> Result<()> {
        self.state().log.push("close_tab".to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state().log.push("close".to_string());
        Ok(())
    }
}
