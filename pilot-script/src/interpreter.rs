use std::path::Path;
use std::time::Duration;

use pilot_config::Limits;
use pilot_drivers::{Locator, Page};
use serde_json::json;
use tracing::{info, warn};

use crate::action::{Action, ActionKind};
use crate::editor;
use crate::errors::{ActionError, ActionResult};
use crate::gate;
use crate::profile::{
    ProfileCache, SiteProfile, DEFAULT_OUTPUT_SELECTORS, DEFAULT_RUN_SELECTORS, DEFAULT_RUN_TEXTS,
};
use crate::tables;

pub const COMPLETED_MESSAGE: &str = "I have completed the browsing task.";
pub const CAPTCHA_MESSAGE: &str = "CAPTCHA detected. Please solve it in the browser and try again.";

const SEARCH_BOX_SELECTORS: [&str; 2] = ["input[name='q']", "input[name=q]"];
const SEARCH_BOX_SYNONYMS: [&str; 2] = ["textarea[name='q']", "#APjFqb"];
const GENERIC_SEARCH_BOX: &str = "input[name='q']";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Completed,
    /// A challenge outlived its budget after the navigation at this index.
    CaptchaBlocked { at: usize },
}

#[derive(Debug)]
pub struct ActionFailure {
    pub index: usize,
    pub action: &'static str,
    pub error: ActionError,
}

#[derive(Debug)]
pub struct ExecutionReport {
    pub status: ScriptStatus,
    pub failures: Vec<ActionFailure>,
}

impl ExecutionReport {
    /// User-facing outcome: the CAPTCHA instruction, the first recorded
    /// failure, or the completion message.
    pub fn message(&self) -> String {
        if let ScriptStatus::CaptchaBlocked { .. } = self.status {
            return CAPTCHA_MESSAGE.to_string();
        }
        match self.failures.first() {
            Some(failure) => failure.error.to_string(),
            None => COMPLETED_MESSAGE.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ScriptStatus::Completed && self.failures.is_empty()
    }
}

enum Flow {
    Continue,
    Blocked,
}

/// Runs action scripts against one page. Holds the page exclusively for the
/// duration of a script; the profile cache outlives it.
pub struct Interpreter<'a> {
    page: &'a dyn Page,
    limits: &'a Limits,
    profiles: &'a mut ProfileCache,
}

impl<'a> Interpreter<'a> {
    pub fn new(page: &'a dyn Page, limits: &'a Limits, profiles: &'a mut ProfileCache) -> Self {
        Self {
            page,
            limits,
            profiles,
        }
    }

    /// Execute in order. Per-action failures are collected and execution goes
    /// on; only an unsolved CAPTCHA stops the script.
    pub async fn execute(&mut self, script: &mut [Action]) -> ExecutionReport {
        let mut failures = Vec::new();
        for (index, action) in script.iter_mut().enumerate() {
            let name = action.kind.name();
            info!(target: "pilot.script", index, action = name, "action.start");
            match self.apply(action).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Blocked) => {
                    warn!(target: "pilot.script", index, "script.captcha_blocked");
                    return ExecutionReport {
                        status: ScriptStatus::CaptchaBlocked { at: index },
                        failures,
                    };
                }
                Err(error) => {
                    warn!(target: "pilot.script", index, action = name, error = %error, "action.failed");
                    failures.push(ActionFailure {
                        index,
                        action: name,
                        error,
                    });
                }
            }
        }
        info!(target: "pilot.script", actions = script.len(), failures = failures.len(), "script.finished");
        ExecutionReport {
            status: ScriptStatus::Completed,
            failures,
        }
    }

    async fn apply(&mut self, action: &mut Action) -> ActionResult<Flow> {
        let page = self.page;
        let limits = self.limits;
        match &action.kind {
            ActionKind::Navigate { url } => {
                let url = url.as_deref().filter(|u| !u.is_empty()).unwrap_or("about:blank");
                page.goto(url).await?;
                gate::handle_consent(page, limits).await;
                if !gate::wait_out_captcha(page, limits).await {
                    return Ok(Flow::Blocked);
                }
            }
            ActionKind::Click { selector } => {
                let locator = Locator::css(selector.as_str());
                self.wait_for(&locator, limits.click_timeout_ms).await?;
                page.click(&locator).await?;
            }
            ActionKind::ClickByText { text } => {
                let locator = Locator::text(text.as_str());
                if page.count(&locator).await? == 0 {
                    return Err(ActionError::ElementNotFound(format!("\"{text}\"")));
                }
                page.click(&locator).await?;
            }
            ActionKind::Fill { selector, text } => {
                self.smart_fill(selector.as_deref(), text).await?;
            }
            ActionKind::TypeText { text } => {
                page.type_text(text, Duration::ZERO).await?;
            }
            ActionKind::TypeCode { text, delay } => {
                if !editor::simulate_typing(page, text, Duration::from_millis(*delay)).await {
                    return Err(ActionError::TypeFailed);
                }
            }
            ActionKind::ClearEditor => {
                if !editor::clear(page).await {
                    return Err(ActionError::ClearFailed);
                }
            }
            ActionKind::SetCode { text } => {
                if !editor::write_value(page, text).await {
                    return Err(ActionError::SetCodeFailed);
                }
            }
            ActionKind::PressKey { key, selector } => {
                self.press(key, selector.as_deref()).await?;
            }
            ActionKind::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
            }
            ActionKind::Hover { selector } => {
                page.hover(&Locator::css(selector.as_str())).await?;
            }
            ActionKind::Scroll { delta_y } => {
                page.scroll_by(0, *delta_y).await?;
            }
            ActionKind::Screenshot { path } => {
                page.screenshot(Path::new(path)).await?;
            }
            ActionKind::LearnSite => {
                let profile = SiteProfile::infer(page).await;
                action.value = serde_json::to_value(&profile).ok();
                self.profiles.insert(profile);
            }
            ActionKind::FocusEditor => {
                if !editor::find_and_focus(page, limits).await {
                    return Err(ActionError::EditorNotFound);
                }
            }
            ActionKind::WriteCode { text, delay } => {
                self.write_code(text, *delay).await?;
            }
            ActionKind::RunCode => {
                self.run_code().await?;
            }
            ActionKind::GetOutput => {
                let result = self.read_output().await;
                action.value = Some(json!(result.as_deref().unwrap_or("")));
                result?;
            }
            ActionKind::ExtractTables => {
                let found = tables::extract_tables(page, limits).await?;
                info!(target: "pilot.script", tables = found.len(), "tables.extracted");
                action.value = Some(json!(found));
            }
        }
        Ok(Flow::Continue)
    }

    async fn wait_for(&self, locator: &Locator, timeout_ms: u64) -> ActionResult<()> {
        if self
            .page
            .wait_visible(locator, Duration::from_millis(timeout_ms))
            .await?
        {
            Ok(())
        } else {
            Err(ActionError::Timeout {
                target: locator.to_string(),
                timeout_ms,
            })
        }
    }

    /// The given selector, then known synonyms for the same field, then
    /// keystrokes into whatever has focus.
    async fn smart_fill(&self, selector: Option<&str>, text: &str) -> ActionResult<()> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(selector) = selector.filter(|s| !s.trim().is_empty()) {
            candidates.push(selector.to_string());
            let normalized = selector.trim().replace('"', "'");
            if SEARCH_BOX_SELECTORS.contains(&normalized.as_str()) {
                candidates.extend(SEARCH_BOX_SYNONYMS.iter().map(|s| s.to_string()));
            }
        }
        if !candidates.iter().any(|c| c == GENERIC_SEARCH_BOX) {
            candidates.push(GENERIC_SEARCH_BOX.to_string());
        }

        let timeout = Duration::from_millis(self.limits.fill_timeout_ms);
        for candidate in &candidates {
            let locator = Locator::css(candidate.as_str());
            match self.page.wait_visible(&locator, timeout).await {
                Ok(true) => match self.page.fill(&locator, text).await {
                    Ok(()) => {
                        info!(target: "pilot.script", selector = %candidate, "fill.matched");
                        return Ok(());
                    }
                    Err(e) => warn!(target: "pilot.script", selector = %candidate, error = %e, "fill.failed"),
                },
                Ok(false) => {}
                Err(e) => warn!(target: "pilot.script", selector = %candidate, error = %e, "fill.lookup_failed"),
            }
        }
        info!(target: "pilot.script", "fill.blind_typing");
        self.page.type_text(text, Duration::ZERO).await?;
        Ok(())
    }

    async fn press(&self, key: &str, selector: Option<&str>) -> ActionResult<()> {
        if let Some(selector) = selector {
            let locator = Locator::css(selector);
            let timeout = Duration::from_millis(self.limits.press_timeout_ms);
            if self.page.wait_visible(&locator, timeout).await.unwrap_or(false) {
                match self.page.press_on(&locator, key).await {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!(target: "pilot.script", selector, error = %e, "press.element_failed"),
                }
            }
        }
        self.page.press_key(key).await?;
        Ok(())
    }

    async fn write_code(&self, text: &str, delay: u64) -> ActionResult<()> {
        let page = self.page;
        if delay > 0 {
            let focused = editor::find_and_focus(page, self.limits).await;
            if focused && page.type_text(text, Duration::from_millis(delay)).await.is_ok() {
                return Ok(());
            }
            if editor::write_value(page, text).await {
                return Ok(());
            }
        } else {
            if editor::write_value(page, text).await {
                return Ok(());
            }
            if editor::simulate_typing(page, text, Duration::ZERO).await {
                return Ok(());
            }
        }
        Err(ActionError::WriteFailed)
    }

    fn current_profile(&self, url: &str) -> Option<SiteProfile> {
        self.profiles.for_url(url).cloned()
    }

    async fn click_if_present(&self, locator: &Locator) -> bool {
        if self.page.count(locator).await.unwrap_or(0) == 0 {
            return false;
        }
        match self.page.click(locator).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "pilot.script", control = %locator, error = %e, "run.click_failed");
                false
            }
        }
    }

    /// Learned selector, learned labels, then the built-in labels and selectors.
    async fn run_code(&self) -> ActionResult<()> {
        let url = self.page.current_url().await.unwrap_or_default();
        let profile = self.current_profile(&url);

        let mut candidates = Vec::new();
        if let Some(profile) = &profile {
            if let Some(selector) = &profile.run_selector {
                candidates.push(Locator::css(selector.as_str()));
            }
            candidates.extend(profile.run_texts.iter().map(|t| Locator::text(t.as_str())));
        }
        for text in DEFAULT_RUN_TEXTS {
            let locator = Locator::text(text);
            if !candidates.contains(&locator) {
                candidates.push(locator);
            }
        }
        candidates.extend(DEFAULT_RUN_SELECTORS.iter().map(|s| Locator::css(*s)));

        for locator in &candidates {
            if self.click_if_present(locator).await {
                info!(target: "pilot.script", control = %locator, "run.clicked");
                return Ok(());
            }
        }
        Err(ActionError::RunControlNotFound)
    }

    /// Text of the first output panel present. Learned selectors go first.
    async fn read_output(&self) -> ActionResult<String> {
        let url = self.page.current_url().await.unwrap_or_default();
        let mut selectors: Vec<String> = self
            .current_profile(&url)
            .map(|p| p.output_selectors)
            .unwrap_or_default();
        for default in DEFAULT_OUTPUT_SELECTORS {
            if !selectors.iter().any(|s| s == default) {
                selectors.push(default.to_string());
            }
        }

        let mut seen_panel = false;
        for selector in &selectors {
            let locator = Locator::css(selector.as_str());
            if self.page.count(&locator).await.unwrap_or(0) == 0 {
                continue;
            }
            seen_panel = true;
            let text = match self.page.inner_text(&locator).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(target: "pilot.script", selector = %selector, error = %e, "output.read_failed");
                    continue;
                }
            };
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }
        if seen_panel {
            Ok(String::new())
        } else {
            Err(ActionError::OutputNotFound)
        }
    }
}

/// Convenience: execute a script and return only the user-facing message.
pub async fn run_script(
    page: &dyn Page,
    limits: &Limits,
    profiles: &mut ProfileCache,
    script: &mut [Action],
) -> String {
    Interpreter::new(page, limits, profiles)
        .execute(script)
        .await
        .message()
}
