use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::{UserAgentManager, UserAgentProfile},
    keys::KeyChord,
    page::{Locator, Page, PageLauncher, SharedPage, Strategy},
    stealth::{build_stealth_arguments, evasions_for},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::actions::{InputSource, KeyAction, KeyActions, MouseActions, PointerAction};
use fantoccini::elements::Element;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder};
use pilot_common::StealthLevel;
use pilot_config::BrowserSettings;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`Page`] over a WebDriver session (chromedriver by default).
pub struct FantocciniPage {
    client: Client,
    stealth: StealthLevel,
    fingerprint: UserAgentProfile,
    behavior: BehavioralEngine,
    /// Tabs we came from, most recent last.
    opener_stack: Mutex<Vec<WindowHandle>>,
}

impl FantocciniPage {
    pub fn new(
        client: Client,
        stealth: StealthLevel,
        fingerprint: UserAgentProfile,
        behavior: BehavioralEngine,
    ) -> Self {
        Self {
            client,
            stealth,
            fingerprint,
            behavior,
            opener_stack: Mutex::new(Vec::new()),
        }
    }

    /// Apply stealth scripts and the platform override. Failures are logged;
    /// an evasion that doesn't apply must not fail navigation.
    async fn apply_stealth_and_fingerprint(&self) {
        for script in evasions_for(self.stealth) {
            if let Err(e) = self.client.execute(script, vec![]).await {
                debug!(target: "pilot.session", error = %e, "stealth script rejected");
            }
        }
        if self.stealth == StealthLevel::Maximum {
            let script = "Object.defineProperty(navigator, 'platform', { get: () => arguments[0] });";
            let _ = self
                .client
                .execute(script, vec![json!(self.fingerprint.platform)])
                .await;
        }
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>> {
        let (strategy, query) = locator.compile();
        let found = match strategy {
            Strategy::Css => self.client.find_all(fantoccini::Locator::Css(&query)).await,
            Strategy::XPath => self.client.find_all(fantoccini::Locator::XPath(&query)).await,
        };
        found.with_context(|| format!("lookup failed for {locator}"))
    }

    /// First displayed match, else first match.
    async fn first(&self, locator: &Locator) -> Result<Element> {
        let elements = self.find_all(locator).await?;
        for element in &elements {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(element.clone());
            }
        }
        elements
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no element matches {locator}"))
    }

    async fn focused_or_body(&self) -> Result<Element> {
        match self.client.active_element().await {
            Ok(element) => Ok(element),
            Err(_) => self.first(&Locator::css("body")).await,
        }
    }
}

#[async_trait]
impl Page for FantocciniPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.behavior.before_navigation().await;
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        self.apply_stealth_and_fingerprint().await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.client.title().await?)
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.find_all(locator).await?.len())
    }

    async fn visible_count(&self, locator: &Locator) -> Result<usize> {
        let mut visible = 0;
        for element in self.find_all(locator).await? {
            if element.is_displayed().await.unwrap_or(false) {
                visible += 1;
            }
        }
        Ok(visible)
    }

    async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.visible_count(locator).await.unwrap_or(0) > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.first(locator).await?;
        element
            .click()
            .await
            .with_context(|| format!("click on {locator} failed"))?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.first(locator).await?;
        let _ = element.clear().await;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn press_on(&self, locator: &Locator, key: &str) -> Result<()> {
        let chord = KeyChord::parse(key).ok_or_else(|| anyhow!("unknown key {key:?}"))?;
        let element = self.first(locator).await?;
        element.send_keys(&chord.as_send_keys()).await?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        let element = self.first(locator).await?;
        let actions = MouseActions::new("mouse".to_string()).then(PointerAction::MoveToElement {
            element,
            duration: Some(Duration::from_millis(150)),
            x: 0.0,
            y: 0.0,
        });
        self.client
            .perform_actions(actions)
            .await
            .with_context(|| format!("hover over {locator} failed"))?;
        let _ = self.client.release_actions().await;
        Ok(())
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String> {
        Ok(self.first(locator).await?.text().await?)
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.find_all(locator).await? {
            texts.push(element.text().await.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        Ok(self.first(locator).await?.attr(name).await?)
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let chord = KeyChord::parse(key).ok_or_else(|| anyhow!("unknown key {key:?}"))?;
        let mut actions = KeyActions::new("keyboard".to_string());
        for value in &chord.keys {
            actions = actions.then(KeyAction::Down { value: *value });
        }
        for value in chord.keys.iter().rev() {
            actions = actions.then(KeyAction::Up { value: *value });
        }
        self.client.perform_actions(actions).await?;
        let _ = self.client.release_actions().await;
        Ok(())
    }

    async fn type_text(&self, text: &str, delay: Duration) -> Result<()> {
        let target = self.focused_or_body().await?;
        self.behavior.type_into(&target, text, delay).await
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()> {
        self.client
            .execute("window.scrollBy(arguments[0], arguments[1]);", vec![json!(dx), json!(dy)])
            .await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let png = self.client.screenshot().await?;
        tokio::fs::write(path, &png)
            .await
            .with_context(|| format!("failed to write screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn open_tab(&self, url: &str) -> Result<()> {
        let current = self.client.window().await?;
        let opened = self.client.new_window(true).await?;
        self.client.switch_to_window(opened.handle).await?;
        self.opener_stack.lock().await.push(current);
        self.goto(url).await
    }

    async fn close_tab(&self) -> Result<()> {
        let Some(opener) = self.opener_stack.lock().await.pop() else {
            return Err(anyhow!("no tab to return to"));
        };
        self.client.close_window().await?;
        self.client.switch_to_window(opener).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

/// Connects to a running WebDriver endpoint, retrying with exponential
/// backoff.
pub struct WebDriverLauncher {
    settings: BrowserSettings,
}

impl WebDriverLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn capabilities(&self, fingerprint: &UserAgentProfile) -> Capabilities {
        let mut args = build_stealth_arguments(self.settings.stealth, fingerprint);
        if self.settings.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }
        let mut chrome_opts = serde_json::Map::new();
        chrome_opts.insert("args".to_string(), json!(args));
        if let Some(binary) = self.settings.binary.as_deref().map(str::trim) {
            if !binary.is_empty() {
                chrome_opts.insert("binary".to_string(), json!(binary));
            }
        }

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), Value::Object(chrome_opts));
        // Return once DOMContentLoaded fires rather than on full load.
        caps.insert("pageLoadStrategy".to_string(), json!("eager"));
        caps
    }

    async fn connect_once(&self, caps: Capabilities) -> Result<Client> {
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.settings.webdriver_url)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to WebDriver at {}; is chromedriver running?",
                    self.settings.webdriver_url
                )
            })?;
        Ok(client)
    }
}

#[async_trait]
impl PageLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<SharedPage> {
        let fingerprint = UserAgentManager::new().session_profile().clone();
        let attempts = self.settings.connect_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.connect_once(self.capabilities(&fingerprint)).await {
                Ok(client) => {
                    info!(
                        target: "pilot.session",
                        url = %self.settings.webdriver_url,
                        attempt = attempt + 1,
                        headless = self.settings.headless,
                        "webdriver session opened"
                    );
                    let page = FantocciniPage::new(
                        client,
                        self.settings.stealth,
                        fingerprint,
                        BehavioralEngine::default(),
                    );
                    return Ok(Arc::new(page));
                }
                Err(e) => {
                    let delay = Duration::from_millis(
                        self.settings
                            .connect_backoff_ms
                            .saturating_mul(1u64 << attempt.min(16)),
                    );
                    warn!(
                        target: "pilot.session",
                        attempt = attempt + 1,
                        attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "webdriver connect failed"
                    );
                    last_error = Some(e);
                    if attempt + 1 < attempts {
                        sleep(delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("webdriver connect was never attempted")))
    }
}
