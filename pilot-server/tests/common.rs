#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pilot_actors::actor::spawn_actor;
use pilot_actors::{BrowserSession, SessionHandle};
use pilot_common::observability::{LogConfig, LogFormat};
use pilot_config::{Limits, SearchSettings, ServerSettings};
use pilot_drivers::{Locator, Page, PageLauncher, SharedPage};
use pilot_server::{serve, AppState, StreamEvent};
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

/// A search-engine-shaped page: every navigation succeeds, the result
/// selector yields a fixed list of links, side tabs read back their URL.
#[derive(Default)]
pub struct SitePage {
    pub urls: Mutex<Vec<String>>,
    pub results: Vec<(String, String)>,
    pub log: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

impl SitePage {
    pub fn with_results(results: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            urls: Mutex::new(vec!["about:blank".into()]),
            results: results
                .iter()
                .map(|(t, h)| (t.to_string(), h.to_string()))
                .collect(),
            ..Self::default()
        })
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn current(&self) -> String {
        self.urls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".into())
    }
}

#[async_trait]
impl Page for SitePage {
    async fn goto(&self, url: &str) -> Result<()> {
        if url.contains("unreachable") {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}"));
        }
        let mut urls = self.urls.lock().unwrap();
        if let Some(last) = urls.last_mut() {
            *last = url.to_string();
        }
        self.log.lock().unwrap().push(format!("goto:{url}"));
        Ok(())
    }
    async fn current_url(&self) -> Result<String> {
        Ok(self.current())
    }
    async fn title(&self) -> Result<String> {
        Ok(format!("Title of {}", self.current()))
    }
    async fn count(&self, _locator: &Locator) -> Result<usize> {
        Ok(0)
    }
    async fn visible_count(&self, _locator: &Locator) -> Result<usize> {
        Ok(0)
    }
    async fn wait_visible(&self, _locator: &Locator, _timeout: Duration) -> Result<bool> {
        Ok(false)
    }
    async fn click(&self, locator: &Locator) -> Result<()> {
        Err(anyhow!("no element matches {locator}"))
    }
    async fn fill(&self, locator: &Locator, _text: &str) -> Result<()> {
        Err(anyhow!("no element matches {locator}"))
    }
    async fn press_on(&self, locator: &Locator, _key: &str) -> Result<()> {
        Err(anyhow!("no element matches {locator}"))
    }
    async fn hover(&self, _locator: &Locator) -> Result<()> {
        Ok(())
    }
    async fn inner_text(&self, _locator: &Locator) -> Result<String> {
        Ok(format!("Body of {}", self.current()))
    }
    async fn all_inner_texts(&self, _locator: &Locator) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    async fn attribute(&self, _locator: &Locator, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        if script.contains("out.push") {
            let limit = args.get(1).and_then(Value::as_u64).unwrap_or(0) as usize;
            let links: Vec<Value> = self
                .results
                .iter()
                .take(limit)
                .map(|(text, href)| json!({"text": text, "href": href}))
                .collect();
            return Ok(Value::Array(links));
        }
        if script.contains("contenteditable='true'") {
            return Ok(json!(42));
        }
        Ok(Value::Null)
    }
    async fn press_key(&self, key: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("press:{key}"));
        Ok(())
    }
    async fn type_text(&self, text: &str, _delay: Duration) -> Result<()> {
        self.log.lock().unwrap().push(format!("type:{text}"));
        Ok(())
    }
    async fn scroll_by(&self, _dx: i64, dy: i64) -> Result<()> {
        self.log.lock().unwrap().push(format!("scroll:{dy}"));
        Ok(())
    }
    async fn screenshot(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
    async fn open_tab(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        self.log.lock().unwrap().push(format!("open_tab:{url}"));
        Ok(())
    }
    async fn close_tab(&self) -> Result<()> {
        let mut urls = self.urls.lock().unwrap();
        if urls.len() < 2 {
            return Err(anyhow!("no tab to return to"));
        }
        urls.pop();
        self.log.lock().unwrap().push("close_tab".into());
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct SiteLauncher {
    pub page: Arc<SitePage>,
    pub launches: AtomicUsize,
}

#[async_trait]
impl PageLauncher for SiteLauncher {
    async fn launch(&self) -> Result<SharedPage> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(self.page.clone())
    }
}

pub fn fast_limits() -> Limits {
    Limits {
        captcha_poll_ms: 1,
        captcha_budget_ms: 5,
        consent_timeout_ms: 1,
        click_timeout_ms: 1,
        press_timeout_ms: 1,
        fill_timeout_ms: 1,
        ..Limits::default()
    }
}

pub struct TestServer {
    pub base: String,
    pub page: Arc<SitePage>,
    pub launcher: Arc<SiteLauncher>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start(page: Arc<SitePage>) -> Self {
        init_test_tracing();
        let launcher = Arc::new(SiteLauncher {
            page: page.clone(),
            launches: AtomicUsize::new(0),
        });
        let handle = spawn_actor(BrowserSession::new(launcher.clone(), fast_limits()), 16);
        let state = Arc::new(
            AppState::new(
                SessionHandle::new(handle.addr),
                SearchSettings::default(),
                &ServerSettings::default(),
            )
            .with_search_wait(1),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, state, std::future::pending()));
        Self {
            base,
            page,
            launcher,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn setup(&self, url: &str) -> reqwest::Response {
        self.client
            .post(self.url("/setup-browser"))
            .json(&json!({"url": url}))
            .send()
            .await
            .unwrap()
    }

    /// Run a query and collect every event of its stream.
    pub async fn query(&self, query: &str, agent: &str) -> Vec<StreamEvent> {
        let body = self
            .client
            .post(self.url("/query"))
            .json(&json!({"query": query, "agent_type": agent}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        parse_sse(&body)
    }
}

pub fn parse_sse(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}
