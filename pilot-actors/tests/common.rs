#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pilot_common::observability::{LogConfig, LogFormat};
use pilot_drivers::{Locator, Page, PageLauncher, SharedPage};
use serde_json::Value;

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

/// Page that only remembers where it has been. Navigations take a few
/// milliseconds so overlapping callers would interleave if allowed to.
#[derive(Default)]
pub struct RecordingPage {
    pub visits: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

#[async_trait]
impl Page for RecordingPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.visits.lock().unwrap().push(format!("start:{url}"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.visits.lock().unwrap().push(format!("end:{url}"));
        Ok(())
    }
    async fn current_url(&self) -> Result<String> {
        Ok(self
            .visits
            .lock()
            .unwrap()
            .last()
            .and_then(|v| v.strip_prefix("end:"))
            .unwrap_or("about:blank")
            .to_string())
    }
    async fn title(&self) -> Result<String> {
        Ok("Python Online Compiler".into())
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
        Ok("print('hi')".into())
    }
    async fn all_inner_texts(&self, _locator: &Locator) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    async fn attribute(&self, _locator: &Locator, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
    async fn evaluate(&self, _script: &str, _args: Vec<Value>) -> Result<Value> {
        Ok(Value::Null)
    }
    async fn press_key(&self, _key: &str) -> Result<()> {
        Ok(())
    }
    async fn type_text(&self, _text: &str, _delay: Duration) -> Result<()> {
        Ok(())
    }
    async fn scroll_by(&self, _dx: i64, _dy: i64) -> Result<()> {
        Ok(())
    }
    async fn screenshot(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
    async fn open_tab(&self, _url: &str) -> Result<()> {
        Ok(())
    }
    async fn close_tab(&self) -> Result<()> {
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    pub page: Arc<RecordingPage>,
    pub launches: AtomicUsize,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            page: Arc::new(RecordingPage::default()),
            launches: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            page: Arc::new(RecordingPage::default()),
            launches: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl PageLauncher for FakeLauncher {
    async fn launch(&self) -> Result<SharedPage> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("failed to connect to webdriver at http://127.0.0.1:9"));
        }
        Ok(self.page.clone())
    }
}
