//! The browser session: one page, owned by one actor.
//!
//! Every browser operation is a message, so requests from concurrent callers
//! run strictly one at a time in the order they were sent. The page is
//! launched on first use and can be reopened after `Close`.
use std::sync::Arc;

use pilot_common::{PilotError, Result};
use pilot_config::Limits;
use pilot_drivers::{PageLauncher, SharedPage};
use pilot_script::inspect::{self, Link, PageSummary, TabReading};
use pilot_script::{Action, Interpreter, ProfileCache, ScriptStatus};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::actor::{Actor, Addr, Context};
use crate::system::ActorSystem;

/// Mailbox depth for the session actor.
pub const SESSION_MAILBOX: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

pub enum SessionMsg {
    Open {
        reply: Reply<()>,
    },
    Navigate {
        url: String,
        reply: Reply<()>,
    },
    Execute {
        script: Vec<Action>,
        reply: Reply<ScriptOutcome>,
    },
    DetectLanguage {
        reply: Reply<String>,
    },
    Summarize {
        max_links: usize,
        max_chars: usize,
        reply: Reply<PageSummary>,
    },
    SearchResults {
        selector: String,
        limit: usize,
        reply: Reply<Vec<Link>>,
    },
    Census {
        reply: Reply<u64>,
    },
    ReadInTab {
        url: String,
        passes: usize,
        scroll_px: i64,
        max_chars: usize,
        reply: Reply<TabReading>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// What a script run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutcome {
    /// Completion message, CAPTCHA instruction, or the first failure.
    pub message: String,
    pub captcha_blocked: bool,
    pub errors: Vec<String>,
    /// The script with `value` slots filled in.
    pub actions: Vec<Action>,
}

pub struct BrowserSession {
    id: Uuid,
    launcher: Arc<dyn PageLauncher>,
    limits: Limits,
    page: Option<SharedPage>,
    profiles: ProfileCache,
}

impl BrowserSession {
    pub fn new(launcher: Arc<dyn PageLauncher>, limits: Limits) -> Self {
        Self {
            id: Uuid::new_v4(),
            launcher,
            limits,
            page: None,
            profiles: ProfileCache::new(),
        }
    }

    async fn page(&mut self) -> Result<SharedPage> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }
        let page = self
            .launcher
            .launch()
            .await
            .map_err(|e| PilotError::Session(format!("failed to start browser: {e:#}")))?;
        info!(target: "pilot.session", session = %self.id, "session.opened");
        self.page = Some(page.clone());
        Ok(page)
    }

    async fn execute(&mut self, mut script: Vec<Action>) -> Result<ScriptOutcome> {
        let page = self.page().await?;
        let report = Interpreter::new(page.as_ref(), &self.limits, &mut self.profiles)
            .execute(&mut script)
            .await;
        Ok(ScriptOutcome {
            message: report.message(),
            captcha_blocked: matches!(report.status, ScriptStatus::CaptchaBlocked { .. }),
            errors: report.failures.iter().map(|f| f.error.to_string()).collect(),
            actions: script,
        })
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(target: "pilot.session", session = %self.id, error = %e, "session.close_failed");
            }
            info!(target: "pilot.session", session = %self.id, "session.closed");
        }
    }
}

#[async_trait::async_trait]
impl Actor for BrowserSession {
    type Msg = SessionMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> anyhow::Result<()> {
        match msg {
            SessionMsg::Open { reply } => {
                let _ = reply.send(self.page().await.map(|_| ()));
            }
            SessionMsg::Navigate { url, reply } => {
                let res = match self.page().await {
                    Ok(page) => page.goto(&url).await.map_err(PilotError::from),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::Execute { script, reply } => {
                let _ = reply.send(self.execute(script).await);
            }
            SessionMsg::DetectLanguage { reply } => {
                let res = match self.page().await {
                    Ok(page) => Ok(inspect::detect_language(page.as_ref()).await.to_string()),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::Summarize {
                max_links,
                max_chars,
                reply,
            } => {
                let res = match self.page().await {
                    Ok(page) => inspect::summarize(page.as_ref(), max_links, max_chars)
                        .await
                        .map_err(PilotError::from),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::SearchResults {
                selector,
                limit,
                reply,
            } => {
                let res = match self.page().await {
                    Ok(page) => inspect::search_results(page.as_ref(), &selector, limit)
                        .await
                        .map_err(PilotError::from),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::Census { reply } => {
                let res = match self.page().await {
                    Ok(page) => inspect::interactive_census(page.as_ref())
                        .await
                        .map_err(PilotError::from),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::ReadInTab {
                url,
                passes,
                scroll_px,
                max_chars,
                reply,
            } => {
                let res = match self.page().await {
                    Ok(page) => inspect::read_in_tab(page.as_ref(), &url, passes, scroll_px, max_chars)
                        .await
                        .map_err(PilotError::from),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            SessionMsg::Close { reply } => {
                self.close().await;
                let _ = reply.send(());
            }
        }
        Ok(())
    }

    async fn stopped(&mut self) {
        self.close().await;
    }
}

/// Cloneable caller-side API for a [`BrowserSession`].
#[derive(Clone)]
pub struct SessionHandle {
    addr: Addr<BrowserSession>,
}

impl SessionHandle {
    pub fn new(addr: Addr<BrowserSession>) -> Self {
        Self { addr }
    }

    /// Spawn a session actor inside `system`.
    pub fn spawn(system: &mut ActorSystem, launcher: Arc<dyn PageLauncher>, limits: Limits) -> Self {
        let addr = system.spawn(BrowserSession::new(launcher, limits), SESSION_MAILBOX);
        Self::new(addr)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> SessionMsg) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        if self.addr.send(make(tx)).await.is_err() {
            return Err(PilotError::Session("browser session has stopped".into()));
        }
        rx.await
            .map_err(|_| PilotError::Session("browser session dropped the request".into()))?
    }

    pub async fn open(&self) -> Result<()> {
        self.request(|reply| SessionMsg::Open { reply }).await
    }

    pub async fn navigate(&self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        self.request(|reply| SessionMsg::Navigate { url, reply }).await
    }

    pub async fn execute(&self, script: Vec<Action>) -> Result<ScriptOutcome> {
        self.request(|reply| SessionMsg::Execute { script, reply })
            .await
    }

    pub async fn detect_language(&self) -> Result<String> {
        self.request(|reply| SessionMsg::DetectLanguage { reply })
            .await
    }

    pub async fn summarize(&self, max_links: usize, max_chars: usize) -> Result<PageSummary> {
        self.request(|reply| SessionMsg::Summarize {
            max_links,
            max_chars,
            reply,
        })
        .await
    }

    pub async fn search_results(&self, selector: impl Into<String>, limit: usize) -> Result<Vec<Link>> {
        let selector = selector.into();
        self.request(|reply| SessionMsg::SearchResults {
            selector,
            limit,
            reply,
        })
        .await
    }

    pub async fn census(&self) -> Result<u64> {
        self.request(|reply| SessionMsg::Census { reply }).await
    }

    /// Read `url` in a side tab without leaving the current page.
    pub async fn read_in_tab(
        &self,
        url: impl Into<String>,
        passes: usize,
        scroll_px: i64,
        max_chars: usize,
    ) -> Result<TabReading> {
        let url = url.into();
        self.request(|reply| SessionMsg::ReadInTab {
            url,
            passes,
            scroll_px,
            max_chars,
            reply,
        })
        .await
    }

    /// Release the page. Safe to call when nothing is open.
    pub async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        if self.addr.send(SessionMsg::Close { reply: tx }).await.is_ok() {
            let _ = rx.await;
        }
    }
}
