//! HTTP surface: browser setup/teardown, agent queries and the browser
//! activity stream.
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use pilot_actors::SessionHandle;
use pilot_common::AgentKind;
use pilot_config::{SearchSettings, ServerSettings};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::agents::{run_agent, AgentContext, AGENT_SEARCH_WAIT_MS};
use crate::events::{EventBus, StreamEvent};

/// Shared by every handler.
pub struct AppState {
    pub session: SessionHandle,
    pub search: SearchSettings,
    pub bus: EventBus,
    pub keepalive: Duration,
    pub search_wait_ms: u64,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(session: SessionHandle, search: SearchSettings, server: &ServerSettings) -> Self {
        Self {
            session,
            search,
            bus: EventBus::default(),
            keepalive: Duration::from_secs(server.keepalive_secs.max(1)),
            search_wait_ms: AGENT_SEARCH_WAIT_MS,
            ready: AtomicBool::new(false),
        }
    }

    pub fn with_search_wait(mut self, ms: u64) -> Self {
        self.search_wait_ms = ms;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn agent_context(&self) -> AgentContext {
        AgentContext {
            session: self.session.clone(),
            search: self.search.clone(),
            bus: self.bus.clone(),
            search_wait_ms: self.search_wait_ms,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/setup-browser", post(setup_browser))
        .route("/cleanup", post(cleanup))
        .route("/query", post(query))
        .route("/browser-events", get(browser_events))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then release the browser.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(target: "pilot.server", %addr, "server.listening");
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;
    state.session.close().await;
    info!(target: "pilot.server", "server.stopped");
    Ok(())
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"detail": message.into()}))).into_response()
}

fn success(message: &str) -> Response {
    Json(json!({"status": "success", "message": message})).into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct SetupRequest {
    #[serde(default)]
    pub url: Option<String>,
}

async fn setup_browser(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // An empty or unparsable body means "use the landing page".
    let req: SetupRequest = serde_json::from_slice(&body).unwrap_or_default();
    let url = req
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| state.search.landing_url.clone());

    if state.ready.swap(false, Ordering::SeqCst) {
        state.session.close().await;
    }
    if let Err(e) = state.session.open().await {
        warn!(target: "pilot.server", error = %e, "setup.failed");
        return detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to setup browser: {e}"),
        );
    }
    if let Err(e) = state.session.navigate(url.clone()).await {
        warn!(target: "pilot.server", %url, error = %e, "setup.navigate_failed");
        if let Err(e) = state.session.navigate(state.search.landing_url.clone()).await {
            state.session.close().await;
            return detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to setup browser: {e}"),
            );
        }
    }
    state.ready.store(true, Ordering::SeqCst);
    state
        .bus
        .publish(StreamEvent::browser_action(format!("Browser ready at {url}")));
    info!(target: "pilot.server", %url, "setup.ready");
    success("Browser setup complete")
}

async fn cleanup(State(state): State<Arc<AppState>>) -> Response {
    state.ready.store(false, Ordering::SeqCst);
    state.session.close().await;
    info!(target: "pilot.server", "cleanup.done");
    success("Browser cleanup complete")
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub agent_type: String,
}

async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    if !state.is_ready() {
        return detail(
            StatusCode::BAD_REQUEST,
            "Browser not initialized. Call /setup-browser first",
        );
    }
    let Some(kind) = AgentKind::parse(&req.agent_type) else {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "agent_type must be one of task, research, deep_research (got {:?})",
                req.agent_type
            ),
        );
    };
    let events = run_agent(kind, req.query, state.agent_context())
        .map(|event| Ok::<Event, Infallible>(event.to_sse()));
    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(state.keepalive))
        .into_response()
}

fn bus_stream(bus: &EventBus) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(bus.subscribe()).filter_map(
        |item: Result<StreamEvent, BroadcastStreamRecvError>| async move {
            match item {
                Ok(event) => Some(Ok(event.to_sse())),
                // Lagged subscribers skip what they missed.
                Err(_) => None,
            }
        },
    )
}

async fn browser_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Sse::new(bus_stream(&state.bus)).keep_alive(KeepAlive::new().interval(state.keepalive))
}
