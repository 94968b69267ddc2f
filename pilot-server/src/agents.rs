//! Streaming agents behind `POST /query`.
//!
//! Each agent drives the shared browser session step by step and yields one
//! event per finished step. Browser-facing events are also published on the
//! [`EventBus`] so `/browser-events` subscribers see the same activity.
use std::pin::Pin;

use futures::Stream;
use pilot_actors::SessionHandle;
use pilot_common::{AgentKind, PilotError};
use pilot_config::SearchSettings;
use pilot_planner::heuristics::search_script;
use pilot_script::inspect::{Link, TabReading};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::events::{EventBus, EventKind, StreamEvent};

pub const AGENT_SEARCH_WAIT_MS: u64 = 2000;
pub const RESEARCH_RESULTS: usize = 5;
pub const DEEP_RESEARCH_RESULTS: usize = 8;
pub const SUMMARY_CHARS: usize = 1000;
pub const DEEP_CHUNK_CHARS: usize = 1500;
pub const DEEP_SCROLL_PASSES: usize = 3;
pub const DEEP_SCROLL_PX: i64 = 1200;
const PDF_NOTE: &str = "PDF detected; skipping text extraction.";

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// What an agent needs from the server.
#[derive(Clone)]
pub struct AgentContext {
    pub session: SessionHandle,
    pub search: SearchSettings,
    pub bus: EventBus,
    /// Pause after submitting the search, for results to render.
    pub search_wait_ms: u64,
}

impl AgentContext {
    /// Mirror browser-facing events onto the bus and hand the event back.
    fn emit(&self, event: StreamEvent) -> StreamEvent {
        if matches!(
            event.kind,
            EventKind::BrowserAction | EventKind::DomUpdate | EventKind::Error
        ) {
            self.bus.publish(event.clone());
        }
        event
    }

    /// Type the query into the configured search engine. `Err` carries the
    /// event that ends the run.
    async fn search(&self, query: &str) -> Result<Vec<StreamEvent>, StreamEvent> {
        let script = search_script(query, &self.search, self.search_wait_ms);
        let outcome = self
            .session
            .execute(script)
            .await
            .map_err(|e| self.emit(StreamEvent::error(format!("Search failed: {e}"))))?;
        if outcome.captcha_blocked {
            return Err(self.emit(StreamEvent::error(outcome.message)));
        }
        let mut events = Vec::new();
        if let Some(first) = outcome.errors.first() {
            events.push(self.emit(StreamEvent::error(first.clone())));
        }
        events.push(self.emit(StreamEvent::browser_action(format!("Searched for: {query}"))));
        Ok(events)
    }

    async fn top_results(&self, limit: usize) -> Vec<Link> {
        match self
            .session
            .search_results(self.search.result_selector.clone(), limit)
            .await
        {
            Ok(links) => links,
            Err(e) => {
                warn!(target: "pilot.server", error = %e, "agent.results_failed");
                Vec::new()
            }
        }
    }
}

fn title_of(link: &Link) -> &str {
    if link.text.trim().is_empty() {
        &link.href
    } else {
        link.text.trim()
    }
}

fn session_lost(e: &PilotError) -> bool {
    matches!(e, PilotError::Session(_))
}

pub fn run_agent(kind: AgentKind, query: String, ctx: AgentContext) -> EventStream {
    info!(target: "pilot.server", agent = kind.as_str(), %query, "agent.started");
    match kind {
        AgentKind::Task => task_agent(query, ctx),
        AgentKind::Research => research_agent(query, ctx),
        AgentKind::DeepResearch => deep_research_agent(query, ctx),
    }
}

/// Search, open the first hit, report how interactive the page is.
fn task_agent(query: String, ctx: AgentContext) -> EventStream {
    Box::pin(async_stream::stream! {
        yield StreamEvent::keepalive("starting");
        match ctx.search(&query).await {
            Ok(events) => {
                for event in events {
                    yield event;
                }
            }
            Err(event) => {
                yield event;
                yield StreamEvent::complete();
                yield StreamEvent::end();
                return;
            }
        }

        match ctx.top_results(1).await.into_iter().next() {
            Some(first) => match ctx.session.navigate(first.href.clone()).await {
                Ok(()) => {
                    let line = format!("Opened first result: {}", title_of(&first));
                    yield ctx.emit(StreamEvent::browser_action(line));
                }
                Err(e) => {
                    yield ctx.emit(StreamEvent::error(format!("Clicking result failed: {e}")));
                }
            },
            None => {
                yield ctx.emit(StreamEvent::error("No results found"));
            }
        }

        if let Ok(count) = ctx.session.census().await {
            yield ctx.emit(StreamEvent::dom_update(format!("Found {count} interactive elements")));
        }

        yield StreamEvent::final_response(json!("Task agent completed initial navigation."));
        yield StreamEvent::complete();
        yield StreamEvent::end();
    })
}

#[derive(Debug, Serialize)]
struct Summary {
    title: String,
    url: String,
    summary: String,
}

#[derive(Debug, Serialize)]
struct Compiled {
    title: String,
    url: String,
    chunks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Source {
    title: String,
    url: String,
}

/// Per-result outcome of reading search hits in side tabs.
enum Visit {
    Read { title: String, reading: TabReading },
    Failed(StreamEvent),
    Lost(StreamEvent),
}

async fn visit(ctx: &AgentContext, idx: usize, link: &Link, passes: usize, scroll_px: i64, chars: usize) -> Visit {
    match ctx
        .session
        .read_in_tab(link.href.clone(), passes, scroll_px, chars)
        .await
    {
        Ok(reading) => Visit::Read {
            title: title_of(link).to_string(),
            reading,
        },
        Err(e) => {
            let event = ctx.emit(StreamEvent::error(format!("Failed to open result {idx}: {e}")));
            if session_lost(&e) {
                Visit::Lost(event)
            } else {
                Visit::Failed(event)
            }
        }
    }
}

/// Summarize the top results, one side tab each.
fn research_agent(query: String, ctx: AgentContext) -> EventStream {
    Box::pin(async_stream::stream! {
        yield StreamEvent::keepalive("research-start");
        match ctx.search(&query).await {
            Ok(events) => {
                for event in events {
                    yield event;
                }
            }
            Err(event) => {
                yield event;
                yield StreamEvent::complete();
                yield StreamEvent::end();
                return;
            }
        }
        let links = ctx.top_results(RESEARCH_RESULTS).await;
        if links.is_empty() {
            yield ctx.emit(StreamEvent::error("No results found"));
            yield StreamEvent::complete();
            yield StreamEvent::end();
            return;
        }
        yield ctx.emit(StreamEvent::dom_update(format!("Found {} results", links.len())));

        let mut summaries = Vec::new();
        for (idx, link) in links.iter().enumerate().map(|(i, l)| (i + 1, l)) {
            match visit(&ctx, idx, link, 1, 0, SUMMARY_CHARS).await {
                Visit::Read { title, reading } => {
                    yield ctx.emit(StreamEvent::browser_action(format!("Opened result {idx}: {title}")));
                    let summary = if reading.pdf {
                        PDF_NOTE.to_string()
                    } else {
                        reading.chunks.into_iter().next().unwrap_or_default()
                    };
                    summaries.push(Summary { title, url: reading.url, summary });
                }
                Visit::Failed(event) => {
                    yield event;
                }
                Visit::Lost(event) => {
                    yield event;
                    break;
                }
            }
        }

        yield StreamEvent::final_response(json!({"query": query, "summaries": summaries}));
        yield StreamEvent::complete();
        yield StreamEvent::end();
    })
}

/// More results, several scroll passes per page, and a compiled synthesis.
fn deep_research_agent(query: String, ctx: AgentContext) -> EventStream {
    Box::pin(async_stream::stream! {
        yield StreamEvent::keepalive("deep-research-start");
        match ctx.search(&query).await {
            Ok(events) => {
                for event in events {
                    yield event;
                }
            }
            Err(event) => {
                yield event;
                yield StreamEvent::complete();
                yield StreamEvent::end();
                return;
            }
        }
        let links = ctx.top_results(DEEP_RESEARCH_RESULTS).await;
        if links.is_empty() {
            yield ctx.emit(StreamEvent::error("No results found"));
            yield StreamEvent::complete();
            yield StreamEvent::end();
            return;
        }
        yield ctx.emit(StreamEvent::dom_update(format!("Found {} results", links.len())));

        let mut compiled = Vec::new();
        for (idx, link) in links.iter().enumerate().map(|(i, l)| (i + 1, l)) {
            match visit(&ctx, idx, link, DEEP_SCROLL_PASSES, DEEP_SCROLL_PX, DEEP_CHUNK_CHARS).await {
                Visit::Read { title, reading } => {
                    yield ctx.emit(StreamEvent::browser_action(format!("Opened result {idx}: {title}")));
                    let chunks = if reading.pdf { vec![PDF_NOTE.to_string()] } else { reading.chunks };
                    compiled.push(Compiled { title, url: reading.url, chunks });
                }
                Visit::Failed(event) => {
                    yield event;
                }
                Visit::Lost(event) => {
                    yield event;
                    break;
                }
            }
        }

        let sources: Vec<Source> = compiled
            .iter()
            .map(|c| Source { title: c.title.clone(), url: c.url.clone() })
            .collect();
        let synthesis = json!({
            "query": query,
            "notes": format!("Compiled content from {} sources.", sources.len()),
            "sources": sources,
        });
        yield StreamEvent::final_response(json!({"synthesis": synthesis, "compiled": compiled}));
        yield StreamEvent::complete();
        yield StreamEvent::end();
    })
}
