mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{SitePage, TestServer};
use futures::StreamExt;
use pilot_server::{EventKind, StreamEvent};
use serde_json::{json, Value};

fn kinds(events: &[StreamEvent]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

fn lines_of(events: &[StreamEvent], kind: EventKind) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == kind)
        .filter_map(|e| e.content.get(0).and_then(Value::as_str).map(str::to_string))
        .collect()
}

#[tokio::test]
async fn query_requires_a_browser() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    let resp = server
        .client
        .post(server.url("/query"))
        .json(&json!({"query": "rust", "agent_type": "task"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Browser not initialized. Call /setup-browser first");
    assert_eq!(server.launcher.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn setup_then_cleanup_round_trip() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    let resp = server.setup("https://example.com/").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "success", "message": "Browser setup complete"}));
    assert!(server.page.log().contains(&"goto:https://example.com/".to_string()));

    let resp = server.client.post(server.url("/cleanup")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(server.page.closed.load(Ordering::SeqCst), 1);

    let resp = server
        .client
        .post(server.url("/query"))
        .json(&json!({"query": "rust", "agent_type": "task"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unreachable_setup_url_falls_back_to_the_landing_page() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    let resp = server.setup("https://unreachable.invalid/").await;
    assert_eq!(resp.status(), 200);
    assert!(server.page.log().contains(&"goto:https://www.google.com".to_string()));
}

#[tokio::test]
async fn unknown_agent_type_is_rejected() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    server.setup("https://example.com/").await;
    let resp = server
        .client
        .post(server.url("/query"))
        .json(&json!({"query": "rust", "agent_type": "chat"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn task_agent_searches_opens_first_result_and_counts_elements() {
    let server = TestServer::start(SitePage::with_results(&[
        ("Rust Programming Language", "https://www.rust-lang.org/"),
        ("Rust (video game)", "https://rust.facepunch.com/"),
    ]))
    .await;
    server.setup("https://example.com/").await;

    let events = server.query("rust", "task").await;
    assert_eq!(events.first().unwrap().kind, EventKind::Keepalive);
    assert_eq!(
        lines_of(&events, EventKind::BrowserAction),
        vec![
            "Searched for: rust".to_string(),
            "Opened first result: Rust Programming Language".to_string(),
        ]
    );
    assert_eq!(
        lines_of(&events, EventKind::DomUpdate),
        vec!["Found 42 interactive elements".to_string()]
    );
    let tail = &kinds(&events)[events.len() - 3..];
    assert_eq!(tail, [EventKind::FinalResponse, EventKind::Complete, EventKind::End]);

    let log = server.page.log();
    assert!(log.contains(&"goto:https://duckduckgo.com/".to_string()));
    assert!(log.contains(&"type:rust".to_string()));
    assert!(log.contains(&"press:Enter".to_string()));
    assert_eq!(log.last().unwrap(), "goto:https://www.rust-lang.org/");
}

#[tokio::test]
async fn research_agent_summarizes_each_result_and_skips_pdfs() {
    let server = TestServer::start(SitePage::with_results(&[
        ("Guide", "https://docs.example/guide"),
        ("Paper", "https://papers.example/paper.pdf"),
    ]))
    .await;
    server.setup("https://example.com/").await;

    let events = server.query("async rust", "research").await;
    assert_eq!(
        lines_of(&events, EventKind::DomUpdate),
        vec!["Found 2 results".to_string()]
    );
    assert_eq!(
        lines_of(&events, EventKind::BrowserAction)[1..],
        ["Opened result 1: Guide".to_string(), "Opened result 2: Paper".to_string()]
    );
    let final_response = events
        .iter()
        .find(|e| e.kind == EventKind::FinalResponse)
        .unwrap();
    assert_eq!(final_response.content["query"], "async rust");
    let summaries = final_response.content["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["summary"], "Body of https://docs.example/guide");
    assert_eq!(summaries[1]["summary"], "PDF detected; skipping text extraction.");
    assert!(events.last().unwrap().is_terminal());

    // Every side tab was closed again.
    let log = server.page.log();
    let opened = log.iter().filter(|l| l.starts_with("open_tab:")).count();
    let closed = log.iter().filter(|l| *l == "close_tab").count();
    assert_eq!((opened, closed), (2, 2));
}

#[tokio::test]
async fn deep_research_scrolls_and_compiles_sources() {
    let server = TestServer::start(SitePage::with_results(&[(
        "Guide",
        "https://docs.example/guide",
    )]))
    .await;
    server.setup("https://example.com/").await;

    let events = server.query("async rust", "deep_research").await;
    let final_response = events
        .iter()
        .find(|e| e.kind == EventKind::FinalResponse)
        .unwrap();
    let compiled = final_response.content["compiled"].as_array().unwrap();
    assert_eq!(compiled.len(), 1);
    assert_eq!(compiled[0]["chunks"].as_array().unwrap().len(), 3);
    assert_eq!(
        final_response.content["synthesis"]["sources"],
        json!([{"title": "Guide", "url": "https://docs.example/guide"}])
    );
    let scrolls = server
        .page
        .log()
        .iter()
        .filter(|l| *l == "scroll:1200")
        .count();
    assert_eq!(scrolls, 2);
}

#[tokio::test]
async fn research_without_results_reports_and_terminates() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    server.setup("https://example.com/").await;
    let events = server.query("nothing", "research").await;
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::Error && e.content == json!("No results found")));
    let tail = &kinds(&events)[events.len() - 2..];
    assert_eq!(tail, [EventKind::Complete, EventKind::End]);
}

#[tokio::test]
async fn browser_events_stream_mirrors_activity() {
    let server = TestServer::start(SitePage::with_results(&[])).await;
    let resp = server
        .client
        .get(server.url("/browser-events"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let mut chunks = resp.bytes_stream();

    server.setup("https://example.com/").await;

    let mut seen = String::new();
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(chunk)) = chunks.next().await {
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains("Browser ready at https://example.com/") {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    assert!(found, "no browser event received: {seen:?}");
}
