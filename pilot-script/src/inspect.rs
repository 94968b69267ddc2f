//! Read-only looks at the current page: language guess, condensed summary,
//! interactive-element census, search-result links and reading pages in a
//! side tab.
use pilot_drivers::{Locator, Page};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const LINK_TEXT_CHARS: usize = 200;

/// Needles per language, checked in order against title, body and URL.
const LANGUAGE_SIGNALS: [(&str, &[&str]); 9] = [
    ("python", &["python", "print(", "def ", "pip "]),
    ("javascript", &["javascript", "js", "console.log", "node.js", ".js"]),
    ("java", &["java", "public static void main", ".java"]),
    ("c++", &["c++", "cpp", "#include <iostream>", ".cpp"]),
    ("c#", &["c#", ".cs", "using system;"]),
    ("typescript", &["typescript", ".ts"]),
    ("go", &["golang", "package main"]),
    ("php", &["php", "<?php"]),
    ("ruby", &["ruby", "puts "]),
];

pub const DEFAULT_LANGUAGE: &str = "python";

/// Guess the programming language a page is about from plain text.
pub fn guess_language(title: &str, body: &str, url: &str) -> &'static str {
    let haystack = format!("{title}\n{body}\n{url}").to_lowercase();
    LANGUAGE_SIGNALS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| haystack.contains(n)))
        .map(|(lang, _)| *lang)
        .unwrap_or(DEFAULT_LANGUAGE)
}

pub async fn detect_language(page: &dyn Page) -> &'static str {
    let title = page.title().await.unwrap_or_default();
    let body = page
        .inner_text(&Locator::css("body"))
        .await
        .unwrap_or_default();
    let url = page.current_url().await.unwrap_or_default();
    guess_language(&title, &body, &url)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub links: Vec<Link>,
    pub body: String,
}

const LINKS_SCRIPT: &str = r#"
const [selector, limit] = [arguments[0], arguments[1]];
const out = [];
for (const a of document.querySelectorAll(selector)) {
  if (out.length >= limit) break;
  const href = a.href || a.getAttribute('href') || '';
  if (!href) continue;
  out.push({ text: (a.innerText || '').trim(), href });
}
return out;
"#;

const CENSUS_SCRIPT: &str = r#"
return document.querySelectorAll(
  "a[href], button, input, select, textarea, [role='button'], [onclick], [contenteditable='true']"
).length;
"#;

async fn links(page: &dyn Page, selector: &str, limit: usize) -> anyhow::Result<Vec<Link>> {
    let raw = page
        .evaluate(LINKS_SCRIPT, vec![json!(selector), json!(limit)])
        .await?;
    let mut links: Vec<Link> = serde_json::from_value(raw).unwrap_or_default();
    links.truncate(limit);
    for link in &mut links {
        link.text = truncate_chars(&link.text, LINK_TEXT_CHARS);
    }
    Ok(links)
}

/// URL, title, up to `max_links` links and the first `max_body_chars` of text.
pub async fn summarize(
    page: &dyn Page,
    max_links: usize,
    max_body_chars: usize,
) -> anyhow::Result<PageSummary> {
    let url = page.current_url().await?;
    let title = page.title().await.unwrap_or_default();
    let links = links(page, "a", max_links).await.unwrap_or_default();
    let body = page
        .inner_text(&Locator::css("body"))
        .await
        .unwrap_or_default();
    Ok(PageSummary {
        url,
        title,
        links,
        body: truncate_chars(&body, max_body_chars),
    })
}

/// Links matching a result selector, in page order.
pub async fn search_results(
    page: &dyn Page,
    selector: &str,
    limit: usize,
) -> anyhow::Result<Vec<Link>> {
    links(page, selector, limit).await
}

/// Number of elements a user could interact with.
pub async fn interactive_census(page: &dyn Page) -> anyhow::Result<u64> {
    let raw = page.evaluate(CENSUS_SCRIPT, vec![]).await?;
    Ok(match raw {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    })
}

/// Text gathered from one page opened in its own tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabReading {
    pub url: String,
    pub title: String,
    pub pdf: bool,
    /// Body text per scroll pass, empty passes skipped.
    pub chunks: Vec<String>,
}

/// Viewers and direct links that render PDFs rather than HTML.
pub fn is_pdf_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with(".pdf") || lower.contains("/pdf") || lower.contains("viewer.html")
}

/// Open `url` in a new tab, read its text over `passes` scroll passes of
/// `scroll_px`, then close the tab. PDFs are detected and not read.
pub async fn read_in_tab(
    page: &dyn Page,
    url: &str,
    passes: usize,
    scroll_px: i64,
    max_chars: usize,
) -> anyhow::Result<TabReading> {
    if let Err(e) = page.open_tab(url).await {
        // The tab may already be current with a failed load in it.
        if let Err(close) = page.close_tab().await {
            debug!(target: "pilot.inspect", error = %close, "tab.close_after_open_failed");
        }
        return Err(e);
    }
    let reading = read_current(page, url, passes, scroll_px, max_chars).await;
    page.close_tab().await?;
    Ok(reading)
}

async fn read_current(
    page: &dyn Page,
    requested: &str,
    passes: usize,
    scroll_px: i64,
    max_chars: usize,
) -> TabReading {
    let url = page
        .current_url()
        .await
        .unwrap_or_else(|_| requested.to_string());
    let title = page.title().await.unwrap_or_default();
    let pdf = is_pdf_url(&url);
    let mut chunks = Vec::new();
    if !pdf {
        for pass in 0..passes.max(1) {
            let text = page
                .inner_text(&Locator::css("body"))
                .await
                .unwrap_or_default();
            let text = truncate_chars(text.trim(), max_chars);
            if !text.is_empty() {
                chunks.push(text);
            }
            if pass + 1 < passes {
                let _ = page.scroll_by(0, scroll_px).await;
            }
        }
    }
    TabReading {
        url,
        title,
        pdf,
        chunks,
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
