use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How to find elements on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// Elements whose own text contains (or, when `exact`, equals) `text`.
    /// Matching ignores ASCII case and surrounding whitespace.
    Text { text: String, exact: bool },
    /// `<button>`s whose rendered text contains (or equals) `text`.
    ButtonText { text: String, exact: bool },
}

/// Resolved form handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Css,
    XPath,
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn button(text: impl Into<String>, exact: bool) -> Self {
        Locator::ButtonText {
            text: text.into(),
            exact,
        }
    }

    /// Strategy plus query string understood by a WebDriver endpoint.
    pub fn compile(&self) -> (Strategy, String) {
        match self {
            Locator::Css(css) => (Strategy::Css, css.clone()),
            Locator::XPath(xpath) => (Strategy::XPath, xpath.clone()),
            Locator::Text { text, exact } => {
                let needle = xpath_literal(&text.trim().to_ascii_lowercase());
                let own_text = format!("translate(normalize-space(.), '{UPPER}', '{LOWER}')");
                let test = if *exact {
                    format!("{own_text}={needle}")
                } else {
                    format!("contains({own_text}, {needle})")
                };
                (
                    Strategy::XPath,
                    format!("//*[not(self::script or self::style)][text()[{test}]]"),
                )
            }
            Locator::ButtonText { text, exact } => {
                let needle = xpath_literal(text.trim());
                let test = if *exact {
                    format!("normalize-space(.)={needle}")
                } else {
                    format!("contains(normalize-space(.), {needle})")
                };
                (Strategy::XPath, format!("//button[{test}]"))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "css={css}"),
            Locator::XPath(xpath) => write!(f, "xpath={xpath}"),
            Locator::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Locator::Text { text, exact: false } => write!(f, "text~{text}"),
            Locator::ButtonText { text, exact: true } => write!(f, "button=\"{text}\""),
            Locator::ButtonText { text, exact: false } => write!(f, "button~{text}"),
        }
    }
}

/// Quote `input` as an XPath string literal, splitting on `"` when both
/// quote kinds occur.
pub fn xpath_literal(input: &str) -> String {
    if !input.contains('"') {
        return format!("\"{input}\"");
    }
    if !input.contains('\'') {
        return format!("'{input}'");
    }
    let segments: Vec<&str> = input.split('"').collect();
    let mut parts = Vec::with_capacity(segments.len() * 2);
    for (index, part) in segments.iter().enumerate() {
        if !part.is_empty() {
            parts.push(format!("\"{part}\""));
        }
        if index + 1 < segments.len() {
            parts.push("'\"'".to_string());
        }
    }
    format!("concat({})", parts.join(","))
}

/// The browser capabilities the interpreter relies on.
///
/// Element-level operations act on the first *visible* match of a locator,
/// falling back to the first match when none is displayed. Scripts passed
/// to [`Page::evaluate`] are function bodies: arguments arrive as
/// `arguments[i]` and the result is whatever the body `return`s.
#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url` and wait for DOM content loaded.
    async fn goto(&self, url: &str) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;

    /// Number of elements matching `locator`.
    async fn count(&self, locator: &Locator) -> Result<usize>;
    /// Number of matching elements that are displayed.
    async fn visible_count(&self, locator: &Locator) -> Result<usize>;
    /// Poll until a match is displayed. `Ok(false)` when `timeout` elapses.
    async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool>;

    async fn click(&self, locator: &Locator) -> Result<()>;
    /// Replace the value of an input-like element.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;
    /// Press a key or chord (`"Enter"`, `"Control+A"`) with the element focused.
    async fn press_on(&self, locator: &Locator, key: &str) -> Result<()>;
    async fn hover(&self, locator: &Locator) -> Result<()>;
    async fn inner_text(&self, locator: &Locator) -> Result<String>;
    /// `inner_text` of every match, in document order.
    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>>;
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Press a key or chord on whatever currently has focus.
    async fn press_key(&self, key: &str) -> Result<()>;
    /// Type into whatever currently has focus, `delay` between characters.
    async fn type_text(&self, text: &str, delay: Duration) -> Result<()>;
    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()>;
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Open `url` in a new tab and make it current. When the load fails the
    /// new tab is left current, so callers close it with `close_tab`.
    async fn open_tab(&self, url: &str) -> Result<()>;
    /// Close the current tab and return to the one it was opened from.
    async fn close_tab(&self) -> Result<()>;

    /// End the engine session. Further calls fail.
    async fn close(&self) -> Result<()>;
}

pub type SharedPage = Arc<dyn Page>;

/// Opens pages; the browser session calls this lazily on first use.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> Result<SharedPage>;
}
