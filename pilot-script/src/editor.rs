//! Editor adapter: locate, focus, read, write and clear whatever code editor
//! a page embeds.
//!
//! Each widget family has a programmatic write path (and a matching read)
//! evaluated in the page. Writes are attempted in a fixed order and the first
//! script that reports success wins. Every operation reports failure as a
//! plain `false`/`None`; engine errors are logged and swallowed here.
use pilot_config::Limits;
use pilot_drivers::{Locator, Page};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    Monaco,
    #[serde(rename = "codemirror5")]
    CodeMirror5,
    #[serde(rename = "codemirror6")]
    CodeMirror6,
    Ace,
    Textarea,
    #[serde(rename = "contenteditable")]
    ContentEditable,
    #[default]
    Unknown,
}

impl EditorKind {
    /// Detection priority. Widgets that hide a textarea or a content-editable
    /// node inside themselves come before the bare elements.
    pub const DETECT_ORDER: [EditorKind; 6] = [
        EditorKind::Monaco,
        EditorKind::CodeMirror5,
        EditorKind::CodeMirror6,
        EditorKind::Ace,
        EditorKind::ContentEditable,
        EditorKind::Textarea,
    ];

    /// Programmatic write order.
    pub const WRITE_ORDER: [EditorKind; 6] = [
        EditorKind::Monaco,
        EditorKind::CodeMirror5,
        EditorKind::CodeMirror6,
        EditorKind::Ace,
        EditorKind::Textarea,
        EditorKind::ContentEditable,
    ];

    /// Selector for the widget root, used to recognise the widget.
    pub fn root_selector(self) -> Option<&'static str> {
        match self {
            EditorKind::Monaco => Some(".monaco-editor"),
            EditorKind::CodeMirror5 => Some(".CodeMirror"),
            EditorKind::CodeMirror6 => Some(".cm-editor"),
            EditorKind::Ace => Some(".ace_editor"),
            EditorKind::Textarea => Some("textarea"),
            EditorKind::ContentEditable => Some("[contenteditable='true']"),
            EditorKind::Unknown => None,
        }
    }

    /// Elements clicked to give the widget keyboard focus, best first.
    pub fn focus_selectors(self) -> &'static [&'static str] {
        match self {
            EditorKind::Monaco => &[".monaco-editor .view-lines"],
            EditorKind::CodeMirror5 => &[".CodeMirror"],
            EditorKind::CodeMirror6 => &[".cm-content", ".cm-editor"],
            EditorKind::Ace => &[".ace_editor"],
            EditorKind::Textarea => &["textarea:not(.ace_text-input)"],
            EditorKind::ContentEditable => &["[contenteditable='true']"],
            EditorKind::Unknown => &[],
        }
    }

    fn write_script(self) -> Option<&'static str> {
        match self {
            EditorKind::Monaco => Some(scripts::MONACO_WRITE),
            EditorKind::CodeMirror5 => Some(scripts::CM5_WRITE),
            EditorKind::CodeMirror6 => Some(scripts::CM6_WRITE),
            EditorKind::Ace => Some(scripts::ACE_WRITE),
            EditorKind::Textarea => Some(scripts::TEXTAREA_WRITE),
            EditorKind::ContentEditable => Some(scripts::CONTENTEDITABLE_WRITE),
            EditorKind::Unknown => None,
        }
    }

    fn read_script(self) -> Option<&'static str> {
        match self {
            EditorKind::Monaco => Some(scripts::MONACO_READ),
            EditorKind::CodeMirror5 => Some(scripts::CM5_READ),
            EditorKind::CodeMirror6 => Some(scripts::CM6_READ),
            EditorKind::Ace => Some(scripts::ACE_READ),
            EditorKind::Textarea => Some(scripts::TEXTAREA_READ),
            EditorKind::ContentEditable => Some(scripts::CONTENTEDITABLE_READ),
            EditorKind::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditorKind::Monaco => "monaco",
            EditorKind::CodeMirror5 => "codemirror5",
            EditorKind::CodeMirror6 => "codemirror6",
            EditorKind::Ace => "ace",
            EditorKind::Textarea => "textarea",
            EditorKind::ContentEditable => "contenteditable",
            EditorKind::Unknown => "unknown",
        }
    }
}

/// In-page scripts. Each is a function body: arguments arrive as
/// `arguments[i]` and the result is `return`ed. Writers return `true` only
/// when their widget exists and accepted the text; readers return `null`
/// when their widget is absent.
pub mod scripts {
    pub const MONACO_WRITE: &str = r#"
const t = arguments[0];
try {
  if (window.monaco && monaco.editor && monaco.editor.getModels().length) {
    monaco.editor.getModels()[0].setValue(t);
    return true;
  }
  if (window.editor && typeof window.editor.setValue === 'function') {
    window.editor.setValue(t);
    return true;
  }
} catch (e) {}
return false;
"#;

    pub const MONACO_READ: &str = r#"
try {
  if (window.monaco && monaco.editor && monaco.editor.getModels().length) {
    return monaco.editor.getModels()[0].getValue();
  }
} catch (e) {}
const lines = document.querySelector('.monaco-editor .view-lines');
return lines ? lines.innerText : null;
"#;

    pub const CM5_WRITE: &str = r#"
const t = arguments[0];
const el = document.querySelector('.CodeMirror');
if (el && el.CodeMirror) {
  el.CodeMirror.setValue(t);
  return true;
}
return false;
"#;

    pub const CM5_READ: &str = r#"
const el = document.querySelector('.CodeMirror');
return el && el.CodeMirror ? el.CodeMirror.getValue() : null;
"#;

    pub const CM6_WRITE: &str = r#"
const t = arguments[0];
const host = document.querySelector('.cm-editor');
if (!host) return false;
const view = host.cmView || host.view || host.__cmView || host.editorView || (host.cm && host.cm.view);
if (view && view.state && typeof view.dispatch === 'function') {
  view.dispatch({ changes: { from: 0, to: view.state.doc.length, insert: t } });
  return true;
}
const content = host.querySelector('.cm-content[contenteditable="true"]');
if (content) {
  content.innerText = t;
  content.dispatchEvent(new InputEvent('input', { bubbles: true }));
  return true;
}
return false;
"#;

    pub const CM6_READ: &str = r#"
const host = document.querySelector('.cm-editor');
if (!host) return null;
const view = host.cmView || host.view || host.__cmView || host.editorView || (host.cm && host.cm.view);
if (view && view.state) return view.state.doc.toString();
const content = host.querySelector('.cm-content');
return content ? content.innerText : null;
"#;

    pub const ACE_WRITE: &str = r#"
const t = arguments[0];
const el = document.querySelector('.ace_editor');
if (!el) return false;
const ed = (el.env && el.env.editor) || (window.ace && ace.edit(el));
if (ed && typeof ed.setValue === 'function') {
  ed.setValue(t, -1);
  return true;
}
return false;
"#;

    pub const ACE_READ: &str = r#"
const el = document.querySelector('.ace_editor');
if (!el) return null;
const ed = (el.env && el.env.editor) || (window.ace && ace.edit(el));
return ed && typeof ed.getValue === 'function' ? ed.getValue() : null;
"#;

    /// Skips textareas that are the hidden input of another widget.
    pub const TEXTAREA_WRITE: &str = r#"
const t = arguments[0];
const all = Array.from(document.querySelectorAll('textarea'));
const el = all.find(a => !a.closest('.CodeMirror, .monaco-editor, .ace_editor'));
if (!el) return false;
el.value = t;
el.dispatchEvent(new Event('input', { bubbles: true }));
return true;
"#;

    pub const TEXTAREA_READ: &str = r#"
const all = Array.from(document.querySelectorAll('textarea'));
const el = all.find(a => !a.closest('.CodeMirror, .monaco-editor, .ace_editor'));
return el ? el.value : null;
"#;

    pub const CONTENTEDITABLE_WRITE: &str = r#"
const t = arguments[0];
const el = document.querySelector('[contenteditable="true"]');
if (!el) return false;
el.innerText = t;
el.dispatchEvent(new InputEvent('input', { bubbles: true }));
return true;
"#;

    pub const CONTENTEDITABLE_READ: &str = r#"
const el = document.querySelector('[contenteditable="true"]');
return el ? el.innerText : null;
"#;

    pub const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0); return true;";
}

async fn present(page: &dyn Page, selector: &str) -> bool {
    page.count(&Locator::css(selector))
        .await
        .map(|n| n > 0)
        .unwrap_or(false)
}

/// First widget kind present on the page, in detection order.
pub async fn detect_kind(page: &dyn Page) -> EditorKind {
    for kind in EditorKind::DETECT_ORDER {
        if let Some(root) = kind.root_selector() {
            if present(page, root).await {
                return kind;
            }
        }
    }
    EditorKind::Unknown
}

/// Click the first focusable editor surface found. Ace's hidden textarea is
/// never clicked; the Ace root is checked before any textarea.
pub async fn detect_and_focus(page: &dyn Page) -> bool {
    for kind in EditorKind::DETECT_ORDER {
        for selector in kind.focus_selectors() {
            if !present(page, selector).await {
                continue;
            }
            let target = Locator::css(*selector);
            match page.click(&target).await {
                Ok(()) => {
                    debug!(target: "pilot.editor", kind = kind.as_str(), selector, "editor.focused");
                    return true;
                }
                Err(e) => {
                    debug!(target: "pilot.editor", selector, error = %e, "editor.focus_failed");
                }
            }
        }
    }
    false
}

/// Look for an editor, then walk the page downward in fixed steps, looking
/// again after each step. A second pass starts again from the top.
pub async fn find_and_focus(page: &dyn Page, limits: &Limits) -> bool {
    if detect_and_focus(page).await {
        return true;
    }
    let step = limits.focus_scroll_step_px.max(1);
    for pass in 0..2 {
        if pass > 0 {
            let _ = page.evaluate(scripts::SCROLL_TO_TOP, vec![]).await;
        }
        let mut travelled = 0;
        while travelled < limits.focus_scroll_max_px {
            if let Err(e) = page.scroll_by(0, step).await {
                warn!(target: "pilot.editor", error = %e, "editor.scroll_failed");
                break;
            }
            travelled += step;
            if detect_and_focus(page).await {
                return true;
            }
        }
    }
    false
}

async fn eval_string(page: &dyn Page, script: &str) -> Option<String> {
    match page.evaluate(script, vec![]).await {
        Ok(Value::String(s)) => Some(s),
        Ok(_) => None,
        Err(e) => {
            debug!(target: "pilot.editor", error = %e, "editor.read_failed");
            None
        }
    }
}

/// Editor text as reported by the first reader in write order, so it comes
/// from the same widget a programmatic write lands in.
pub async fn read_written(page: &dyn Page) -> Option<String> {
    for kind in EditorKind::WRITE_ORDER {
        let Some(script) = kind.read_script() else {
            continue;
        };
        if let Some(text) = eval_string(page, script).await {
            return Some(text);
        }
    }
    None
}

/// Best-effort editor text: the widget readers in write order, then
/// CodeMirror's rendered content, Monaco's rendered lines, and finally the
/// whole page body.
pub async fn read_value(page: &dyn Page) -> String {
    if let Some(text) = read_written(page).await {
        return text;
    }
    for selector in [".cm-content", ".monaco-editor .view-lines"] {
        let locator = Locator::css(selector);
        if present(page, selector).await {
            if let Ok(text) = page.inner_text(&locator).await {
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    page.inner_text(&Locator::css("body"))
        .await
        .unwrap_or_default()
}

/// Programmatically replace the editor's content. Returns the widget that
/// accepted the text.
pub async fn write_with(page: &dyn Page, text: &str) -> Option<EditorKind> {
    for kind in EditorKind::WRITE_ORDER {
        let Some(script) = kind.write_script() else {
            continue;
        };
        match page.evaluate(script, vec![json!(text)]).await {
            Ok(Value::Bool(true)) => {
                debug!(target: "pilot.editor", kind = kind.as_str(), chars = text.chars().count(), "editor.written");
                return Some(kind);
            }
            Ok(_) => {}
            Err(e) => debug!(target: "pilot.editor", kind = kind.as_str(), error = %e, "editor.write_failed"),
        }
    }
    None
}

pub async fn write_value(page: &dyn Page, text: &str) -> bool {
    write_with(page, text).await.is_some()
}

/// Empty the editor. Falls back to select-all plus delete, which only counts
/// if the widget then reads back empty.
pub async fn clear(page: &dyn Page) -> bool {
    if write_value(page, "").await {
        return true;
    }
    if !detect_and_focus(page).await {
        return false;
    }
    if page.press_key("Control+A").await.is_err() || page.press_key("Delete").await.is_err() {
        return false;
    }
    matches!(read_written(page).await, Some(text) if text.is_empty())
}

/// Focus the editor and send `text` as keystrokes, `delay` apart.
pub async fn simulate_typing(page: &dyn Page, text: &str, delay: Duration) -> bool {
    if !detect_and_focus(page).await {
        return false;
    }
    match page.type_text(text, delay).await {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "pilot.editor", error = %e, "editor.typing_failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_order_puts_widgets_before_bare_elements() {
        let pos = |k| EditorKind::DETECT_ORDER.iter().position(|x| *x == k).unwrap();
        assert!(pos(EditorKind::Ace) < pos(EditorKind::Textarea));
        assert!(pos(EditorKind::CodeMirror6) < pos(EditorKind::ContentEditable));
        assert_eq!(EditorKind::WRITE_ORDER[4], EditorKind::Textarea);
    }

    #[test]
    fn textarea_focus_skips_ace_hidden_input() {
        assert_eq!(
            EditorKind::Textarea.focus_selectors(),
            &["textarea:not(.ace_text-input)"]
        );
        assert!(!scripts::TEXTAREA_READ.contains("all[0]"));
    }

    #[test]
    fn kinds_serialize_to_short_names() {
        assert_eq!(
            serde_json::to_value(EditorKind::CodeMirror6).unwrap(),
            "codemirror6"
        );
        assert_eq!(
            serde_json::from_value::<EditorKind>(serde_json::json!("contenteditable")).unwrap(),
            EditorKind::ContentEditable
        );
        for kind in EditorKind::DETECT_ORDER {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
