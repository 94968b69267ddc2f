//! Direct command phrases that map to fixed scripts before any model is asked.
use std::future::Future;

use pilot_script::{Action, ActionKind};
use serde::Serialize;
use tracing::info;

use crate::codegen::{CodeGenerator, GeneratedCode};
use crate::heuristics::{search_query, search_script};
use crate::planner::{PlanTier, Planner};

pub const INTENT_SEARCH_WAIT_MS: u64 = 2000;
pub const CLICK_WAIT_MS: u64 = 1500;
pub const LANGUAGE_WAIT_MS: u64 = 800;
pub const RUN_WAIT_MS: u64 = 3000;
/// Per-character delay for code typed into an editor.
pub const TYPING_DELAY_MS: u64 = 12;

const LEARN_PREFIXES: [&str; 3] = ["learn site", "profile site", "remember site"];
const LANGUAGE_PREFIXES: [&str; 2] = ["select language ", "choose language "];
const CLEAR_PREFIXES: [&str; 7] = [
    "remove the existing code",
    "remove the code",
    "remove code",
    "clear code",
    "clear the code",
    "delete code",
    "erase code",
];
const REPLACE_PREFIXES: [&str; 6] = [
    "remove the existing code and write ",
    "set code ",
    "rewrite code ",
    "replace code ",
    "over write code ",
    "overwrite code ",
];
const WRITE_PREFIXES: [&str; 4] = ["write code ", "type code ", "write ", "type "];
const RUN_PREFIXES: [&str; 2] = ["run code", "execute"];
const OUTPUT_PREFIXES: [&str; 3] = ["get output", "read output", "show output"];
const TABLE_PREFIXES: [&str; 2] = ["extract tables", "extract table"];
const SCREENSHOT_PREFIXES: [&str; 3] = ["screenshot", "take screenshot", "take a screenshot"];
const SCREENSHOT_PATH: &str = "page.png";

/// Fragments that only show up in source code, never in a task description.
const CODE_MARKERS: [&str; 9] = [
    "print(",
    "console.log(",
    "def ",
    "#include",
    "public static void main",
    "function(",
    "=>",
    ";",
    "{",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Search(String),
    LearnSite,
    ClickText(String),
    SelectLanguage(String),
    ClearCode,
    /// Code (or a description of it) to append at the caret.
    WriteCode(String),
    /// Code (or a description of it) that replaces the editor contents.
    ReplaceCode(String),
    RunCode,
    GetOutput,
    ExtractTables,
    Screenshot,
    /// No direct phrase matched; ask the planner.
    Plan,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Search(_) => "search",
            Intent::LearnSite => "learn_site",
            Intent::ClickText(_) => "click_text",
            Intent::SelectLanguage(_) => "select_language",
            Intent::ClearCode => "clear_code",
            Intent::WriteCode(_) => "write_code",
            Intent::ReplaceCode(_) => "replace_code",
            Intent::RunCode => "run_code",
            Intent::GetOutput => "get_output",
            Intent::ExtractTables => "extract_tables",
            Intent::Screenshot => "screenshot",
            Intent::Plan => "plan",
        }
    }
}

fn starts_with_any(lower: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| lower.starts_with(p))
}

/// Remainder of `command` after the first matching prefix, original casing.
fn rest_after<'a>(command: &'a str, lower: &str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes
        .iter()
        .find(|p| lower.starts_with(**p))
        .map(|p| command[p.len()..].trim())
}

/// Whether `text` already is source code rather than a request for some.
pub fn looks_like_code(text: &str) -> bool {
    CODE_MARKERS.iter().any(|m| text.contains(m))
}

/// Match a command against the direct phrases. Matching is on the lowercased
/// command; extracted arguments keep the caller's casing.
pub fn classify(command: &str) -> Intent {
    let command = command.trim();
    // ASCII lowering keeps byte offsets shared with `command`.
    let lower = command.to_ascii_lowercase();

    if lower.starts_with("search ") {
        let query = search_query(command).unwrap_or_default();
        return Intent::Search(query);
    }
    if starts_with_any(&lower, &LEARN_PREFIXES) {
        return Intent::LearnSite;
    }
    if (lower.starts_with("click ") || lower.starts_with("open ")) && !lower.starts_with("open website") {
        let target = command.split_once(' ').map(|(_, t)| t.trim()).unwrap_or(command);
        return Intent::ClickText(target.to_string());
    }
    if starts_with_any(&lower, &LANGUAGE_PREFIXES) {
        let lang = command.splitn(3, ' ').nth(2).map(str::trim).unwrap_or("");
        let lang = if lang.is_empty() { "python" } else { lang };
        return Intent::SelectLanguage(lang.to_string());
    }
    if let Some(rest) = rest_after(command, &lower, &REPLACE_PREFIXES) {
        return Intent::ReplaceCode(rest.to_string());
    }
    if starts_with_any(&lower, &CLEAR_PREFIXES) {
        return Intent::ClearCode;
    }
    if let Some(rest) = rest_after(command, &lower, &WRITE_PREFIXES) {
        return Intent::WriteCode(rest.to_string());
    }
    if lower.ends_with(" code") {
        let rest = &command[..command.len() - " code".len()];
        return Intent::WriteCode(rest.trim().to_string());
    }
    if starts_with_any(&lower, &RUN_PREFIXES) {
        return Intent::RunCode;
    }
    if starts_with_any(&lower, &OUTPUT_PREFIXES) {
        return Intent::GetOutput;
    }
    if starts_with_any(&lower, &TABLE_PREFIXES) {
        return Intent::ExtractTables;
    }
    if starts_with_any(&lower, &SCREENSHOT_PREFIXES) {
        return Intent::Screenshot;
    }
    Intent::Plan
}

/// Where a routed script came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "tier", rename_all = "snake_case")]
pub enum RouteOrigin {
    Intent(&'static str),
    Planner(PlanTier),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routed {
    pub origin: RouteOrigin,
    pub actions: Vec<Action>,
    /// Set when the script carries model- or stub-generated code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedCode>,
}

/// Turns a natural-language command into a script: direct phrases first,
/// the planner otherwise.
#[derive(Clone)]
pub struct Commander {
    planner: Planner,
    codegen: CodeGenerator,
}

impl Commander {
    pub fn new(planner: Planner, codegen: CodeGenerator) -> Self {
        Self { planner, codegen }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn codegen(&self) -> &CodeGenerator {
        &self.codegen
    }

    /// Resolve code for a write/replace intent. `language` is only awaited
    /// when code has to be generated.
    async fn code_for<F, Fut>(&self, request: &str, language: F) -> (String, Option<GeneratedCode>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        if looks_like_code(request) {
            return (request.to_string(), None);
        }
        let lang = language().await;
        let generated = self.codegen.generate(&lang, request).await;
        (generated.code.clone(), Some(generated))
    }

    pub async fn script_for<F, Fut>(&self, command: &str, language: F) -> Routed
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        let intent = classify(command);
        let label = intent.label();
        let mut generated = None;
        let actions = match intent {
            Intent::Search(query) => {
                let query = if query.is_empty() { command.trim().to_string() } else { query };
                search_script(&query, self.planner.search(), INTENT_SEARCH_WAIT_MS)
            }
            Intent::LearnSite => vec![ActionKind::LearnSite.into()],
            Intent::ClickText(text) => vec![
                ActionKind::ClickByText { text }.into(),
                Action::wait(CLICK_WAIT_MS),
            ],
            Intent::SelectLanguage(text) => vec![
                ActionKind::ClickByText { text }.into(),
                Action::wait(LANGUAGE_WAIT_MS),
            ],
            Intent::ClearCode => vec![ActionKind::FocusEditor.into(), ActionKind::ClearEditor.into()],
            Intent::WriteCode(request) => {
                let (code, produced) = self.code_for(&request, language).await;
                generated = produced;
                vec![
                    ActionKind::FocusEditor.into(),
                    ActionKind::WriteCode {
                        text: code,
                        delay: TYPING_DELAY_MS,
                    }
                    .into(),
                ]
            }
            Intent::ReplaceCode(request) => {
                let (code, produced) = self.code_for(&request, language).await;
                generated = produced;
                vec![
                    ActionKind::FocusEditor.into(),
                    ActionKind::ClearEditor.into(),
                    ActionKind::TypeCode {
                        text: code,
                        delay: TYPING_DELAY_MS,
                    }
                    .into(),
                ]
            }
            Intent::RunCode => vec![ActionKind::RunCode.into(), Action::wait(RUN_WAIT_MS)],
            Intent::GetOutput => vec![ActionKind::GetOutput.into()],
            Intent::ExtractTables => vec![ActionKind::ExtractTables.into()],
            Intent::Screenshot => vec![ActionKind::Screenshot {
                path: SCREENSHOT_PATH.to_string(),
            }
            .into()],
            Intent::Plan => {
                let plan = self.planner.plan(command).await;
                return Routed {
                    origin: RouteOrigin::Planner(plan.tier),
                    actions: plan.actions,
                    generated: None,
                };
            }
        };
        info!(target: "pilot.planner", intent = label, steps = actions.len(), "intent.routed");
        Routed {
            origin: RouteOrigin::Intent(label),
            actions,
            generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_classify_with_original_casing_kept() {
        assert_eq!(classify("Search for Rust Books"), Intent::Search("Rust Books".into()));
        assert_eq!(classify("learn site"), Intent::LearnSite);
        assert_eq!(classify("Click Sign In"), Intent::ClickText("Sign In".into()));
        assert_eq!(classify("select language Java"), Intent::SelectLanguage("Java".into()));
        assert_eq!(classify("select language"), Intent::SelectLanguage("python".into()));
        assert_eq!(classify("clear the code"), Intent::ClearCode);
        assert_eq!(classify("write code print('x')"), Intent::WriteCode("print('x')".into()));
        assert_eq!(
            classify("addition of two numbers code"),
            Intent::WriteCode("addition of two numbers".into())
        );
        assert_eq!(classify("Replace code factorial"), Intent::ReplaceCode("factorial".into()));
        assert_eq!(
            classify("remove the existing code and write fibonacci"),
            Intent::ReplaceCode("fibonacci".into())
        );
        assert_eq!(classify("run code"), Intent::RunCode);
        assert_eq!(classify("show output"), Intent::GetOutput);
        assert_eq!(classify("extract tables"), Intent::ExtractTables);
        assert_eq!(classify("take a screenshot"), Intent::Screenshot);
    }

    #[test]
    fn unmatched_commands_go_to_the_planner() {
        assert_eq!(classify("open website example.com"), Intent::Plan);
        assert_eq!(classify("go to example.com"), Intent::Plan);
        assert_eq!(classify("book a flight"), Intent::Plan);
    }

    #[test]
    fn literal_code_is_recognized() {
        assert!(looks_like_code("print('hi')"));
        assert!(looks_like_code("int x = 1;"));
        assert!(!looks_like_code("a function that adds two numbers"));
    }
}
