//! Typed action records and the JSON action-script format.
//!
//! An action is `{"type": "...", ...params}`. Older scripts use `goto`,
//! `click_text`, `press` and `type`; those names are accepted as aliases.
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_key() -> String {
    "Enter".to_string()
}

fn default_wait_ms() -> u64 {
    1000
}

fn default_scroll() -> i64 {
    800
}

fn default_screenshot_path() -> String {
    "screenshot.png".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    #[serde(alias = "goto")]
    Navigate {
        #[serde(default)]
        url: Option<String>,
    },
    Click {
        selector: String,
    },
    #[serde(alias = "click_text")]
    ClickByText {
        text: String,
    },
    Fill {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: String,
    },
    #[serde(alias = "type")]
    TypeText {
        #[serde(default)]
        text: String,
    },
    TypeCode {
        #[serde(default)]
        text: String,
        /// Milliseconds between keystrokes.
        #[serde(default)]
        delay: u64,
    },
    ClearEditor,
    SetCode {
        #[serde(default)]
        text: String,
    },
    #[serde(alias = "press")]
    PressKey {
        #[serde(default = "default_key")]
        key: String,
        #[serde(default)]
        selector: Option<String>,
    },
    Wait {
        /// Milliseconds.
        #[serde(default = "default_wait_ms")]
        duration: u64,
    },
    Hover {
        selector: String,
    },
    Scroll {
        #[serde(default = "default_scroll", rename = "deltaY", alias = "delta_y")]
        delta_y: i64,
    },
    Screenshot {
        #[serde(default = "default_screenshot_path")]
        path: String,
    },
    LearnSite,
    FocusEditor,
    WriteCode {
        #[serde(default)]
        text: String,
        #[serde(default)]
        delay: u64,
    },
    RunCode,
    GetOutput,
    ExtractTables,
}

impl ActionKind {
    /// Canonical wire name.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Navigate { .. } => "navigate",
            ActionKind::Click { .. } => "click",
            ActionKind::ClickByText { .. } => "click_by_text",
            ActionKind::Fill { .. } => "fill",
            ActionKind::TypeText { .. } => "type_text",
            ActionKind::TypeCode { .. } => "type_code",
            ActionKind::ClearEditor => "clear_editor",
            ActionKind::SetCode { .. } => "set_code",
            ActionKind::PressKey { .. } => "press_key",
            ActionKind::Wait { .. } => "wait",
            ActionKind::Hover { .. } => "hover",
            ActionKind::Scroll { .. } => "scroll",
            ActionKind::Screenshot { .. } => "screenshot",
            ActionKind::LearnSite => "learn_site",
            ActionKind::FocusEditor => "focus_editor",
            ActionKind::WriteCode { .. } => "write_code",
            ActionKind::RunCode => "run_code",
            ActionKind::GetOutput => "get_output",
            ActionKind::ExtractTables => "extract_tables",
        }
    }
}

/// One step of an action script. `value` is the only field the
/// interpreter writes: captured output, extracted tables, a learned profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl From<ActionKind> for Action {
    fn from(kind: ActionKind) -> Self {
        Action { kind, value: None }
    }
}

impl Action {
    pub fn navigate(url: impl Into<String>) -> Self {
        ActionKind::Navigate {
            url: Some(url.into()),
        }
        .into()
    }

    pub fn fill(selector: impl Into<String>, text: impl Into<String>) -> Self {
        ActionKind::Fill {
            selector: Some(selector.into()),
            text: text.into(),
        }
        .into()
    }

    pub fn press(key: impl Into<String>) -> Self {
        ActionKind::PressKey {
            key: key.into(),
            selector: None,
        }
        .into()
    }

    pub fn wait(duration_ms: u64) -> Self {
        ActionKind::Wait {
            duration: duration_ms,
        }
        .into()
    }
}

/// An element of a script that could not be understood.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub index: usize,
    pub reason: String,
}

/// Decode a JSON array element by element. Elements that are not valid
/// actions are returned separately instead of failing the whole script.
pub fn parse_script(value: &Value) -> Result<(Vec<Action>, Vec<Rejected>), String> {
    let items = value
        .as_array()
        .ok_or_else(|| "action script must be a JSON array".to_string())?;
    let mut actions = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<Action>(item.clone()) {
            Ok(action) => actions.push(action),
            Err(e) => rejected.push(Rejected {
                index,
                reason: e.to_string(),
            }),
        }
    }
    Ok((actions, rejected))
}
