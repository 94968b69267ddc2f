use thiserror::Error;

/// Why a single action did not take effect. The display strings are
/// user-facing; they end up in the task's error list verbatim.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Couldn't type into the editor.")]
    TypeFailed,
    #[error("Couldn't find an editor to clear on this page.")]
    ClearFailed,
    #[error("Couldn't find an editor to set code on this page.")]
    SetCodeFailed,
    #[error("Couldn't find an editor on this page.")]
    EditorNotFound,
    #[error("Couldn't type or set code into the editor.")]
    WriteFailed,
    #[error("Couldn't find a Run control on this page.")]
    RunControlNotFound,
    #[error("Couldn't find an output panel on this page.")]
    OutputNotFound,
    #[error("Couldn't find {0} on this page.")]
    ElementNotFound(String),
    #[error("Timed out after {timeout_ms}ms waiting for {target}.")]
    Timeout { target: String, timeout_ms: u64 },
    #[error("Error during browser automation: {0}")]
    Engine(#[from] anyhow::Error),
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;
