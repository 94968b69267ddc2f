//! Action scripts and the page-side machinery they drive: the editor
//! adapter, site profiles, consent/CAPTCHA gates and table extraction.
pub mod action;
pub mod editor;
pub mod errors;
pub mod gate;
pub mod inspect;
pub mod interpreter;
pub mod profile;
pub mod tables;

pub use action::{parse_script, Action, ActionKind, Rejected};
pub use editor::EditorKind;
pub use errors::{ActionError, ActionResult};
pub use interpreter::{
    run_script, ExecutionReport, Interpreter, ScriptStatus, CAPTCHA_MESSAGE, COMPLETED_MESSAGE,
};
pub use profile::{ProfileCache, SiteProfile};
