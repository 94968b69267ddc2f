//! Actor runtime and the browser-session actor built on it.
pub mod actor;
pub mod session;
pub mod system;

pub use session::{BrowserSession, ScriptOutcome, SessionHandle, SessionMsg};
pub use system::ActorSystem;
