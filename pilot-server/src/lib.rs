//! HTTP front end for webpilot.
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /setup-browser {url}` | open the browser session on `url` |
//! | `POST /cleanup` | close it |
//! | `POST /query {query, agent_type}` | run a streaming agent, SSE response |
//! | `GET /browser-events` | SSE feed of browser activity |
//!
//! Every SSE payload is `{"type": ..., "content": ...}`; query streams end
//! with `complete` followed by `end`.
pub mod agents;
pub mod events;
pub mod server;

pub use agents::{run_agent, AgentContext, EventStream};
pub use events::{EventBus, EventKind, StreamEvent};
pub use server::{router, serve, AppState};
