//! Common types and utilities shared across Pilot crates.
//!
//! This crate defines the shared error type, a handful of behavioral enums
//! and the observability helpers used throughout the Pilot workspace. It is
//! intentionally lightweight so that every crate can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`PilotError`] and [`Result`]: Shared error handling
//! - Enums describing behavior such as [`StealthLevel`] and [`AgentKind`]
//!
//! # Examples
//!
//! ```rust
//! use pilot_common::{AgentKind, StealthLevel};
//!
//! assert_eq!(AgentKind::parse("deep_research"), Some(AgentKind::DeepResearch));
//! assert_eq!(StealthLevel::default(), StealthLevel::Balanced);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

/// Which streaming agent answers a `/query` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Search, open the first hit and report what is on the page.
    #[default]
    Task,
    /// Summarise the top results of a search.
    Research,
    /// Scroll through more results and compile a longer synthesis.
    DeepResearch,
}

impl AgentKind {
    /// Lenient parse used by the HTTP surface and the CLI.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "task" => Some(Self::Task),
            "research" => Some(Self::Research),
            "deep_research" | "deepresearch" => Some(Self::DeepResearch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Research => "research",
            Self::DeepResearch => "deep_research",
        }
    }
}

/// Error types used across the Pilot system.
#[derive(thiserror::Error, Debug)]
pub enum PilotError {
    /// An agent (planner tier, model client, streaming agent) failed.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The browser session could not be opened or has already shut down.
    #[error("Session error: {0}")]
    Session(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`PilotError`].
pub type Result<T> = std::result::Result<T, PilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_parse_is_lenient() {
        assert_eq!(AgentKind::parse(" Task "), Some(AgentKind::Task));
        assert_eq!(AgentKind::parse("deep-research"), Some(AgentKind::DeepResearch));
        assert_eq!(AgentKind::parse("chat"), None);
    }

    #[test]
    fn agent_kind_serde_uses_wire_names() {
        let kind: AgentKind = serde_json::from_str("\"deep_research\"").unwrap();
        assert_eq!(kind, AgentKind::DeepResearch);
        assert_eq!(serde_json::to_string(&AgentKind::Research).unwrap(), "\"research\"");
    }

    #[test]
    fn driver_errors_convert_from_anyhow() {
        let err: PilotError = anyhow::anyhow!("chromedriver refused").into();
        assert!(err.to_string().contains("chromedriver refused"));
    }
}
