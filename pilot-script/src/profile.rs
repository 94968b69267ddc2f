//! Per-origin hints about where a site keeps its editor, Run control and
//! output panel.
use std::collections::HashMap;

use pilot_drivers::{Locator, Page};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::editor::EditorKind;

pub const DEFAULT_RUN_TEXTS: [&str; 8] = [
    "Run", "Run Code", "Execute", "Compile", "▶", "Play", "Submit", "Start",
];

/// Order in which labels are tried while learning; longer labels first so
/// "Run Code" wins over a bare "Run".
const LEARN_RUN_TEXTS: [&str; 8] = [
    "Run Code", "Run", "Execute", "Compile", "▶", "Play", "Submit", "Start",
];

pub const DEFAULT_RUN_SELECTORS: [&str; 4] =
    ["button.run", "#run", ".run-btn", "[aria-label='Run']"];

pub const DEFAULT_OUTPUT_SELECTORS: [&str; 11] = [
    ".output",
    "#output",
    "pre.output",
    "pre",
    ".terminal",
    ".console",
    "#console",
    ".result",
    "#result",
    "textarea[readonly]",
    ".output-window",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub origin: String,
    pub editor_kind: EditorKind,
    pub run_selector: Option<String>,
    /// Always ends with every default label not already listed.
    pub run_texts: Vec<String>,
    /// Selectors seen on the page first, then the remaining defaults.
    pub output_selectors: Vec<String>,
}

impl SiteProfile {
    /// Profile with no learned hints.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            editor_kind: EditorKind::Unknown,
            run_selector: None,
            run_texts: DEFAULT_RUN_TEXTS.iter().map(|s| s.to_string()).collect(),
            output_selectors: DEFAULT_OUTPUT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Inspect the loaded page.
    pub async fn infer(page: &dyn Page) -> Self {
        let url = page.current_url().await.unwrap_or_default();
        let mut profile = SiteProfile::new(origin_of(&url));
        profile.editor_kind = crate::editor::detect_kind(page).await;

        let mut found_text = None;
        for text in LEARN_RUN_TEXTS {
            if visible(page, &Locator::text(text)).await {
                found_text = Some(text);
                break;
            }
        }
        match found_text {
            Some(text) => {
                profile.run_texts.retain(|t| t != text);
                profile.run_texts.insert(0, text.to_string());
            }
            None => {
                for selector in DEFAULT_RUN_SELECTORS {
                    if visible(page, &Locator::css(selector)).await {
                        profile.run_selector = Some(selector.to_string());
                        break;
                    }
                }
            }
        }

        let mut present = Vec::new();
        for selector in DEFAULT_OUTPUT_SELECTORS {
            if page
                .count(&Locator::css(selector))
                .await
                .map(|n| n > 0)
                .unwrap_or(false)
            {
                present.push(selector.to_string());
            }
        }
        if !present.is_empty() {
            let rest = profile
                .output_selectors
                .iter()
                .filter(|s| !present.contains(s))
                .cloned()
                .collect::<Vec<_>>();
            present.extend(rest);
            profile.output_selectors = present;
        }

        info!(
            target: "pilot.profile",
            origin = %profile.origin,
            editor = profile.editor_kind.as_str(),
            run_text = found_text.unwrap_or(""),
            run_selector = profile.run_selector.as_deref().unwrap_or(""),
            "profile.learned"
        );
        profile
    }
}

async fn visible(page: &dyn Page, locator: &Locator) -> bool {
    page.visible_count(locator)
        .await
        .map(|n| n > 0)
        .unwrap_or(false)
}

/// `scheme://host[:port]` of a URL; unparsable input is used as-is.
pub fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

/// Learned profiles keyed by origin. Re-learning an origin replaces its entry.
#[derive(Debug, Default, Clone)]
pub struct ProfileCache {
    profiles: HashMap<String, SiteProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, origin: &str) -> Option<&SiteProfile> {
        self.profiles.get(origin)
    }

    pub fn for_url(&self, url: &str) -> Option<&SiteProfile> {
        self.get(&origin_of(url))
    }

    pub fn insert(&mut self, profile: SiteProfile) {
        self.profiles.insert(profile.origin.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_path_and_query() {
        assert_eq!(
            origin_of("https://www.programiz.com/python/online-compiler/?x=1"),
            "https://www.programiz.com"
        );
        assert_eq!(origin_of("http://localhost:8080/a"), "http://localhost:8080");
        assert_eq!(origin_of("not a url"), "not a url");
    }

    #[test]
    fn cache_keeps_last_profile_per_origin() {
        let mut cache = ProfileCache::new();
        let mut first = SiteProfile::new("https://a.example");
        first.run_selector = Some("#run".into());
        cache.insert(first);
        cache.insert(SiteProfile::new("https://a.example"));
        assert_eq!(cache.len(), 1);
        assert!(cache
            .for_url("https://a.example/page")
            .unwrap()
            .run_selector
            .is_none());
    }

    #[test]
    fn fresh_profile_carries_all_defaults() {
        let profile = SiteProfile::new("https://a.example");
        assert_eq!(profile.run_texts.len(), DEFAULT_RUN_TEXTS.len());
        assert_eq!(profile.output_selectors[0], ".output");
    }
}
