//! Keyword rules that always produce a script, with no model involved.
use pilot_config::SearchSettings;
use pilot_script::Action;

pub const SEARCH_WAIT_MS: u64 = 3000;
pub const NAVIGATE_WAIT_MS: u64 = 1500;

const GO_TO_PHRASES: [&str; 2] = ["open website", "go to"];

/// Text after the first case-insensitive occurrence of `needle`.
pub(crate) fn after_ci<'a>(haystack: &'a str, needle: &str) -> Option<&'a str> {
    // ASCII lowering keeps byte offsets aligned with the original.
    let lower = haystack.to_ascii_lowercase();
    lower
        .find(needle)
        .map(|idx| haystack[idx + needle.len()..].trim())
}

/// The search query in a "search [for] ..." command, if it is one.
pub fn search_query(command: &str) -> Option<String> {
    let rest = after_ci(command, "search")?;
    let query = match rest.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("for ") => rest[4..].trim(),
        _ => rest,
    };
    Some(query.to_string())
}

pub fn search_script(query: &str, search: &SearchSettings, wait_ms: u64) -> Vec<Action> {
    vec![
        Action::navigate(search.home_url.clone()),
        Action::fill(search.query_selector.clone(), query),
        Action::press("Enter"),
        Action::wait(wait_ms),
    ]
}

fn with_scheme(target: &str) -> String {
    if target.starts_with("http") {
        target.to_string()
    } else {
        format!("https://{target}")
    }
}

/// Search intent, then an explicit "go to"/"open website" target, then the
/// landing page.
pub fn heuristic_plan(command: &str, search: &SearchSettings) -> Vec<Action> {
    if let Some(query) = search_query(command) {
        let query = if query.is_empty() { command.trim() } else { &query };
        return search_script(query, search, SEARCH_WAIT_MS);
    }
    let mut url = search.landing_url.clone();
    for phrase in GO_TO_PHRASES {
        if let Some(rest) = after_ci(command, phrase) {
            if let Some(target) = rest.split_whitespace().next() {
                url = with_scheme(target);
            }
            break;
        }
    }
    vec![Action::navigate(url), Action::wait(NAVIGATE_WAIT_MS)]
}
