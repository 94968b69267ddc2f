//! Pull an action script out of a model reply.
use pilot_script::{parse_script, Action};
use serde_json::Value;
use tracing::debug;

/// First balanced `[...]` in `text`, skipping brackets inside JSON strings.
pub fn balanced_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// JSON-mode replies are often an object wrapping the array,
/// e.g. `{"actions": [...]}`; take the first array-valued field.
fn unwrap_object(value: Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(map) => map.into_iter().map(|(_, v)| v).find(Value::is_array),
        _ => None,
    }
}

/// Parse a reply into actions. Elements that are not valid actions are
/// dropped; a reply with no valid action at all yields `None`.
pub fn script_from_reply(reply: &str) -> Option<Vec<Action>> {
    let trimmed = reply.trim();
    let value = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(unwrap_object)
        .or_else(|| {
            balanced_array(trimmed).and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        })?;
    let (actions, rejected) = parse_script(&value).ok()?;
    if !rejected.is_empty() {
        debug!(target: "pilot.planner", dropped = rejected.len(), "plan.elements_dropped");
    }
    (!actions.is_empty()).then_some(actions)
}
