//! Key names as written in action scripts (`"Enter"`, `"Control+A"`) mapped
//! to WebDriver key code points.
use fantoccini::key::Key;

/// A key or modifier chord, already resolved to WebDriver code points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub keys: Vec<char>,
}

impl KeyChord {
    /// Parse `"Enter"`, `"a"`, `"Control+Shift+Tab"`. A literal `+` key is
    /// written as `"+"` or as the last segment of `"Shift++"`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if name == "+" {
            return Some(Self { keys: vec!['+'] });
        }

        let mut keys = Vec::new();
        let (head, trailing_plus) = match name.strip_suffix("++") {
            Some(rest) => (rest, true),
            None => (name, false),
        };
        for part in head.split('+') {
            keys.push(resolve(part.trim())?);
        }
        if trailing_plus {
            keys.push('+');
        }
        Some(Self { keys })
    }

    pub fn is_single(&self) -> bool {
        self.keys.len() == 1
    }

    /// The chord as an element `send_keys` payload. Modifier code points
    /// stay pressed until the trailing null key releases them.
    pub fn as_send_keys(&self) -> String {
        let mut s: String = self.keys.iter().collect();
        if !self.is_single() {
            s.push(char::from(Key::Null));
        }
        s
    }
}

fn resolve(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    let key = match name.to_ascii_lowercase().as_str() {
        "enter" => Key::Enter,
        "return" => Key::Return,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "space" => Key::Space,
        "arrowup" | "up" => Key::Up,
        "arrowdown" | "down" => Key::Down,
        "arrowleft" | "left" => Key::Left,
        "arrowright" | "right" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "control" | "ctrl" => Key::Control,
        "shift" => Key::Shift,
        "alt" | "option" => Key::Alt,
        "meta" | "command" | "cmd" => Key::Meta,
        "f5" => Key::F5,
        _ => return None,
    };
    Some(char::from(key))
}
