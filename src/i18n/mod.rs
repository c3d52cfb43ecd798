//! Response text catalog.
//!
//! Strings live in an embedded JSON file so no file I/O happens at runtime.
//! Keys are dotted paths, e.g. `modes.fight_started`.

use std::sync::LazyLock;

use serde_json::Value;
use tracing::warn;

static CATALOG: LazyLock<Value> =
    LazyLock::new(|| match serde_json::from_str(include_str!("en.json")) {
        Ok(value) => value,
        Err(e) => {
            warn!("Text catalog failed to parse: {}", e);
            Value::Null
        }
    });

/// Parse the embedded catalog. Safe to call more than once.
pub fn init() {
    LazyLock::force(&CATALOG);
}

fn catalog() -> &'static Value {
    &CATALOG
}

/// Text for a key. Unknown keys come back as the key itself.
pub fn get_text(key: &str) -> String {
    resolve_key(catalog(), key).unwrap_or_else(|| key.to_string())
}

/// Text for a key with `{name}` placeholders replaced.
pub fn get_text_with(key: &str, vars: &[(&str, &str)]) -> String {
    fill(&get_text(key), vars)
}

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_parses_and_resolves() {
        init();
        assert!(catalog().is_object());
        assert_ne!(get_text("common.no_permission"), "common.no_permission");
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        assert_eq!(get_text("nope.missing"), "nope.missing");
    }

    #[test]
    fn test_fill_placeholders() {
        assert_eq!(
            fill("{name} joined {chat}", &[("name", "Ann"), ("chat", "Room")]),
            "Ann joined Room"
        );
    }
}
