use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value as Json;

use crate::path::lookup_path;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid placeholder regex"));

/// Substitutes every `{{path}}` in `template` with the value found in
/// `context`. Unresolvable placeholders stay in the output verbatim so an
/// unbound path is visible to whoever authored it.
pub fn resolve_binding(template: &str, context: &Json) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let path = caps[1].trim();
            if path.is_empty() {
                return caps[0].to_string();
            }
            match lookup_path(context, path) {
                Some(value) => display_value(&value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub fn contains_binding(s: &str) -> bool {
    PLACEHOLDER.is_match(s)
}

/// Text of `s` with placeholders blanked out, as seen by the character
/// allow-list.
pub(crate) fn strip_placeholders(s: &str) -> String {
    PLACEHOLDER.replace_all(s, " ").into_owned()
}

/// String form used when a value is spliced into text.
pub fn display_value(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{f}"),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}
