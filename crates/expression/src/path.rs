use std::borrow::Cow;

use serde_json::Value as Json;

/// Resolves a dotted path (`user.profile.name`, `tasks.0.title`) by successive
/// property lookup. Array elements are addressed by numeric segments and
/// `length` reads the size of an array or string. `None` means undefined: a
/// missing key, or a step through a value that has no properties.
pub fn lookup_path<'a>(context: &'a Json, path: &str) -> Option<Cow<'a, Json>> {
    let mut current = context;
    let mut segments = path.split('.').map(str::trim).peekable();
    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Json::Object(map) => map.get(segment)?,
            Json::Array(items) => {
                if segment == "length" && segments.peek().is_none() {
                    return Some(Cow::Owned(Json::from(items.len())));
                }
                items.get(segment.parse::<usize>().ok()?)?
            }
            Json::String(s) if segment == "length" && segments.peek().is_none() => {
                return Some(Cow::Owned(Json::from(s.chars().count())));
            }
            _ => return None,
        };
    }
    Some(Cow::Borrowed(current))
}
