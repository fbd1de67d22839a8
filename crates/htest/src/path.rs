//! Path addressing into structured documents.
//!
//! Paths use dotted field names with either dotted or bracketed indices:
//! `user.name`, `items.0.id`, `items[0].id`. A backslash escapes a literal
//! dot or bracket inside a field name (`meta.content\.type`).

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Object key. A key made only of digits also indexes arrays.
    Key(String),
    /// Bracketed array index.
    Index(usize),
}

/// Splits a path into segments.
///
/// Returns `None` for a syntactically broken path (unterminated or
/// non-numeric bracket); such a path resolves to nothing.
pub(crate) fn parse(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) => digits.push(d),
                        None => return None,
                    }
                }
                segments.push(Segment::Index(digits.trim().parse().ok()?));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }
    Some(segments)
}

/// Renders segments as an RFC 6901 JSON pointer.
pub(crate) fn to_pointer(segments: &[Segment]) -> String {
    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        match segment {
            Segment::Key(key) => pointer.push_str(&key.replace('~', "~0").replace('/', "~1")),
            Segment::Index(i) => pointer.push_str(&i.to_string()),
        }
    }
    pointer
}

/// Resolves a path against a JSON value.
///
/// An empty path resolves to the document itself. `null` values resolve
/// (they exist); a missing key or out-of-range index does not.
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    root.pointer(&to_pointer(&segments))
}
