//! Escape handling for vCard text values (RFC 6350 §3.4).

/// Unescapes a vCard text value.
///
/// Handles `\n`, `\N`, `\,`, `\;` and `\\`; any other backslash is kept.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('n' | 'N') => {
                chars.next();
                result.push('\n');
            }
            Some(&escaped @ (',' | ';' | '\\')) => {
                chars.next();
                result.push(escaped);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Splits a structured value on unescaped semicolons. Parts stay escaped.
#[must_use]
pub fn split_structured(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ';' => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&s[start..]);
    parts
}

/// Splits a list value on unescaped commas and unescapes each item.
#[must_use]
pub fn split_component(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' => {
                parts.push(unescape_text(&s[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(unescape_text(&s[start..]));
    parts
}
