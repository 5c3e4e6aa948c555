//! vCard text escaping.

/// Escapes a text value: backslash, newline, comma and semicolon.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            ',' => result.push_str("\\,"),
            ';' => result.push_str("\\;"),
            '\r' => {}
            _ => result.push(c),
        }
    }

    result
}

/// Escapes one component of a structured or list value.
///
/// Identical to [`escape_text`]; kept separate so call sites document
/// which grammar they are producing.
#[must_use]
pub fn escape_component(s: &str) -> String {
    escape_text(s)
}

/// Escapes a parameter value with RFC 6868 caret encoding.
///
/// Returns `(value, needs_quotes)`.
#[must_use]
pub fn escape_param_value(s: &str) -> (String, bool) {
    let mut result = String::with_capacity(s.len());
    let mut needs_quotes = false;

    for c in s.chars() {
        match c {
            '^' => result.push_str("^^"),
            '\n' => result.push_str("^n"),
            '"' => result.push_str("^'"),
            ':' | ';' | ',' => {
                result.push(c);
                needs_quotes = true;
            }
            _ if c.is_control() => {}
            _ => result.push(c),
        }
    }

    (result, needs_quotes)
}
