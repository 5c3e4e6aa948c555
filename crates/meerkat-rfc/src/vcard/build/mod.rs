//! vCard serialization.

pub mod escape;

use crate::vcard::core::{VCard, VCardProperty};
use escape::escape_param_value;

/// Maximum line length in octets per RFC 6350 §3.2.
const MAX_LINE_OCTETS: usize = 75;

/// Serializes one or more vCards.
#[must_use]
pub fn serialize(cards: &[VCard]) -> String {
    let mut output = String::new();
    for card in cards {
        serialize_vcard(card, &mut output);
    }
    output
}

/// Serializes a single vCard.
///
/// Properties are written in the order they are held, so a card that was
/// parsed and re-serialized keeps the client's ordering.
#[must_use]
pub fn serialize_single(card: &VCard) -> String {
    let mut output = String::new();
    serialize_vcard(card, &mut output);
    output
}

fn serialize_vcard(card: &VCard, output: &mut String) {
    output.push_str("BEGIN:VCARD\r\n");
    output.push_str("VERSION:");
    output.push_str(card.version.as_str());
    output.push_str("\r\n");

    for prop in &card.properties {
        output.push_str(&fold_line(&content_line(prop)));
        output.push_str("\r\n");
    }

    output.push_str("END:VCARD\r\n");
}

fn content_line(prop: &VCardProperty) -> String {
    let mut line = String::with_capacity(prop.name.len() + prop.raw_value.len() + 16);

    if let Some(group) = &prop.group {
        line.push_str(group);
        line.push('.');
    }
    line.push_str(&prop.name);

    for param in &prop.params {
        line.push(';');
        line.push_str(&param.name);
        line.push('=');
        for (i, value) in param.values.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let (escaped, needs_quotes) = escape_param_value(value);
            if needs_quotes {
                line.push('"');
                line.push_str(&escaped);
                line.push('"');
            } else {
                line.push_str(&escaped);
            }
        }
    }

    line.push(':');
    line.push_str(&prop.raw_value);
    line
}

/// Folds a line at 75 octets, never splitting a UTF-8 sequence.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut result = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut current_len = 0;

    for c in line.chars() {
        let char_len = c.len_utf8();
        if current_len + char_len > MAX_LINE_OCTETS {
            result.push_str("\r\n ");
            current_len = 1;
        }
        result.push(c);
        current_len += char_len;
    }

    result
}
