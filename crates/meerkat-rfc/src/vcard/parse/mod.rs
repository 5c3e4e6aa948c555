//! vCard document parsing.

mod error;
pub mod lexer;
pub mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};

use crate::vcard::core::{VCard, VCardProperty, VCardVersion, names};
use lexer::{parse_content_line, unfold};

/// Logical lines of one `BEGIN:VCARD` .. `END:VCARD` block.
struct CardBlock<'a> {
    begin_line: usize,
    lines: Vec<(usize, &'a str)>,
    closed: bool,
}

/// Parses a document containing one or more vCards.
///
/// ## Errors
/// Returns the first error encountered, or `Empty` when there is no card.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<Vec<VCard>> {
    let cards = parse_each(input).into_iter().collect::<ParseResult<Vec<_>>>()?;
    if cards.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, 1, "no BEGIN:VCARD"));
    }
    Ok(cards)
}

/// Parses a document that must contain exactly one vCard.
///
/// ## Errors
/// Returns an error if the card is malformed or the document holds zero or
/// several cards.
pub fn parse_single(input: &str) -> ParseResult<VCard> {
    let mut cards = parse(input)?;
    if cards.len() != 1 {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedToken,
            1,
            format!("expected one vCard, found {}", cards.len()),
        ));
    }
    cards.pop().ok_or_else(|| ParseError::new(ParseErrorKind::Empty, 1, "no vCard"))
}

/// Parses every card independently.
///
/// A malformed card yields an `Err` in its slot and parsing resumes at the
/// next `BEGIN:VCARD`, so one bad card never hides the rest of the file.
#[must_use]
pub fn parse_each(input: &str) -> Vec<ParseResult<VCard>> {
    let unfolded = unfold(input);
    split_blocks(&unfolded)
        .into_iter()
        .map(|block| parse_block(&block))
        .collect()
}

fn split_blocks(unfolded: &str) -> Vec<CardBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<CardBlock<'_>> = None;

    for (idx, line) in unfolded.split('\n').enumerate() {
        let line_num = idx + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if is_marker(line, names::BEGIN) {
            if let Some(open) = current.take() {
                blocks.push(open);
            }
            current = Some(CardBlock {
                begin_line: line_num,
                lines: Vec::new(),
                closed: false,
            });
        } else if is_marker(line, names::END) {
            if let Some(mut open) = current.take() {
                open.closed = true;
                blocks.push(open);
            }
        } else if let Some(open) = current.as_mut() {
            open.lines.push((line_num, line));
        }
    }

    if let Some(open) = current {
        blocks.push(open);
    }

    blocks
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.split_once(':').is_some_and(|(name, value)| {
        name.trim().eq_ignore_ascii_case(marker) && value.trim().eq_ignore_ascii_case("VCARD")
    })
}

fn parse_block(block: &CardBlock<'_>) -> ParseResult<VCard> {
    if !block.closed {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedEof,
            block.begin_line,
            "BEGIN:VCARD without END:VCARD",
        ));
    }

    let mut version = None;
    let mut properties = Vec::with_capacity(block.lines.len());

    for &(line_num, line) in &block.lines {
        let content = parse_content_line(line, line_num)?;

        if content.name == names::VERSION {
            version = Some(VCardVersion::parse(&content.value).ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::UnsupportedVersion,
                    line_num,
                    format!("unsupported version: {}", content.value),
                )
            })?);
            continue;
        }

        properties.push(VCardProperty {
            group: content.group,
            name: content.name,
            params: content.params,
            raw_value: content.value,
        });
    }

    let version = version.ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::MissingProperty,
            block.begin_line,
            "missing required property: VERSION",
        )
    })?;

    Ok(VCard {
        version,
        properties,
    })
}
