//! Canonical forms for the loosely formatted fields that arrive through
//! vCard bodies and CSV cells.
//!
//! Every normalizer here is idempotent: feeding its own output back in
//! returns the same value.

use chrono::NaiveDate;
use meerkat_db::db::enums::Gender;

/// Leap year used to validate month/day pairs without a year.
const YEARLESS_REFERENCE: i32 = 2000;

/// ## Summary
/// Normalizes a birthday to `YYYY-MM-DD` or, when the year is unknown,
/// `--MM-DD`.
///
/// Accepts `YYYY-MM-DD`, `--MM-DD`, `YYYYMMDD`, `--MMDD`, `DD.MM.YYYY` and
/// `DD.MM.`; a trailing `T` time part is ignored. Returns `None` for
/// anything else, including impossible dates.
#[must_use]
pub fn normalize_birthday(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let date = trimmed.split('T').next().unwrap_or_default();
    if date.is_empty() || !date.is_ascii() {
        return None;
    }

    if let Some(rest) = date.strip_prefix("--") {
        let (month, day) = match rest.len() {
            5 if rest.as_bytes()[2] == b'-' => (&rest[..2], &rest[3..]),
            4 => (&rest[..2], &rest[2..]),
            _ => return None,
        };
        return yearless(month, day);
    }

    if let Some((day, rest)) = date.split_once('.') {
        let (month, year) = rest.split_once('.')?;
        if year.is_empty() {
            return yearless(&pad2(month)?, &pad2(day)?);
        }
        return dated(year, &pad2(month)?, &pad2(day)?);
    }

    match date.len() {
        10 if date.as_bytes()[4] == b'-' && date.as_bytes()[7] == b'-' => {
            dated(&date[..4], &date[5..7], &date[8..])
        }
        8 => dated(&date[..4], &date[4..6], &date[6..]),
        _ => None,
    }
}

fn pad2(part: &str) -> Option<String> {
    match part.len() {
        1 => Some(format!("0{part}")),
        2 => Some(part.to_string()),
        _ => None,
    }
}

fn digits(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn yearless(month: &str, day: &str) -> Option<String> {
    let (m, d) = (digits(month)?, digits(day)?);
    NaiveDate::from_ymd_opt(YEARLESS_REFERENCE, m, d)?;
    Some(format!("--{m:02}-{d:02}"))
}

fn dated(year: &str, month: &str, day: &str) -> Option<String> {
    if year.len() != 4 {
        return None;
    }
    let y = i32::try_from(digits(year)?).ok()?;
    let date = NaiveDate::from_ymd_opt(y, digits(month)?, digits(day)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// ## Summary
/// Converts a stored birthday to its vCard 4.0 `BDAY` form.
///
/// `--MM-DD` becomes `--MMDD`; dated birthdays pass through.
#[must_use]
pub fn birthday_to_vcard(birthday: &str) -> String {
    match birthday.strip_prefix("--") {
        Some(rest) => format!("--{}", rest.replace('-', "")),
        None => birthday.to_string(),
    }
}

/// ## Summary
/// Normalizes a free-form gender value.
///
/// Matching is case-insensitive over English and German words, the vCard
/// sex codes and the stored representation.
#[must_use]
pub fn normalize_gender(input: &str) -> Option<Gender> {
    let value = input.trim().to_lowercase();
    if let Some(gender) = Gender::from_db(&value) {
        return Some(gender);
    }
    match value.as_str() {
        "m" | "man" | "männlich" | "maennlich" | "mann" => Some(Gender::Male),
        "f" | "w" | "woman" | "weiblich" | "frau" => Some(Gender::Female),
        "o" | "d" | "x" | "divers" | "diverse" | "andere" | "anderes" | "non-binary"
        | "nonbinary" => Some(Gender::Other),
        "n" | "u" | "unknown" | "none" | "prefer not to say" | "keine angabe" | "unbekannt" => {
            Some(Gender::PreferNotToSay)
        }
        _ => None,
    }
}

/// ## Summary
/// The vCard `GENDER` sex code for a stored gender.
#[must_use]
pub const fn gender_to_vcard(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "M",
        Gender::Female => "F",
        Gender::Other => "O",
        Gender::PreferNotToSay => "N",
    }
}

/// ## Summary
/// Parses the sex component of a vCard `GENDER` value (`M`, `F`, `O`, `N`,
/// `U`). The optional identity text after `;` is ignored.
#[must_use]
pub fn gender_from_vcard(value: &str) -> Option<Gender> {
    let sex = value.split(';').next().unwrap_or_default().trim();
    match sex.to_ascii_uppercase().as_str() {
        "M" => Some(Gender::Male),
        "F" => Some(Gender::Female),
        "O" => Some(Gender::Other),
        "N" | "U" => Some(Gender::PreferNotToSay),
        _ => None,
    }
}

/// Number of ASCII digits in a phone number once formatting is ignored.
#[must_use]
pub fn phone_digit_count(phone: &str) -> usize {
    phone.chars().filter(char::is_ascii_digit).count()
}

/// Trims and drops empty strings.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
