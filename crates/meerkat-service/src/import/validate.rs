//! Per-row validation for imported contacts.

use std::ops::RangeInclusive;

use regex::Regex;

use super::types::ParsedContact;
use crate::error::{ServiceError, ServiceResult};
use crate::normalize::{normalize_birthday, normalize_gender, phone_digit_count};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";
const PHONE_DIGITS: RangeInclusive<usize> = 5..=20;

#[derive(Debug, Clone)]
pub struct RowValidator {
    email: Regex,
}

impl RowValidator {
    /// ## Errors
    /// Returns [`ServiceError::Internal`] if the email pattern fails to
    /// compile.
    pub fn new() -> ServiceResult<Self> {
        let email = Regex::new(EMAIL_PATTERN)
            .map_err(|e| ServiceError::Internal(format!("email pattern: {e}")))?;
        Ok(Self { email })
    }

    /// ## Summary
    /// Lists everything wrong with a row. An empty list means the row may be
    /// imported.
    #[must_use]
    pub fn validate(&self, row: &ParsedContact) -> Vec<String> {
        let mut errors = Vec::new();

        if row.firstname.as_deref().is_none_or(|v| v.trim().is_empty()) {
            errors.push("First name is required".to_string());
        }
        if let Some(email) = &row.email
            && !self.email.is_match(email.trim())
        {
            errors.push(format!("Invalid email address: {email}"));
        }
        if let Some(birthday) = &row.birthday
            && normalize_birthday(birthday).is_none()
        {
            errors.push(format!("Invalid birthday: {birthday}"));
        }
        if let Some(gender) = &row.gender
            && normalize_gender(gender).is_none()
        {
            errors.push(format!("Invalid gender: {gender}"));
        }
        if let Some(phone) = &row.phone
            && !PHONE_DIGITS.contains(&phone_digit_count(phone))
        {
            errors.push(format!("Invalid phone number: {phone}"));
        }

        errors
    }
}
