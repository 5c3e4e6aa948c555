//! Duplicate detection against the importing user's contacts.

use meerkat_db::db::store::ContactStore;
use meerkat_db::model::contact::Contact;

use super::types::{DuplicateMatch, MatchReason, ParsedContact};
use crate::error::ServiceResult;

/// ## Summary
/// Finds an existing live contact the row duplicates: first by
/// case-insensitive email, then by case-insensitive given plus family name.
///
/// ## Errors
/// Returns an error if the store cannot be read.
pub async fn find_duplicate(
    store: &dyn ContactStore,
    owner_id: i64,
    row: &ParsedContact,
) -> ServiceResult<Option<DuplicateMatch>> {
    if let Some(email) = present(row.email.as_deref())
        && let Some(contact) = store.find_by_email(owner_id, email).await?
    {
        return Ok(Some(to_match(&contact, MatchReason::Email)));
    }

    if let (Some(given), Some(family)) = (
        present(row.firstname.as_deref()),
        present(row.lastname.as_deref()),
    )
        && let Some(contact) = store.find_by_name(owner_id, given, family).await?
    {
        return Ok(Some(to_match(&contact, MatchReason::Name)));
    }

    Ok(None)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn to_match(contact: &Contact, match_reason: MatchReason) -> DuplicateMatch {
    DuplicateMatch {
        contact_id: contact.id,
        given_name: contact.given_name.clone(),
        family_name: contact.family_name.clone(),
        email: contact.email.clone(),
        match_reason,
    }
}
