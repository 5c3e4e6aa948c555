//! Merging an imported row into an existing contact.

use meerkat_db::db::enums::Gender;
use meerkat_db::model::contact::{Contact, dedup_circles};

use super::mapping::TargetField;
use super::types::ImportKind;

const EMPTY: &str = "(empty)";

/// ## Summary
/// Copies every non-empty field of `incoming` onto `existing` and returns
/// one `- Label: old → new` line per field that changed. Circles are merged
/// as a union.
pub fn merge_into(existing: &mut Contact, incoming: &Contact) -> Vec<String> {
    let mut changes = Vec::new();

    for ((field, current), (_, new)) in scalar_slots(existing)
        .into_iter()
        .zip(scalar_values(incoming))
    {
        let Some(new) = new.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        if current.as_deref() != Some(new) {
            changes.push(change_line(field, current.as_deref(), new));
            *current = Some(new.to_string());
        }
    }

    if let Some(gender) = incoming.gender
        && existing.gender != Some(gender)
    {
        changes.push(change_line(
            TargetField::Gender,
            existing.gender.map(Gender::as_str),
            gender.as_str(),
        ));
        existing.gender = Some(gender);
    }

    if !incoming.circles.is_empty() {
        let merged =
            dedup_circles(&[existing.circles.as_slice(), incoming.circles.as_slice()].concat());
        let before = existing.circles.join(", ");
        let after = merged.join(", ");
        if before != after {
            let old = (!before.is_empty()).then_some(before.as_str());
            changes.push(change_line(TargetField::Circles, old, &after));
            existing.circles = merged;
        }
    }

    changes
}

fn scalar_slots(c: &mut Contact) -> [(TargetField, &mut Option<String>); 8] {
    [
        (TargetField::FirstName, &mut c.given_name),
        (TargetField::LastName, &mut c.family_name),
        (TargetField::Nickname, &mut c.nickname),
        (TargetField::Email, &mut c.email),
        (TargetField::Phone, &mut c.phone),
        (TargetField::Birthday, &mut c.birthday),
        (TargetField::Address, &mut c.address),
        (TargetField::Organization, &mut c.organization),
    ]
}

fn scalar_values(c: &Contact) -> [(TargetField, Option<&str>); 8] {
    [
        (TargetField::FirstName, c.given_name.as_deref()),
        (TargetField::LastName, c.family_name.as_deref()),
        (TargetField::Nickname, c.nickname.as_deref()),
        (TargetField::Email, c.email.as_deref()),
        (TargetField::Phone, c.phone.as_deref()),
        (TargetField::Birthday, c.birthday.as_deref()),
        (TargetField::Address, c.address.as_deref()),
        (TargetField::Organization, c.organization.as_deref()),
    ]
}

fn change_line(field: TargetField, old: Option<&str>, new: &str) -> String {
    format!("- {}: {} → {new}", field.label(), old.unwrap_or(EMPTY))
}

/// ## Summary
/// The note recording an import update, or `None` when nothing changed.
#[must_use]
pub fn merge_note(kind: ImportKind, changes: &[String]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    Some(format!(
        "Updated via {} import:\n{}",
        kind.label(),
        changes.join("\n")
    ))
}
