//! CSV column mapping: header inference and row extraction.

use meerkat_db::model::contact::{Contact, dedup_circles};

use super::types::{ColumnMapping, ParsedContact};
use crate::error::{ServiceError, ServiceResult};
use crate::normalize::{non_empty, normalize_birthday, normalize_gender};

/// A contact field a CSV column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    FirstName,
    LastName,
    Nickname,
    Gender,
    Email,
    Phone,
    Birthday,
    Address,
    Organization,
    Circles,
}

impl TargetField {
    pub const ALL: [Self; 10] = [
        Self::FirstName,
        Self::LastName,
        Self::Nickname,
        Self::Gender,
        Self::Email,
        Self::Phone,
        Self::Birthday,
        Self::Address,
        Self::Organization,
        Self::Circles,
    ];

    /// Wire name used in [`ColumnMapping::field`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstname",
            Self::LastName => "lastname",
            Self::Nickname => "nickname",
            Self::Gender => "gender",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Birthday => "birthday",
            Self::Address => "address",
            Self::Organization => "organization",
            Self::Circles => "circles",
        }
    }

    /// Human-readable label, used in merge notes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Nickname => "Nickname",
            Self::Gender => "Gender",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Birthday => "Birthday",
            Self::Address => "Address",
            Self::Organization => "Organization",
            Self::Circles => "Circles",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::FirstName => &["firstname", "first", "givenname", "given", "forename", "vorname"],
            Self::LastName => &[
                "lastname",
                "last",
                "familyname",
                "family",
                "surname",
                "nachname",
                "familienname",
            ],
            Self::Nickname => &["nickname", "nick", "spitzname", "rufname"],
            Self::Gender => &["gender", "sex", "geschlecht"],
            Self::Email => &[
                "email",
                "emailaddress",
                "mail",
                "email1value",
                "emailadresse",
                "mailadresse",
            ],
            Self::Phone => &[
                "phone",
                "phonenumber",
                "phone1value",
                "mobile",
                "mobilephone",
                "cell",
                "tel",
                "telephone",
                "telefon",
                "telefonnummer",
                "handy",
                "mobil",
            ],
            Self::Birthday => &[
                "birthday",
                "birthdate",
                "dateofbirth",
                "bday",
                "dob",
                "geburtstag",
                "geburtsdatum",
            ],
            Self::Address => &[
                "address",
                "homeaddress",
                "street",
                "streetaddress",
                "adresse",
                "anschrift",
                "strasse",
                "straße",
            ],
            Self::Organization => &[
                "organization",
                "organisation",
                "org",
                "company",
                "employer",
                "firma",
                "unternehmen",
                "arbeitgeber",
            ],
            Self::Circles => &[
                "circles",
                "circle",
                "groups",
                "group",
                "categories",
                "category",
                "tags",
                "labels",
                "kreise",
                "gruppen",
                "kategorien",
            ],
        }
    }
}

fn header_key(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// ## Summary
/// Guesses the field a column header names, in English or German.
#[must_use]
pub fn infer_field(header: &str) -> Option<TargetField> {
    let key = header_key(header);
    if key.is_empty() {
        return None;
    }
    TargetField::ALL
        .into_iter()
        .find(|field| field.aliases().contains(&key.as_str()))
}

/// ## Summary
/// Suggests one mapping per header. Unrecognized headers, and headers naming
/// a field an earlier column already claimed, get an empty field.
#[must_use]
pub fn suggest_mappings(headers: &[String]) -> Vec<ColumnMapping> {
    let mut taken = Vec::new();
    headers
        .iter()
        .enumerate()
        .map(|(column_index, header)| {
            let field = infer_field(header).filter(|f| !taken.contains(f));
            if let Some(field) = field {
                taken.push(field);
            }
            ColumnMapping {
                column_index,
                field: field.map(TargetField::as_str).unwrap_or_default().to_string(),
            }
        })
        .collect()
}

/// ## Summary
/// Validates client-chosen mappings against a file with `column_count`
/// columns, dropping ignored columns.
///
/// ## Errors
/// Returns [`ServiceError::InvalidInput`] for an unknown field name or a
/// column index outside the file.
pub fn resolve_mappings(
    mappings: &[ColumnMapping],
    column_count: usize,
) -> ServiceResult<Vec<(usize, TargetField)>> {
    let mut resolved = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let name = mapping.field.trim();
        if name.is_empty() {
            continue;
        }
        let field = TargetField::from_wire(name)
            .ok_or_else(|| ServiceError::InvalidInput(format!("unknown import field '{name}'")))?;
        if mapping.column_index >= column_count {
            return Err(ServiceError::InvalidInput(format!(
                "column {} does not exist",
                mapping.column_index
            )));
        }
        resolved.push((mapping.column_index, field));
    }
    Ok(resolved)
}

/// ## Summary
/// Extracts a row's values. Blank cells are ignored; when two columns feed
/// the same scalar field the first non-blank one wins, while circle columns
/// accumulate.
#[must_use]
pub fn apply_mappings(row: &[String], mappings: &[(usize, TargetField)]) -> ParsedContact {
    let mut parsed = ParsedContact::default();
    for &(index, field) in mappings {
        if let Some(value) = row.get(index) {
            parsed.set(field, value);
        }
    }
    parsed.circles = dedup_circles(&parsed.circles);
    parsed
}

impl ParsedContact {
    /// Sets `field` unless it already holds a value. Circles are split on
    /// `,` and `;` and appended.
    pub fn set(&mut self, field: TargetField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            TargetField::Circles => {
                self.circles.extend(
                    value
                        .split([',', ';'])
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(ToString::to_string),
                );
                return;
            }
            TargetField::FirstName => &mut self.firstname,
            TargetField::LastName => &mut self.lastname,
            TargetField::Nickname => &mut self.nickname,
            TargetField::Gender => &mut self.gender,
            TargetField::Email => &mut self.email,
            TargetField::Phone => &mut self.phone,
            TargetField::Birthday => &mut self.birthday,
            TargetField::Address => &mut self.address,
            TargetField::Organization => &mut self.organization,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    /// The values a contact would show in a preview.
    #[must_use]
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            firstname: contact.given_name.clone(),
            lastname: contact.family_name.clone(),
            nickname: contact.nickname.clone(),
            gender: contact.gender.map(|g| g.as_str().to_string()),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            birthday: contact.birthday.clone(),
            address: contact.address.clone(),
            organization: contact.organization.clone(),
            circles: contact.circles.clone(),
        }
    }

    /// Builds a new contact, normalizing birthday and gender. Values that do
    /// not normalize are dropped; validation reports them beforehand.
    #[must_use]
    pub fn to_contact(&self, owner_id: i64) -> Contact {
        let mut contact = Contact::new(owner_id, uuid::Uuid::new_v4().to_string());
        contact.given_name = non_empty(self.firstname.as_deref());
        contact.family_name = non_empty(self.lastname.as_deref());
        contact.nickname = non_empty(self.nickname.as_deref());
        contact.gender = self.gender.as_deref().and_then(normalize_gender);
        contact.email = non_empty(self.email.as_deref());
        contact.phone = non_empty(self.phone.as_deref());
        contact.birthday = self.birthday.as_deref().and_then(normalize_birthday);
        contact.address = non_empty(self.address.as_deref());
        contact.organization = non_empty(self.organization.as_deref());
        contact.circles = dedup_circles(&self.circles);
        contact
    }
}
