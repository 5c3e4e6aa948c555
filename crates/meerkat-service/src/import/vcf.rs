//! VCF upload parsing.

use meerkat_core::config::ImportConfig;
use meerkat_db::model::contact::Contact;
use meerkat_rfc::vcard::parse_each;

use crate::carddav::mapper::vcard_to_contact;
use crate::error::{ServiceError, ServiceResult};
use crate::photo::PhotoSource;

/// One card of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcfEntry {
    /// A card mapped to an unsaved contact owned by the uploader.
    Parsed {
        contact: Box<Contact>,
        photo: Option<PhotoSource>,
    },
    /// A card that could not be parsed.
    Invalid(String),
}

/// ## Summary
/// Splits an uploaded file into cards and maps each one. A malformed card
/// does not fail the upload; it becomes [`VcfEntry::Invalid`].
///
/// ## Errors
/// Returns [`ServiceError::InvalidInput`] when the file is over the size or
/// card cap, is not UTF-8, or holds no cards at all.
pub fn parse_vcf(
    bytes: &[u8],
    owner_id: i64,
    config: &ImportConfig,
) -> ServiceResult<Vec<VcfEntry>> {
    if bytes.len() > config.max_vcf_bytes {
        return Err(ServiceError::InvalidInput(format!(
            "VCF file exceeds {} bytes",
            config.max_vcf_bytes
        )));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ServiceError::InvalidInput(format!("VCF file is not UTF-8: {e}")))?;

    let results = parse_each(text);
    if results.is_empty() {
        return Err(ServiceError::InvalidInput("VCF file contains no vCards".to_string()));
    }
    if results.len() > config.max_vcf_cards {
        return Err(ServiceError::InvalidInput(format!(
            "VCF file has more than {} cards",
            config.max_vcf_cards
        )));
    }

    let entries: Vec<VcfEntry> = results
        .into_iter()
        .map(|result| match result {
            Ok(card) => {
                let uid = card
                    .uid()
                    .filter(|uid| !uid.trim().is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let mut contact = Contact::new(owner_id, uid);
                let photo = vcard_to_contact(&card, &mut contact);
                VcfEntry::Parsed {
                    contact: Box::new(contact),
                    photo,
                }
            }
            Err(err) => VcfEntry::Invalid(err.to_string()),
        })
        .collect();

    tracing::debug!(cards = entries.len(), "Parsed VCF upload");
    Ok(entries)
}
