//! The upload → preview → confirm import flow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use meerkat_core::config::ImportConfig;
use meerkat_db::db::store::{ContactStore, ContactTx};
use meerkat_db::error::DbError;
use meerkat_db::model::contact::Contact;
use meerkat_db::model::note::NewNote;
use meerkat_db::model::user::User;

use super::csv::parse_csv;
use super::duplicate::find_duplicate;
use super::mapping::{apply_mappings, resolve_mappings, suggest_mappings};
use super::merge::{merge_into, merge_note};
use super::session::{ImportSession, ImportSessions, SessionPayload};
use super::types::{
    ConfirmRequest, CsvUploadResponse, ImportAction, ImportKind, ImportResult, ParsedContact,
    PreviewRequest, PreviewResponse, RowPreview,
};
use super::validate::RowValidator;
use super::vcf::{VcfEntry, parse_vcf};
use crate::error::{ServiceError, ServiceResult};
use crate::photo::{PhotoSource, Photos};

const SAMPLE_ROWS: usize = 3;

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn ContactStore>,
    sessions: Arc<dyn ImportSessions>,
    photos: Photos,
    validator: RowValidator,
    config: ImportConfig,
}

/// Why a single row could not be applied.
enum RowError {
    /// Recorded against the row; the import carries on.
    Row(String),
    /// Aborts the whole transaction.
    Fatal(DbError),
}

impl From<DbError> for RowError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound | DbError::PreconditionFailed(_) | DbError::Conflict(_) => {
                Self::Row(err.to_string())
            }
            fatal => Self::Fatal(fatal),
        }
    }
}

enum Applied {
    Created,
    Updated,
}

impl ImportService {
    /// ## Errors
    /// Returns [`ServiceError::Internal`] if the row validator cannot be
    /// built.
    pub fn new(
        store: Arc<dyn ContactStore>,
        sessions: Arc<dyn ImportSessions>,
        photos: Photos,
        config: ImportConfig,
    ) -> ServiceResult<Self> {
        Ok(Self {
            store,
            sessions,
            photos,
            validator: RowValidator::new()?,
            config,
        })
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.session_ttl_secs)
    }

    /// ## Summary
    /// Parses a CSV upload and opens a session for it.
    ///
    /// ## Errors
    /// Returns [`ServiceError::InvalidInput`] when the file is not a usable
    /// CSV file.
    #[tracing::instrument(skip_all, fields(user_id = user.id, len = bytes.len()))]
    pub async fn upload_csv(&self, user: &User, bytes: &[u8]) -> ServiceResult<CsvUploadResponse> {
        self.sessions.sweep_expired().await;
        let document = parse_csv(bytes, &self.config)?;

        let suggested_mappings = suggest_mappings(&document.headers);
        let headers = document.headers.clone();
        let row_count = document.rows.len();
        let sample_data = document.rows.iter().take(SAMPLE_ROWS).cloned().collect();

        let session = ImportSession::new(user.id, SessionPayload::Csv(document), self.ttl());
        let session_id = session.id.clone();
        self.sessions.insert(session).await;
        tracing::info!(%session_id, row_count, "CSV upload stored");

        Ok(CsvUploadResponse {
            session_id,
            headers,
            suggested_mappings,
            row_count,
            sample_data,
        })
    }

    /// ## Summary
    /// Applies column mappings to a CSV session, validating every row and
    /// looking for duplicates. The result is kept for confirm; previewing
    /// again replaces it.
    ///
    /// ## Errors
    /// Returns [`ServiceError::NotFound`] for an unknown, foreign or expired
    /// session and [`ServiceError::InvalidInput`] for bad mappings.
    #[tracing::instrument(skip_all, fields(user_id = user.id, session_id = %request.session_id))]
    pub async fn preview_csv(
        &self,
        user: &User,
        request: &PreviewRequest,
    ) -> ServiceResult<PreviewResponse> {
        let session = self.session(user, &request.session_id).await?;
        let SessionPayload::Csv(document) = &session.payload else {
            return Err(ServiceError::InvalidInput(
                "column mappings only apply to CSV imports".to_string(),
            ));
        };
        let mappings = resolve_mappings(&request.mappings, document.headers.len())?;

        let mut rows = Vec::with_capacity(document.rows.len());
        for (row_index, row) in document.rows.iter().enumerate() {
            let parsed = apply_mappings(row, &mappings);
            rows.push(self.preview_row(user.id, row_index, parsed, Vec::new()).await?);
        }

        self.sessions
            .mark_previewed(&session.id, user.id, request.mappings.clone(), rows.clone())
            .await
            .ok_or_else(session_gone)?;

        let response = PreviewResponse::new(session.id.clone(), rows);
        tracing::info!(
            total = response.total_rows,
            errors = response.error_count,
            duplicates = response.duplicate_count,
            "CSV preview computed"
        );
        Ok(response)
    }

    /// ## Summary
    /// Parses a VCF upload and previews it in one step.
    ///
    /// ## Errors
    /// Returns [`ServiceError::InvalidInput`] when the file is not usable.
    /// Individual malformed cards become rows with a validation error.
    #[tracing::instrument(skip_all, fields(user_id = user.id, len = bytes.len()))]
    pub async fn upload_vcf(&self, user: &User, bytes: &[u8]) -> ServiceResult<PreviewResponse> {
        self.sessions.sweep_expired().await;
        let entries = parse_vcf(bytes, user.id, &self.config)?;

        let mut rows = Vec::with_capacity(entries.len());
        for (row_index, entry) in entries.iter().enumerate() {
            let row = match entry {
                VcfEntry::Parsed { contact, .. } => {
                    let parsed = ParsedContact::from_contact(contact);
                    self.preview_row(user.id, row_index, parsed, Vec::new()).await?
                }
                VcfEntry::Invalid(reason) => {
                    let errors = vec![format!("Invalid vCard: {reason}")];
                    self.preview_row(user.id, row_index, ParsedContact::default(), errors)
                        .await?
                }
            };
            rows.push(row);
        }

        let mut session = ImportSession::new(user.id, SessionPayload::Vcf(entries), self.ttl());
        session.previews = Some(rows.clone());
        let response = PreviewResponse::new(session.id.clone(), rows);
        self.sessions.insert(session).await;

        tracing::info!(
            session_id = %response.session_id,
            total = response.total_rows,
            errors = response.error_count,
            duplicates = response.duplicate_count,
            "VCF upload previewed"
        );
        Ok(response)
    }

    /// ## Summary
    /// Applies the chosen action to every previewed row in one transaction,
    /// then saves photos.
    ///
    /// The session is claimed before any row is written, so a second confirm
    /// of the same session sees [`ServiceError::NotFound`]. A confirm that
    /// fails puts the session back. Rows without an action are skipped. A
    /// row that cannot be applied is reported in [`ImportResult::errors`]
    /// and counted as skipped; the rest of the import still commits.
    ///
    /// ## Errors
    /// Returns [`ServiceError::NotFound`] for an unknown, foreign, expired or
    /// already confirmed session, [`ServiceError::InvalidInput`] when the
    /// session has not been previewed or is of another kind, and
    /// [`ServiceError::Internal`] when the transaction fails as a whole.
    #[tracing::instrument(skip_all, fields(user_id = user.id, session_id = %request.session_id))]
    pub async fn confirm(
        &self,
        user: &User,
        kind: ImportKind,
        request: &ConfirmRequest,
    ) -> ServiceResult<ImportResult> {
        let session = self
            .sessions
            .take(&request.session_id, user.id)
            .await
            .ok_or_else(session_gone)?;

        let (result, photo_tasks) = match self.apply_session(user, kind, &session, request).await {
            Ok(applied) => applied,
            Err(err) => {
                self.sessions.insert(ImportSession::clone(&session)).await;
                return Err(err);
            }
        };

        self.save_photos(user.id, photo_tasks).await;

        tracing::info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Import confirmed"
        );
        Ok(result)
    }

    async fn apply_session(
        &self,
        user: &User,
        kind: ImportKind,
        session: &ImportSession,
        request: &ConfirmRequest,
    ) -> ServiceResult<(ImportResult, Vec<(i64, PhotoSource)>)> {
        if session.payload.kind() != kind {
            return Err(ServiceError::InvalidInput(format!(
                "session is not a {} import",
                kind.label()
            )));
        }
        let Some(previews) = session.previews.as_deref() else {
            return Err(ServiceError::InvalidInput(
                "import must be previewed before it is confirmed".to_string(),
            ));
        };

        let actions: HashMap<usize, ImportAction> = request
            .actions
            .iter()
            .map(|a| (a.row_index, a.action))
            .collect();

        let mut result = ImportResult {
            total_processed: previews.len(),
            ..ImportResult::default()
        };
        let mut photo_tasks = Vec::new();
        let mut tx = self.store.begin().await?;

        for preview in previews {
            let action = actions
                .get(&preview.row_index)
                .copied()
                .unwrap_or(ImportAction::Skip);
            if action == ImportAction::Skip {
                result.skipped += 1;
                continue;
            }

            match self
                .apply_row(tx.as_mut(), user, session, preview, action)
                .await
            {
                Ok((applied, photo)) => {
                    match applied {
                        Applied::Created => result.created += 1,
                        Applied::Updated => result.updated += 1,
                    }
                    photo_tasks.extend(photo);
                }
                Err(RowError::Row(message)) => {
                    result.skipped += 1;
                    result
                        .errors
                        .push(format!("Row {}: {message}", preview.row_index + 1));
                }
                Err(RowError::Fatal(err)) => {
                    tracing::error!(
                        error = %err,
                        row_index = preview.row_index,
                        "Import transaction failed"
                    );
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(error = %rollback, "Rollback failed");
                    }
                    return Err(ServiceError::Internal(format!("import failed: {err}")));
                }
            }
        }

        tx.commit().await.map_err(|err| {
            tracing::error!(error = %err, "Import commit failed");
            ServiceError::Internal(format!("import failed: {err}"))
        })?;
        Ok((result, photo_tasks))
    }

    async fn session(&self, user: &User, id: &str) -> ServiceResult<Arc<ImportSession>> {
        self.sessions.get(id, user.id).await.ok_or_else(session_gone)
    }

    async fn preview_row(
        &self,
        owner_id: i64,
        row_index: usize,
        parsed: ParsedContact,
        mut validation_errors: Vec<String>,
    ) -> ServiceResult<RowPreview> {
        if validation_errors.is_empty() {
            validation_errors = self.validator.validate(&parsed);
        }
        let duplicate_match = if validation_errors.is_empty() {
            find_duplicate(self.store.as_ref(), owner_id, &parsed).await?
        } else {
            None
        };
        let suggested_action = if !validation_errors.is_empty() {
            ImportAction::Skip
        } else if duplicate_match.is_some() {
            ImportAction::Update
        } else {
            ImportAction::Add
        };

        Ok(RowPreview {
            row_index,
            parsed_contact: parsed,
            validation_errors,
            duplicate_match,
            suggested_action,
        })
    }

    /// The contact a row would write, plus any photo its card carried.
    fn incoming(
        session: &ImportSession,
        owner_id: i64,
        preview: &RowPreview,
    ) -> Result<(Contact, Option<PhotoSource>), RowError> {
        match &session.payload {
            SessionPayload::Csv(_) => Ok((preview.parsed_contact.to_contact(owner_id), None)),
            SessionPayload::Vcf(entries) => match entries.get(preview.row_index) {
                Some(VcfEntry::Parsed { contact, photo }) => {
                    let mut contact = Contact::clone(contact);
                    contact.owner_id = owner_id;
                    Ok((contact, photo.clone()))
                }
                Some(VcfEntry::Invalid(reason)) => {
                    Err(RowError::Row(format!("Invalid vCard: {reason}")))
                }
                None => Err(RowError::Row("row does not exist".to_string())),
            },
        }
    }

    async fn apply_row(
        &self,
        tx: &mut dyn ContactTx,
        user: &User,
        session: &ImportSession,
        preview: &RowPreview,
        action: ImportAction,
    ) -> Result<(Applied, Option<(i64, PhotoSource)>), RowError> {
        if !preview.is_valid() {
            return Err(RowError::Row(preview.validation_errors.join("; ")));
        }
        let (incoming, photo) = Self::incoming(session, user.id, preview)?;

        match action {
            ImportAction::Add => {
                let created = tx.insert(incoming).await?;
                tracing::debug!(
                    row_index = preview.row_index,
                    contact_id = created.id,
                    "Imported new contact"
                );
                Ok((Applied::Created, photo.map(|p| (created.id, p))))
            }
            ImportAction::Update => {
                let Some(duplicate) = &preview.duplicate_match else {
                    return Err(RowError::Row("no matching contact to update".to_string()));
                };
                let mut contact = tx
                    .find_by_id(user.id, duplicate.contact_id)
                    .await?
                    .ok_or_else(|| RowError::Row("matched contact no longer exists".to_string()))?;
                let contact_id = contact.id;

                let changes = merge_into(&mut contact, &incoming);
                if let Some(content) = merge_note(session.payload.kind(), &changes) {
                    tx.update(contact).await?;
                    let note = NewNote {
                        owner_id: user.id,
                        contact_id,
                        content,
                    };
                    if let Err(err) = tx.insert_note(note).await {
                        tracing::warn!(error = %err, contact_id, "Failed to write merge note");
                    }
                }
                tracing::debug!(
                    row_index = preview.row_index,
                    contact_id,
                    changed = changes.len(),
                    "Merged contact"
                );
                Ok((Applied::Updated, photo.map(|p| (contact_id, p))))
            }
            ImportAction::Skip => Err(RowError::Row("skipped".to_string())),
        }
    }

    async fn save_photos(&self, owner_id: i64, tasks: Vec<(i64, PhotoSource)>) {
        for (contact_id, source) in tasks {
            let saved = match self.photos.materialize(source).await {
                Ok(saved) => saved,
                Err(err) => {
                    tracing::warn!(error = %err, contact_id, "Skipping imported photo");
                    continue;
                }
            };
            if let Err(err) = self
                .store
                .patch_photo(owner_id, contact_id, Some(saved.filename), Some(saved.thumbnail))
                .await
            {
                tracing::warn!(error = %err, contact_id, "Failed to attach imported photo");
            }
        }
    }
}

fn session_gone() -> ServiceError {
    ServiceError::NotFound("import session".to_string())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
