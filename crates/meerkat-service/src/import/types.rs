//! Request and response shapes of the import API.

use serde::{Deserialize, Serialize};

/// What to do with one row on confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Add,
    Update,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Email,
    Name,
}

/// An existing contact a row appears to duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub contact_id: i64,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub match_reason: MatchReason,
}

/// One row's values keyed by import field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub circles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPreview {
    /// 0-based position among the data rows (or cards).
    pub row_index: usize,
    pub parsed_contact: ParsedContact,
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_match: Option<DuplicateMatch>,
    pub suggested_action: ImportAction,
}

impl RowPreview {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub session_id: String,
    pub rows: Vec<RowPreview>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
}

impl PreviewResponse {
    #[must_use]
    pub fn new(session_id: String, rows: Vec<RowPreview>) -> Self {
        let valid_rows = rows.iter().filter(|r| r.is_valid()).count();
        let duplicate_count = rows.iter().filter(|r| r.duplicate_match.is_some()).count();
        Self {
            session_id,
            total_rows: rows.len(),
            error_count: rows.len() - valid_rows,
            valid_rows,
            duplicate_count,
            rows,
        }
    }
}

/// A CSV column bound to an import field. An empty `field` ignores the
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub column_index: usize,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvUploadResponse {
    pub session_id: String,
    pub headers: Vec<String>,
    pub suggested_mappings: Vec<ColumnMapping>,
    pub row_count: usize,
    pub sample_data: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub session_id: String,
    pub mappings: Vec<ColumnMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAction {
    pub row_index: usize,
    pub action: ImportAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
    #[serde(default)]
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub total_processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// The file format a session was uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Csv,
    Vcf,
}

impl ImportKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Vcf => "VCF",
        }
    }
}
