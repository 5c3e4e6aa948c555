//! CSV upload parsing.

use csv::{ReaderBuilder, Trim};
use meerkat_core::config::ImportConfig;

use crate::error::{ServiceError, ServiceResult};

/// A parsed CSV file: the header row and the data rows, each cut to the
/// header's width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// ## Summary
/// Parses an uploaded CSV file. The first record is the header; blank lines
/// are skipped and rows may be ragged. A row of empty fields is still a row.
///
/// ## Errors
/// Returns [`ServiceError::InvalidInput`] when the file is over the size or
/// row cap, is not UTF-8, or has no header or no data rows.
pub fn parse_csv(bytes: &[u8], config: &ImportConfig) -> ServiceResult<CsvDocument> {
    if bytes.len() > config.max_csv_bytes {
        return Err(ServiceError::InvalidInput(format!(
            "CSV file exceeds {} bytes",
            config.max_csv_bytes
        )));
    }
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::InvalidInput(format!("invalid CSV header: {e}")))?
        .iter()
        .map(ToString::to_string)
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(ServiceError::InvalidInput("CSV file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ServiceError::InvalidInput(format!("invalid CSV data: {e}")))?;
        if rows.len() == config.max_csv_rows {
            return Err(ServiceError::InvalidInput(format!(
                "CSV file has more than {} rows",
                config.max_csv_rows
            )));
        }
        rows.push(
            record
                .iter()
                .take(headers.len())
                .map(ToString::to_string)
                .collect(),
        );
    }
    if rows.is_empty() {
        return Err(ServiceError::InvalidInput("CSV file has no data rows".to_string()));
    }

    tracing::debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV upload");
    Ok(CsvDocument { headers, rows })
}
