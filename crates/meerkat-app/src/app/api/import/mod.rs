//! JSON endpoints of the CSV/VCF import flow.

use meerkat_core::constants::IMPORT_ROUTE_COMPONENT;
use meerkat_service::error::ServiceError;
use meerkat_service::import::types::{
    ConfirmRequest, CsvUploadResponse, ImportKind, ImportResult, PreviewRequest, PreviewResponse,
};
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::get_config_from_depot;
use crate::depot::get_user_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthMiddleware;
use crate::state::get_state_from_depot;

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

pub fn routes() -> Router {
    Router::with_path(IMPORT_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .push(
            Router::with_path("csv")
                .post(upload_csv)
                .push(Router::with_path("preview").post(preview_csv))
                .push(Router::with_path("confirm").post(confirm_csv)),
        )
        .push(
            Router::with_path("vcf")
                .post(upload_vcf)
                .push(Router::with_path("confirm").post(confirm_vcf)),
        )
}

/// ## Summary
/// Accepts a CSV file and returns its headers, suggested mappings and sample rows.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn upload_csv(req: &mut Request, res: &mut Response, depot: &Depot) {
    let outcome = upload(req, depot, ImportKind::Csv).await;
    respond(res, outcome);
}

/// ## Summary
/// Applies column mappings to an uploaded CSV and returns the row preview.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn preview_csv(req: &mut Request, res: &mut Response, depot: &Depot) {
    let outcome = preview(req, depot).await;
    respond(res, outcome);
}

#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn confirm_csv(req: &mut Request, res: &mut Response, depot: &Depot) {
    let outcome = confirm(req, depot, ImportKind::Csv).await;
    respond(res, outcome);
}

/// ## Summary
/// Accepts a VCF file and returns the row preview directly.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn upload_vcf(req: &mut Request, res: &mut Response, depot: &Depot) {
    let outcome = upload(req, depot, ImportKind::Vcf).await;
    respond(res, outcome);
}

#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn confirm_vcf(req: &mut Request, res: &mut Response, depot: &Depot) {
    let outcome = confirm(req, depot, ImportKind::Vcf).await;
    respond(res, outcome);
}

/// What an upload answers with: the CSV column overview, or the VCF preview.
#[derive(Serialize)]
#[serde(untagged)]
enum UploadResponse {
    Csv(CsvUploadResponse),
    Vcf(PreviewResponse),
}

async fn upload(req: &mut Request, depot: &Depot, kind: ImportKind) -> AppResult<UploadResponse> {
    let config = get_config_from_depot(depot)?;
    let max_bytes = match kind {
        ImportKind::Csv => config.import.max_csv_bytes,
        ImportKind::Vcf => config.import.max_vcf_bytes,
    };
    let bytes = read_upload(req, max_bytes).await?;
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    Ok(match kind {
        ImportKind::Csv => UploadResponse::Csv(state.import.upload_csv(user, &bytes).await?),
        ImportKind::Vcf => UploadResponse::Vcf(state.import.upload_vcf(user, &bytes).await?),
    })
}

async fn preview(req: &mut Request, depot: &Depot) -> AppResult<PreviewResponse> {
    let request: PreviewRequest = parse_body(req).await?;
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    Ok(state.import.preview_csv(user, &request).await?)
}

async fn confirm(
    req: &mut Request,
    depot: &Depot,
    kind: ImportKind,
) -> AppResult<ImportResult> {
    let request: ConfirmRequest = parse_body(req).await?;
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    Ok(state.import.confirm(user, kind, &request).await?)
}

async fn read_upload(req: &mut Request, max_bytes: usize) -> AppResult<Vec<u8>> {
    let Some(file) = req.file(FILE_FIELD).await else {
        return Err(ServiceError::InvalidInput(format!(
            "multipart field `{FILE_FIELD}` is required"
        ))
        .into());
    };
    let size = usize::try_from(file.size()).unwrap_or(usize::MAX);
    if size > max_bytes {
        return Err(ServiceError::InvalidInput(format!("file exceeds {max_bytes} bytes")).into());
    }
    tokio::fs::read(file.path())
        .await
        .map_err(|e| ServiceError::Internal(format!("failed to read upload: {e}")).into())
}

async fn parse_body<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    req.parse_json::<T>()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("invalid JSON body: {e}")).into())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn respond<T: Serialize + Send>(res: &mut Response, outcome: AppResult<T>) {
    match outcome {
        Ok(body) => res.render(Json(body)),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(error = %err, "Import request failed");
            } else {
                tracing::debug!(error = %err, status = %status, "Import request rejected");
            }
            res.status_code(status);
            res.render(Json(ErrorBody {
                error: message(&err),
            }));
        }
    }
}

/// Server-side failures are not described to the client.
fn message(err: &AppError) -> String {
    if err.status_code().is_server_error() {
        "internal server error".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod handler_tests;
