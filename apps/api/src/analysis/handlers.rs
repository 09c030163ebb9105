use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::analysis::pipeline::{
    analyze_and_store, ensure_pdf_documents, AnalysisRequest, UploadedDocument,
};
use crate::analysis::prompts::DEFAULT_THRESHOLD;
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;
use crate::models::analysis::AnalysisRecord;
use crate::state::AppState;

pub const RESUME_FIELD: &str = "resume_file";
pub const JOB_DESCRIPTION_FIELD: &str = "job_description";
pub const THRESHOLD_FIELD: &str = "recommended_store";

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub recommended_store: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file_id: String,
    pub analysis: Value,
}

/// POST /resume/upload_resume
///
/// Multipart fields: `resume_file` (PDF), `job_description` (PDF) and an
/// optional `recommended_store` threshold. The threshold may also arrive as a
/// query parameter; the form field wins when both are present.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    uploader: Option<Extension<AuthenticatedUser>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    if let Some(Extension(user)) = &uploader {
        info!("Upload from authenticated user {}", user.username);
    }

    let mut resume = None;
    let mut job_description = None;
    let mut threshold_field = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(RESUME_FIELD) => resume = Some(read_document(RESUME_FIELD, field).await?),
            Some(JOB_DESCRIPTION_FIELD) => {
                job_description = Some(read_document(JOB_DESCRIPTION_FIELD, field).await?)
            }
            Some(THRESHOLD_FIELD) => {
                threshold_field = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Unreadable '{THRESHOLD_FIELD}' field: {e}"))
                })?)
            }
            _ => {}
        }
    }

    let resume = resume.ok_or_else(|| missing_field(RESUME_FIELD))?;
    let job_description = job_description.ok_or_else(|| missing_field(JOB_DESCRIPTION_FIELD))?;
    // a non-PDF upload is reported before a bad threshold
    ensure_pdf_documents(&resume, &job_description)?;
    let threshold = parse_threshold(threshold_field.or(params.recommended_store).as_deref())?;

    let outcome = analyze_and_store(
        state.extractor.as_ref(),
        state.llm.as_ref(),
        state.store.as_ref(),
        state.config.schema_policy,
        AnalysisRequest {
            resume,
            job_description,
            threshold,
        },
    )
    .await?;

    Ok(Json(UploadResponse {
        message: "Resume analyzed and stored successfully.",
        file_id: outcome.file_id,
        analysis: outcome.analysis,
    }))
}

/// GET /resume/get_analysis/:file_id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<AnalysisRecord>, AppError> {
    Ok(Json(state.store.get(&file_id).await?))
}

async fn read_document(
    name: &'static str,
    field: Field<'_>,
) -> Result<UploadedDocument, AppError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable '{name}' upload: {e}")))?;
    Ok(UploadedDocument {
        field: name,
        filename,
        content_type,
        data,
    })
}

fn missing_field(name: &str) -> AppError {
    AppError::UnprocessableEntity(format!("Missing required field '{name}'"))
}

fn parse_threshold(raw: Option<&str>) -> Result<u8, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_THRESHOLD);
    };
    raw.parse::<u8>()
        .ok()
        .filter(|t| *t <= 100)
        .ok_or_else(|| {
            AppError::UnprocessableEntity(format!(
                "'{THRESHOLD_FIELD}' must be an integer between 0 and 100, got '{raw}'"
            ))
        })
}
