//! Upload pipeline: Extractor → Prompt Builder → LLM → Normalizer → Store.
//!
//! Media-type and extraction faults stop the request before the LLM or the
//! store is touched. Once the LLM answers, something is always persisted.

use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::normalizer::{normalize_completion, NormalizedShape, SchemaPolicy};
use crate::analysis::prompts::{build_analysis_prompt, PROMPT_VERSION};
use crate::analysis::schema::threshold_mismatches;
use crate::errors::AppError;
use crate::extraction::{ensure_pdf, ExtractionError, TextExtractor};
use crate::llm_client::CompletionClient;
use crate::models::analysis::NewAnalysisRecord;
use crate::store::AnalysisStore;

#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Form field the document arrived in; used in error messages.
    pub field: &'static str,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume: UploadedDocument,
    pub job_description: UploadedDocument,
    pub threshold: u8,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub file_id: String,
    pub analysis: Value,
}

/// Both uploads must be declared `application/pdf`; the resume is checked first.
pub fn ensure_pdf_documents(
    resume: &UploadedDocument,
    job_description: &UploadedDocument,
) -> Result<(), ExtractionError> {
    ensure_pdf(resume.field, resume.content_type.as_deref())?;
    ensure_pdf(job_description.field, job_description.content_type.as_deref())
}

pub async fn analyze_and_store(
    extractor: &dyn TextExtractor,
    llm: &dyn CompletionClient,
    store: &dyn AnalysisStore,
    policy: SchemaPolicy,
    request: AnalysisRequest,
) -> Result<AnalysisOutcome, AppError> {
    let AnalysisRequest {
        resume,
        job_description,
        threshold,
    } = request;

    ensure_pdf_documents(&resume, &job_description)?;

    let resume_text = extractor.extract(resume.field, resume.data.clone()).await?;
    let job_description_text = extractor
        .extract(job_description.field, job_description.data.clone())
        .await?;
    info!(
        "Extracted resume ({} bytes -> {} chars) and job description ({} bytes -> {} chars)",
        resume.data.len(),
        resume_text.len(),
        job_description.data.len(),
        job_description_text.len()
    );

    let prompt = build_analysis_prompt(&resume_text, &job_description_text, threshold);
    info!(
        "Requesting analysis (prompt {PROMPT_VERSION}, model {}, threshold {threshold})",
        llm.model()
    );
    let completion = llm.complete(&prompt).await?;

    let analysis = normalize_completion(&completion, policy);
    let shape = NormalizedShape::of(&analysis);
    if shape != NormalizedShape::Parsed {
        warn!("LLM output stored as fallback envelope ({shape:?})");
    }
    let mismatched = threshold_mismatches(&analysis, threshold);
    if !mismatched.is_empty() {
        warn!("Roles with status inconsistent with threshold {threshold}: {mismatched:?}");
    }

    let record = NewAnalysisRecord {
        filename: resume.filename,
        content_type: resume.content_type,
        resume_text,
        job_description_text,
        recommended_store: i32::from(threshold),
        analysis,
    }
    .without_nul();
    let analysis = record.analysis.clone();
    let file_id = store.save(record).await?;

    info!("Analysis {file_id} stored ({shape:?})");
    Ok(AnalysisOutcome { file_id, analysis })
}
