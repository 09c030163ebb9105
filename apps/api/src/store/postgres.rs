use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, NewAnalysisRecord};
use crate::store::{generate_file_id, AnalysisStore, StoreError, MAX_ID_ATTEMPTS};

/// PostgreSQL-backed store over the `resume_analysis` table.
#[derive(Clone)]
pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn save(&self, record: NewAnalysisRecord) -> Result<String, StoreError> {
        // json (not jsonb) keeps the model's key order; bound as text so the
        // driver does not encode it as jsonb first
        let analysis = serde_json::to_string(&record.analysis)?;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let file_id = generate_file_id();

            // Append-only: a colliding file_id inserts nothing, never overwrites
            let inserted: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO resume_analysis
                    (file_id, filename, content_type, resume_text,
                     job_description_text, recommended_store, analysis)
                VALUES ($1, $2, $3, $4, $5, $6, $7::json)
                ON CONFLICT (file_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(&file_id)
            .bind(&record.filename)
            .bind(&record.content_type)
            .bind(&record.resume_text)
            .bind(&record.job_description_text)
            .bind(record.recommended_store)
            .bind(&analysis)
            .fetch_optional(&self.pool)
            .await?;

            match inserted {
                Some(id) => {
                    info!("Stored analysis {file_id} (row {id})");
                    return Ok(file_id);
                }
                None => warn!("file_id collision on attempt {attempt}, regenerating"),
            }
        }
        Err(StoreError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    async fn get(&self, file_id: &str) -> Result<AnalysisRecord, StoreError> {
        sqlx::query_as::<_, AnalysisRecord>(
            r#"
            SELECT id, file_id, filename, content_type, resume_text,
                   job_description_text, recommended_store, analysis, created_at
            FROM resume_analysis
            WHERE file_id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }
}
