use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted analysis. Immutable once written.
///
/// The store-native key `id` is exposed to clients only as the string `_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub file_id: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub resume_text: String,
    pub job_description_text: String,
    pub recommended_store: i32,
    pub analysis: Value,
    pub created_at: DateTime<Utc>,
}

/// Everything the pipeline hands to the store; identifiers and timestamps are
/// assigned by the store at write time.
#[derive(Debug, Clone)]
pub struct NewAnalysisRecord {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub resume_text: String,
    pub job_description_text: String,
    pub recommended_store: i32,
    pub analysis: Value,
}

impl NewAnalysisRecord {
    /// Drops U+0000 from every string, JSON keys included. Postgres text and
    /// json columns cannot hold it.
    pub fn without_nul(self) -> Self {
        Self {
            filename: self.filename.map(strip_nul),
            content_type: self.content_type.map(strip_nul),
            resume_text: strip_nul(self.resume_text),
            job_description_text: strip_nul(self.job_description_text),
            recommended_store: self.recommended_store,
            analysis: strip_nul_json(self.analysis),
        }
    }

    pub fn into_record(self, id: Uuid, file_id: String, created_at: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            id,
            file_id,
            filename: self.filename,
            content_type: self.content_type,
            resume_text: self.resume_text,
            job_description_text: self.job_description_text,
            recommended_store: self.recommended_store,
            analysis: self.analysis,
            created_at,
        }
    }
}

fn strip_nul(text: String) -> String {
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text
    }
}

fn strip_nul_json(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(strip_nul(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nul_json).collect()),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (strip_nul(key), strip_nul_json(value)))
                .collect(),
        ),
        other => other,
    }
}
