use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, NewAnalysisRecord};
use crate::store::{generate_file_id, AnalysisStore, StoreError, MAX_ID_ATTEMPTS};

/// Process-local store. Used when no database is configured and in tests.
/// Contents do not survive a restart.
#[derive(Default)]
pub struct InMemoryAnalysisStore {
    records: RwLock<HashMap<String, AnalysisRecord>>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn save(&self, record: NewAnalysisRecord) -> Result<String, StoreError> {
        let mut records = self.records.write().await;
        for _ in 0..MAX_ID_ATTEMPTS {
            let file_id = generate_file_id();
            if records.contains_key(&file_id) {
                continue;
            }
            let stored = record.into_record(Uuid::new_v4(), file_id.clone(), Utc::now());
            records.insert(file_id.clone(), stored);
            info!("Stored analysis {file_id} in memory");
            return Ok(file_id);
        }
        Err(StoreError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    async fn get(&self, file_id: &str) -> Result<AnalysisRecord, StoreError> {
        self.records
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
