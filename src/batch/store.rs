use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::record::AnalysisRecord;

/// Append-only URL → record map shared by every worker.
///
/// The first record stored for a URL wins; later inserts for the same URL
/// are ignored.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Arc<Mutex<HashMap<String, AnalysisRecord>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return how many URLs are now complete
    pub async fn insert(&self, record: AnalysisRecord) -> usize {
        let mut records = self.records.lock().await;
        records.entry(record.url.clone()).or_insert(record);
        records.len()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.records.lock().await.contains_key(url)
    }

    /// Copy of everything stored so far
    pub async fn snapshot(&self) -> HashMap<String, AnalysisRecord> {
        self.records.lock().await.clone()
    }
}
