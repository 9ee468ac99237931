use std::{path::PathBuf, sync::Arc};
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::json_doc_store::JsonDocStore;
use crate::survey::{repository::ResponseRepository, ResponseDocument, SurveyResponse};

/// File-backed survey response collection.
///
/// The whole collection lives in one JSON file shaped as
/// `{"responses": [...]}`. Nothing is cached: every call reloads the file.
pub struct ResponseStore {
    doc: JsonDocStore<ResponseDocument>,
}

impl ResponseStore {
    /// Open the store at `path` and make sure the file exists.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = Self { doc: JsonDocStore::new(path) };
        store.initialize().await?;
        Ok(Arc::new(store))
    }

    /// Create the data file with an empty collection if it is missing.
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        self.doc.initialize().await
    }

    pub async fn load_all(&self) -> Result<Vec<SurveyResponse>, ServiceError> {
        Ok(self.doc.load().await?.responses)
    }

    pub async fn replace_all(&self, responses: Vec<SurveyResponse>) -> Result<(), ServiceError> {
        self.doc.replace(&ResponseDocument { responses }).await
    }

    pub async fn append(&self, response: SurveyResponse) -> Result<usize, ServiceError> {
        self.append_many(vec![response]).await
    }

    pub async fn append_many(&self, responses: Vec<SurveyResponse>) -> Result<usize, ServiceError> {
        let added = responses.len();
        let total = self
            .doc
            .update(move |doc| {
                doc.responses.extend(responses);
                Ok(doc.responses.len())
            })
            .await?;
        debug!(added, total, path = %self.doc.path().display(), "appended survey responses");
        Ok(total)
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.load_all().await?.len())
    }

    pub async fn clear(&self) -> Result<(), ServiceError> {
        self.replace_all(Vec::new()).await
    }
}

#[async_trait::async_trait]
impl ResponseRepository for ResponseStore {
    async fn list(&self) -> Result<Vec<SurveyResponse>, ServiceError> { self.load_all().await }
    async fn count(&self) -> Result<usize, ServiceError> { self.count().await }
    async fn append(&self, response: SurveyResponse) -> Result<usize, ServiceError> { self.append(response).await }
    async fn append_many(&self, responses: Vec<SurveyResponse>) -> Result<usize, ServiceError> { self.append_many(responses).await }
    async fn clear(&self) -> Result<(), ServiceError> { self.clear().await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record(ts: &str, q1: f64) -> SurveyResponse {
        match json!({"timestamp": ts, "q1": q1}) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn tmp_path() -> PathBuf {
        std::env::temp_dir().join(format!("svc_responses_{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn response_store_append_count_clear() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = ResponseStore::new(&tmp).await?;

        // initially empty
        assert_eq!(store.count().await?, 0);

        assert_eq!(store.append(record("t1", 0.1)).await?, 1);
        assert_eq!(store.append(record("t1", 0.1)).await?, 2);
        assert_eq!(store.append(record("t3", -0.3)).await?, 3);

        let all = store.load_all().await?;
        let stamps: Vec<_> = all.iter().map(|r| r["timestamp"].clone()).collect();
        assert_eq!(stamps, vec![json!("t1"), json!("t1"), json!("t3")]);

        store.clear().await?;
        assert_eq!(store.count().await?, 0);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn reopening_keeps_existing_responses() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = ResponseStore::new(&tmp).await?;
        store.append_many(vec![record("a", 1.0), record("b", 0.0)]).await?;
        drop(store);

        // reload store from disk to ensure persistence
        let store2 = ResponseStore::new(&tmp).await?;
        assert_eq!(store2.count().await?, 2);

        let raw: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&tmp).await?)?;
        assert_eq!(raw["responses"].as_array().map(Vec::len), Some(2));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn reads_see_out_of_band_edits() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = ResponseStore::new(&tmp).await?;
        store.append(record("a", 1.0)).await?;

        tokio::fs::write(&tmp, br#"{"responses":[]}"#).await?;
        assert_eq!(store.count().await?, 0);

        tokio::fs::write(&tmp, b"garbage").await?;
        assert!(matches!(store.load_all().await, Err(ServiceError::StorageRead(_))));
        assert!(store.append(record("b", 0.5)).await.is_err());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = ResponseStore::new(&tmp).await?;

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.append(record(&format!("t{i}"), 0.0)).await }));
        }
        for h in handles {
            h.await??;
        }
        assert_eq!(store.count().await?, 16);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_during_appends_never_see_partial_file() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = ResponseStore::new(&tmp).await?;
        let padding = "x".repeat(4096);

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..200 {
                    let mut r = record(&format!("t{i}"), 0.0);
                    r.insert("padding".into(), json!(padding));
                    store.append(r).await?;
                }
                Ok::<_, ServiceError>(())
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let n = store.count().await?;
            assert!(n >= last, "count went backwards: {last} -> {n}");
            last = n;
            tokio::task::yield_now().await;
        }
        writer.await??;
        assert_eq!(store.count().await?, 200);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn usable_through_trait_object() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let repo: Arc<dyn ResponseRepository> = ResponseStore::new(&tmp).await?;
        assert_eq!(repo.append(record("x", 0.2)).await?, 1);
        assert_eq!(repo.list().await?.len(), 1);
        repo.clear().await?;
        assert_eq!(repo.count().await?, 0);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
