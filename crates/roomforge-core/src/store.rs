//! Component C — thread-safe map of trackingId → {status, result} (spec §4.C).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Result, RuntimeError};
use crate::types::{JobState, JobStatus, TrackingId};

/// Concurrent job-result store. All mutation goes through this narrow API;
/// readers never observe a torn `(status, result)` pair because each
/// operation holds the write lock for its whole critical section.
#[derive(Clone, Default)]
pub struct JobResultStore {
    inner: Arc<RwLock<HashMap<TrackingId, JobState>>>,
}

impl JobResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `(QUEUED, nil)`. Duplicate keys should not occur given ruid
    /// uniqueness; if one does, the existing entry is overwritten.
    pub async fn register(&self, ruid: &TrackingId) {
        self.inner
            .write()
            .await
            .insert(ruid.clone(), JobState::queued());
    }

    /// Updates status only if the entry exists and is non-terminal;
    /// otherwise this is a silent no-op (spec §4.C).
    pub async fn update_status(&self, ruid: &TrackingId, status: JobStatus) {
        let mut guard = self.inner.write().await;
        if let Some(state) = guard.get_mut(ruid) {
            if !state.status.is_terminal() {
                state.status = status;
            }
        }
    }

    /// Writes a terminal result. Requires `final_status` to be a terminal
    /// status; overwrites any prior state unconditionally.
    pub async fn store_final(
        &self,
        ruid: &TrackingId,
        result: Value,
        final_status: JobStatus,
    ) -> Result<()> {
        if !final_status.is_terminal() {
            return Err(RuntimeError::InvalidState {
                ruid: ruid.clone(),
                reason: format!("{final_status:?} is not a terminal status"),
            });
        }
        self.inner.write().await.insert(
            ruid.clone(),
            JobState {
                status: final_status,
                result: Some(result),
            },
        );
        Ok(())
    }

    pub async fn get(&self, ruid: &TrackingId) -> Option<JobState> {
        self.inner.read().await.get(ruid).cloned()
    }

    pub async fn delete(&self, ruid: &TrackingId) {
        self.inner.write().await.remove(ruid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_get_is_queued() {
        let store = JobResultStore::new();
        let ruid = "room_aaaa".to_string();
        store.register(&ruid).await;
        let state = store.get(&ruid).await.unwrap();
        assert_eq!(state.status, JobStatus::Queued);
        assert!(state.result.is_none());
    }

    #[tokio::test]
    async fn update_status_ignored_after_terminal() {
        let store = JobResultStore::new();
        let ruid = "room_bbbb".to_string();
        store.register(&ruid).await;
        store
            .store_final(&ruid, serde_json::json!({"success": true}), JobStatus::Completed)
            .await
            .unwrap();
        store.update_status(&ruid, JobStatus::Processing).await;
        let state = store.get(&ruid).await.unwrap();
        assert_eq!(state.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn store_final_rejects_non_terminal() {
        let store = JobResultStore::new();
        let ruid = "room_cccc".to_string();
        store.register(&ruid).await;
        let err = store
            .store_final(&ruid, serde_json::json!({}), JobStatus::Processing)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = JobResultStore::new();
        let ruid = "room_dddd".to_string();
        store.register(&ruid).await;
        store.delete(&ruid).await;
        assert!(store.get(&ruid).await.is_none());
    }
}
