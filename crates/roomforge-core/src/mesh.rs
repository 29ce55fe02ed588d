//! Component B — drives the mesh provider's two-phase preview→refine
//! protocol for a single object (spec §4.B).

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::clients::{MeshCallError, MeshClient, MeshTaskStatusKind};
use crate::keys::ApiKeyRotator;

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_PREVIEW_POLLS: u32 = 30;
const MAX_REFINE_POLLS: u32 = 30;

/// Fixed preview-stage parameters (spec §4.B). Exposed for the server crate
/// to serialize into the provider's request body.
pub const PREVIEW_ART_STYLE: &str = "realistic";
pub const PREVIEW_AI_MODEL: &str = "meshy-4";
pub const PREVIEW_TOPOLOGY: &str = "triangle";
pub const PREVIEW_TARGET_POLYCOUNT: u32 = 4096;
pub const PREVIEW_SHOULD_REMESH: bool = false;
pub const REFINE_ENABLE_PBR: bool = false;
pub const REFINE_TARGET_POLYCOUNT: u32 = 4096;

/// Drives one object through preview→refine. `generate_model` always
/// returns — never propagates an error — per spec §4.B's "always returns;
/// never throws" contract: errors are encoded as typed tag strings.
pub struct MeshTaskDriver<C: MeshClient> {
    client: Arc<C>,
    keys: Arc<ApiKeyRotator>,
}

impl<C: MeshClient> MeshTaskDriver<C> {
    pub fn new(client: Arc<C>, keys: Arc<ApiKeyRotator>) -> Self {
        Self { client, keys }
    }

    /// Runs the full two-phase protocol for `object_name` and returns either
    /// an fbx URL or a typed error/timeout tag. `attempt_index` is folded
    /// into timeout tags to disambiguate concurrent fan-out members.
    pub async fn generate_model(&self, prompt: &str, object_name: &str, attempt_index: usize) -> String {
        let _ = object_name;
        let preview_id = match self.create_with_retry("preview", |key| {
            let client = &self.client;
            let prompt = prompt.to_string();
            let key = key.to_string();
            async move { client.create_preview(&prompt, &key).await }
        })
        .await
        {
            Ok(id) => id,
            Err(tag) => return tag,
        };

        let preview_status = self.poll_until_terminal("preview", &preview_id, MAX_PREVIEW_POLLS).await;
        if let Err(tag) = preview_status {
            return tag;
        }

        let refine_id = match self.create_with_retry("refine", |key| {
            let client = &self.client;
            let preview_id = preview_id.clone();
            let key = key.to_string();
            async move { client.create_refine(&preview_id, &key).await }
        })
        .await
        {
            Ok(id) => id,
            Err(tag) => return tag,
        };

        match self.poll_refine_to_fbx(&refine_id, attempt_index).await {
            Ok(fbx) => fbx,
            Err(tag) => tag,
        }
    }

    /// Retries a creation call (preview or refine) across up to
    /// `max(1, keys.count())` provider keys on transient failure.
    async fn create_with_retry<F, Fut>(&self, stage: &str, mut call: F) -> Result<String, String>
    where
        F: FnMut(&str) -> Fut,
        Fut: std::future::Future<Output = Result<String, MeshCallError>>,
    {
        let attempts = self.keys.count().max(1);
        let mut last_err = String::from("no keys configured");
        for _ in 0..attempts {
            let key = self.keys.next();
            match call(&key).await {
                Ok(id) => return Ok(id),
                Err(e) if e.is_transient() => {
                    last_err = e.message().to_string();
                    continue;
                }
                Err(e) => return Err(format!("error-{stage}-{}", tag_uuid(&e.message().to_string()))),
            }
        }
        Err(format!("error-{stage}-{}", tag_uuid(&last_err)))
    }

    /// Polls `get_status` until a terminal status or `max_polls` is
    /// exhausted. Key rotation within one status call does not consume a
    /// poll slot (spec §4.B).
    async fn poll_until_terminal(&self, stage: &str, task_id: &str, max_polls: u32) -> Result<(), String> {
        for _poll in 0..max_polls {
            match self.status_with_retry(task_id).await {
                Ok(status) => match status.status {
                    MeshTaskStatusKind::Succeeded => return Ok(()),
                    MeshTaskStatusKind::Failed | MeshTaskStatusKind::Canceled => {
                        return Err(format!("error-{stage}-{}", tag_uuid(task_id)));
                    }
                    MeshTaskStatusKind::Pending | MeshTaskStatusKind::Running => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                },
                Err(tag) => return Err(format!("error-{stage}-{tag}")),
            }
        }
        Err(format!("timeout-{stage}-{task_id}"))
    }

    /// Same polling loop as [`Self::poll_until_terminal`] but for the refine
    /// phase, extracting the fbx URL on success.
    async fn poll_refine_to_fbx(&self, refine_id: &str, attempt_index: usize) -> Result<String, String> {
        for _poll in 0..MAX_REFINE_POLLS {
            match self.status_with_retry(refine_id).await {
                Ok(status) => match status.status {
                    MeshTaskStatusKind::Succeeded => {
                        return match status.model_urls.and_then(|u| u.fbx) {
                            Some(fbx) => Ok(fbx),
                            None => Err(format!("error-no-fbx-{refine_id}")),
                        };
                    }
                    MeshTaskStatusKind::Failed | MeshTaskStatusKind::Canceled => {
                        return Err(format!("error-refine-{}", tag_uuid(refine_id)));
                    }
                    MeshTaskStatusKind::Pending | MeshTaskStatusKind::Running => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                },
                Err(tag) => return Err(format!("error-refine-{tag}")),
            }
        }
        Err(format!("timeout-refine-{attempt_index}-{refine_id}"))
    }

    async fn status_with_retry(&self, task_id: &str) -> Result<crate::clients::MeshTaskStatus, String> {
        let attempts = self.keys.count().max(1);
        let mut last_err = String::from("no keys configured");
        for _ in 0..attempts {
            let key = self.keys.next();
            match self.client.get_status(task_id, &key).await {
                Ok(status) => return Ok(status),
                Err(e) if e.is_transient() => {
                    last_err = e.message().to_string();
                    continue;
                }
                Err(e) => return Err(tag_uuid(&e.message().to_string())),
            }
        }
        Err(tag_uuid(&last_err))
    }
}

fn tag_uuid(_seed: &str) -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MeshTaskStatus, ModelUrls};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient {
        preview_polls: AtomicUsize,
        refine_polls: AtomicUsize,
        fail_status: bool,
    }

    #[async_trait::async_trait]
    impl MeshClient for StubClient {
        async fn create_preview(&self, _prompt: &str, _key: &str) -> Result<String, MeshCallError> {
            Ok("preview-1".into())
        }

        async fn create_refine(&self, _preview_id: &str, _key: &str) -> Result<String, MeshCallError> {
            Ok("refine-1".into())
        }

        async fn get_status(&self, task_id: &str, _key: &str) -> Result<MeshTaskStatus, MeshCallError> {
            if self.fail_status {
                return Ok(MeshTaskStatus {
                    status: MeshTaskStatusKind::Failed,
                    progress: 0,
                    error: Some("boom".into()),
                    model_urls: None,
                    thumbnail_url: None,
                });
            }
            if task_id == "preview-1" {
                self.preview_polls.fetch_add(1, Ordering::Relaxed);
                return Ok(MeshTaskStatus {
                    status: MeshTaskStatusKind::Succeeded,
                    progress: 100,
                    error: None,
                    model_urls: None,
                    thumbnail_url: None,
                });
            }
            self.refine_polls.fetch_add(1, Ordering::Relaxed);
            Ok(MeshTaskStatus {
                status: MeshTaskStatusKind::Succeeded,
                progress: 100,
                error: None,
                model_urls: Some(ModelUrls {
                    fbx: Some("https://m/obj.fbx".into()),
                    ..Default::default()
                }),
                thumbnail_url: None,
            })
        }
    }

    #[tokio::test]
    async fn happy_path_returns_fbx_url() {
        let client = Arc::new(StubClient {
            preview_polls: AtomicUsize::new(0),
            refine_polls: AtomicUsize::new(0),
            fail_status: false,
        });
        let keys = Arc::new(ApiKeyRotator::new(vec!["k1".into()]));
        let driver = MeshTaskDriver::new(client, keys);
        let result = driver.generate_model("a lantern", "Lantern", 0).await;
        assert_eq!(result, "https://m/obj.fbx");
    }

    #[tokio::test]
    async fn failed_status_yields_error_tag() {
        let client = Arc::new(StubClient {
            preview_polls: AtomicUsize::new(0),
            refine_polls: AtomicUsize::new(0),
            fail_status: true,
        });
        let keys = Arc::new(ApiKeyRotator::new(vec!["k1".into()]));
        let driver = MeshTaskDriver::new(client, keys);
        let result = driver.generate_model("a lantern", "Lantern", 0).await;
        assert!(result.starts_with("error-"));
    }
}
