//! `reqwest`-backed [`MeshClient`] against a Meshy-style two-phase
//! preview/refine 3D generation API (spec §4.B).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roomforge_core::clients::{MeshCallError, MeshTaskStatus, MeshTaskStatusKind, ModelUrls};
use roomforge_core::mesh::{
    PREVIEW_AI_MODEL, PREVIEW_ART_STYLE, PREVIEW_SHOULD_REMESH, PREVIEW_TARGET_POLYCOUNT,
    PREVIEW_TOPOLOGY, REFINE_ENABLE_PBR, REFINE_TARGET_POLYCOUNT,
};
use roomforge_core::MeshClient;
use serde_json::Value;

pub struct HttpMeshClient {
    client: Client,
    base_url: String,
}

impl HttpMeshClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("roomforge-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// Classifies a non-success HTTP status the way spec §4.B's retry
    /// policy requires: auth/rate-limit and any other 5xx are retryable
    /// with a rotated key, any other 4xx is fatal for this call.
    fn classify_status(status: StatusCode, body: &str) -> MeshCallError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                MeshCallError::Transient(format!("{status}: {body}"))
            }
            s if s.is_server_error() => MeshCallError::ServerError(format!("{status}: {body}")),
            _ => MeshCallError::Fatal(format!("{status}: {body}")),
        }
    }

    async fn post_task(&self, path: &str, key: &str, body: Value) -> Result<String, MeshCallError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MeshCallError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text));
        }

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| MeshCallError::Transient(format!("unparseable body: {e}")))?;

        parsed
            .get("result")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| MeshCallError::Transient("missing `result` task id".to_string()))
    }
}

#[async_trait]
impl MeshClient for HttpMeshClient {
    async fn create_preview(&self, prompt: &str, key: &str) -> Result<String, MeshCallError> {
        let body = serde_json::json!({
            "mode": "preview",
            "prompt": prompt,
            "art_style": PREVIEW_ART_STYLE,
            "ai_model": PREVIEW_AI_MODEL,
            "topology": PREVIEW_TOPOLOGY,
            "target_polycount": PREVIEW_TARGET_POLYCOUNT,
            "should_remesh": PREVIEW_SHOULD_REMESH,
        });
        self.post_task("/openapi/v2/text-to-3d", key, body).await
    }

    async fn create_refine(&self, preview_id: &str, key: &str) -> Result<String, MeshCallError> {
        let body = serde_json::json!({
            "mode": "refine",
            "preview_task_id": preview_id,
            "enable_pbr": REFINE_ENABLE_PBR,
            "target_polycount": REFINE_TARGET_POLYCOUNT,
        });
        self.post_task("/openapi/v2/text-to-3d", key, body).await
    }

    async fn get_status(&self, task_id: &str, key: &str) -> Result<MeshTaskStatus, MeshCallError> {
        let resp = self
            .client
            .get(format!("{}/openapi/v2/text-to-3d/{task_id}", self.base_url))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| MeshCallError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text));
        }

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| MeshCallError::Transient(format!("unparseable body: {e}")))?;

        parse_task_status(&parsed)
    }
}

fn parse_task_status(parsed: &Value) -> Result<MeshTaskStatus, MeshCallError> {
    let status = match parsed.get("status").and_then(|v| v.as_str()) {
        Some("PENDING") | Some("IN_QUEUE") => MeshTaskStatusKind::Pending,
        Some("IN_PROGRESS") => MeshTaskStatusKind::Running,
        Some("SUCCEEDED") => MeshTaskStatusKind::Succeeded,
        Some("FAILED") => MeshTaskStatusKind::Failed,
        Some("CANCELED") => MeshTaskStatusKind::Canceled,
        other => {
            return Err(MeshCallError::Transient(format!(
                "unrecognised status field: {other:?}"
            )))
        }
    };

    let model_urls = parsed.get("model_urls").map(|urls| ModelUrls {
        fbx: urls.get("fbx").and_then(|v| v.as_str()).map(str::to_string),
        glb: urls.get("glb").and_then(|v| v.as_str()).map(str::to_string),
        obj: urls.get("obj").and_then(|v| v.as_str()).map(str::to_string),
        mtl: urls.get("mtl").and_then(|v| v.as_str()).map(str::to_string),
        usdz: urls.get("usdz").and_then(|v| v.as_str()).map(str::to_string),
    });

    Ok(MeshTaskStatus {
        status,
        progress: parsed.get("progress").and_then(|v| v.as_u64()).unwrap_or(0) as u8,
        error: parsed
            .get("task_error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string),
        model_urls,
        thumbnail_url: parsed
            .get("thumbnail_url")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}
