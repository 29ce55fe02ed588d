//! Component D — per-job staged coordinator (spec §4.D).
//!
//! `create_room` never propagates an error: every stage failure is folded
//! into a well-formed error bundle and returned as `Ok`, matching the
//! "all exceptions caught at the outer boundary" policy of spec §7.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::{LlmClient, MeshClient};
use crate::config::{PromptSet, MODEL_TIMEOUT, PARALLEL_THRESHOLD};
use crate::mesh::MeshTaskDriver;
use crate::scripts::ScriptBatcher;
use crate::types::{error_bundle, RoomRequest, Scenario, TrackingId, TrackingResult};
use crate::validate::{RequestValidator, ScenarioValidator};

pub struct PipelineOrchestrator<L: LlmClient + 'static, M: MeshClient + 'static> {
    llm: Arc<L>,
    mesh_driver: Arc<MeshTaskDriver<M>>,
    prompts: PromptSet,
    /// Bounds Stage 3/Stage 4 fan-out (model generation + batched scripts) to
    /// `mesh_worker_concurrency` concurrent provider calls (spec §5).
    fanout: Arc<tokio::sync::Semaphore>,
}

impl<L: LlmClient + 'static, M: MeshClient + 'static> PipelineOrchestrator<L, M> {
    pub fn new(
        llm: Arc<L>,
        mesh_driver: Arc<MeshTaskDriver<M>>,
        prompts: PromptSet,
        mesh_worker_concurrency: usize,
    ) -> Self {
        let fanout = Arc::new(tokio::sync::Semaphore::new(mesh_worker_concurrency.max(1)));
        Self { llm, mesh_driver, prompts, fanout }
    }

    /// Runs all six stages for one job and returns the final bundle JSON.
    pub async fn create_room(&self, request: &RoomRequest, ruid: &TrackingId) -> Value {
        let uuid = request
            .uuid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        // Stage 1 — Validate
        if let Err(e) = RequestValidator::validate(request) {
            return error_bundle(&uuid, ruid, e.to_string());
        }

        // Stage 2 — Scenario generation
        let scenario = match self.generate_scenario(request, &uuid, ruid).await {
            Ok(s) => s,
            Err(bundle) => return bundle,
        };

        // Stage 3 — Kick off model generation (non-blocking)
        let model_handles = self.spawn_model_tasks(&scenario, request.is_free_modeling);

        // Stage 4 — Script generation (blocks Stage 5)
        let scripts = match self.generate_scripts(&scenario).await {
            Ok(s) if !s.is_empty() => s,
            Ok(_) => return error_bundle(&uuid, ruid, "script generation returned no scripts"),
            Err(e) => return error_bundle(&uuid, ruid, e.to_string()),
        };

        // Stage 5 — Join models
        let tracking = self.join_models(model_handles).await;

        // Stage 6 — Bundle
        self.assemble_bundle(request, &uuid, ruid, &scenario, scripts, tracking)
    }

    async fn generate_scenario(
        &self,
        request: &RoomRequest,
        uuid: &str,
        ruid: &str,
    ) -> Result<Scenario, Value> {
        let input = json!({
            "uuid": uuid,
            "ruid": ruid,
            "theme": request.theme,
            "difficulty": request.difficulty.as_str(),
            "keywords": request.keywords,
            "existing_objects": request.existing_objects,
            "existing_objects_count": request.existing_objects.len(),
            "is_free_modeling": request.is_free_modeling,
        });

        let raw = self
            .llm
            .generate_scenario(&self.prompts.scenario, input)
            .await
            .ok_or_else(|| error_bundle(uuid, ruid, "scenario generation failed"))?;

        let scenario: Scenario = serde_json::from_value(raw)
            .map_err(|e| error_bundle(uuid, ruid, format!("malformed scenario: {e}")))?;

        ScenarioValidator::validate(&scenario).map_err(|e| error_bundle(uuid, ruid, e.to_string()))?;

        Ok(scenario)
    }

    fn spawn_model_tasks(
        &self,
        scenario: &Scenario,
        is_free_modeling: bool,
    ) -> Vec<(String, JoinHandle<String>)> {
        let mut handles = Vec::new();
        for (index, instruction) in scenario.object_instructions.iter().enumerate() {
            if !instruction.qualifies_for_model_generation() {
                continue;
            }
            let Some(desc) = instruction.description_for(is_free_modeling) else {
                continue;
            };
            let driver = self.mesh_driver.clone();
            let prompt = desc.to_string();
            let name = instruction.name.clone();
            let permit = self.fanout.clone();
            let handle = tokio::spawn({
                let name = name.clone();
                async move {
                    let _permit = permit.acquire_owned().await;
                    driver.generate_model(&prompt, &name, index).await
                }
            });
            handles.push((name, handle));
        }
        handles
    }

    async fn generate_scripts(&self, scenario: &Scenario) -> Result<HashMap<String, String>, crate::error::RuntimeError> {
        if scenario.object_instructions.len() < PARALLEL_THRESHOLD {
            let input = json!({
                "is_first_batch": true,
                "objects": scenario.object_instructions,
                "scenario": scenario,
            });
            self.llm
                .generate_scripts(&self.prompts.unified_scripts, input)
                .await
                .ok_or_else(|| crate::error::RuntimeError::upstream("script generation failed"))
        } else {
            let batcher = ScriptBatcher::new(self.llm.as_ref(), &self.prompts.scripts_batch, self.fanout.clone());
            batcher.run(scenario).await
        }
    }

    async fn join_models(&self, handles: Vec<(String, JoinHandle<String>)>) -> TrackingResult {
        let mut tracking = TrackingResult::default();
        let mut names: Vec<String> = handles.iter().map(|(n, _)| n.clone()).collect();
        let mut futs: Vec<JoinHandle<String>> = handles.into_iter().map(|(_, h)| h).collect();

        let deadline = tokio::time::sleep(MODEL_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            if futs.is_empty() {
                break;
            }
            tokio::select! {
                _ = &mut deadline => {
                    let now_ts = chrono::Utc::now().timestamp();
                    for (i, (name, handle)) in names.into_iter().zip(futs.into_iter()).enumerate() {
                        if handle.is_finished() {
                            let value = handle.await.unwrap_or_else(|_| String::new());
                            tracking.record(name, value, now_ts);
                        } else {
                            handle.abort();
                            tracking.record(name, format!("timeout-{i}-{now_ts}"), now_ts);
                        }
                    }
                    return tracking;
                }
                (result, idx, remaining) = futures::future::select_all(futs) => {
                    let name = names.remove(idx);
                    let now_ts = chrono::Utc::now().timestamp();
                    let value = result.unwrap_or_else(|e| {
                        warn!("model task for {name} panicked: {e}");
                        String::new()
                    });
                    tracking.record(name, value, now_ts);
                    futs = remaining;
                }
            }
        }
        tracking
    }

    fn assemble_bundle(
        &self,
        request: &RoomRequest,
        uuid: &str,
        ruid: &str,
        scenario: &Scenario,
        scripts: HashMap<String, String>,
        tracking: TrackingResult,
    ) -> Value {
        let scripts: HashMap<String, String> = scripts
            .into_iter()
            .map(|(name, content)| {
                let name = if name.ends_with(".cs") { name } else { format!("{name}.cs") };
                (name, content)
            })
            .collect();

        let mut model_tracking = json!(tracking.tracking);
        if !tracking.failed_models.is_empty() {
            model_tracking["failed_models"] = json!(tracking.failed_models);
        }

        info!(ruid, "bundle assembled: {} scripts, {} tracked models", scripts.len(), tracking.tracking.len());

        json!({
            "uuid": uuid,
            "ruid": ruid,
            "theme": request.theme,
            "difficulty": request.difficulty.as_str(),
            "keywords": request.keywords,
            "scenario": scenario,
            "scripts": scripts,
            "model_tracking": model_tracking,
            "success": true,
            "timestamp": chrono::Utc::now().timestamp(),
        })
    }
}
