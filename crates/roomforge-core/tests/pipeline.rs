//! End-to-end coverage of the concrete scenarios from spec.md §8, driven
//! against stub `LlmClient`/`MeshClient` implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use roomforge_core::{
    ApiKeyRotator, CoreConfig, Difficulty, ExistingObject, JobStatus, LlmClient, MeshCallError,
    MeshClient, MeshTaskDriver, MeshTaskStatus, MeshTaskStatusKind, PipelineOrchestrator,
    PromptSet, QueueManager, RoomRequest,
};
use roomforge_core::clients::ModelUrls;
use roomforge_core::store::JobResultStore;

fn base_request(existing_objects: Vec<ExistingObject>) -> RoomRequest {
    RoomRequest {
        uuid: None,
        user_id: "u1".into(),
        theme: "haunted lab".into(),
        keywords: vec!["lantern".into()],
        difficulty: Difficulty::Normal,
        existing_objects,
        is_free_modeling: false,
    }
}

fn exit_door() -> ExistingObject {
    ExistingObject { name: "ExitDoor".into(), id: "e1".into() }
}

fn succeeded_status(fbx: &str) -> MeshTaskStatus {
    MeshTaskStatus {
        status: MeshTaskStatusKind::Succeeded,
        progress: 100,
        error: None,
        model_urls: Some(ModelUrls { fbx: Some(fbx.to_string()), ..Default::default() }),
        thumbnail_url: None,
    }
}

/// LLM stub returning a fixed scenario and echoing a deterministic scripts
/// map sized to the number of objects in the request.
struct ScenarioLlm {
    object_instructions: Value,
}

#[async_trait]
impl LlmClient for ScenarioLlm {
    async fn generate_scenario(&self, _prompt: &str, _input: Value) -> Option<Value> {
        Some(json!({
            "scenario_data": {
                "theme": "haunted lab",
                "description": "escape the lab",
                "escape_condition": "open the exit door",
                "puzzle_flow": "find lantern, unlock door",
            },
            "object_instructions": self.object_instructions,
        }))
    }

    async fn generate_scripts(&self, _prompt: &str, input: Value) -> Option<HashMap<String, String>> {
        let mut m = HashMap::new();
        let objects = input["objects"].as_array().cloned().unwrap_or_default();
        for obj in objects {
            let name = obj["name"].as_str().unwrap().to_string();
            m.insert(name, "YmFzZTY0".to_string());
        }
        Some(m)
    }
}

/// Mesh stub: per-object outcome selected by object name.
struct ScriptedMesh {
    fail_names: Vec<String>,
    slow_names: Vec<String>,
}

#[async_trait]
impl MeshClient for ScriptedMesh {
    async fn create_preview(&self, prompt: &str, _key: &str) -> Result<String, MeshCallError> {
        if self.slow_names.iter().any(|n| prompt.contains(n.as_str())) {
            tokio::time::sleep(Duration::from_secs(7200)).await;
        }
        if self.fail_names.iter().any(|n| prompt.contains(n.as_str())) {
            return Err(MeshCallError::ServerError("500".into()));
        }
        Ok(prompt.to_string())
    }

    async fn create_refine(&self, preview_id: &str, _key: &str) -> Result<String, MeshCallError> {
        Ok(format!("refine::{preview_id}"))
    }

    async fn get_status(&self, task_id: &str, _key: &str) -> Result<MeshTaskStatus, MeshCallError> {
        if let Some(prompt) = task_id.strip_prefix("refine::") {
            return Ok(succeeded_status(&format!("https://m/{prompt}.fbx")));
        }
        Ok(succeeded_status("https://m/unused.fbx"))
    }
}

fn object(name: &str, kind: &str) -> Value {
    json!({"name": name, "type": kind, "visual_description": format!("a {name}")})
}

fn orchestrator(
    scenario_objects: Value,
    fail_names: Vec<String>,
    slow_names: Vec<String>,
) -> Arc<PipelineOrchestrator<ScenarioLlm, ScriptedMesh>> {
    let keys = Arc::new(ApiKeyRotator::new(vec!["k1".into()]));
    let mesh_client = Arc::new(ScriptedMesh { fail_names, slow_names });
    let driver = Arc::new(MeshTaskDriver::new(mesh_client, keys));
    let llm = Arc::new(ScenarioLlm { object_instructions: scenario_objects });
    Arc::new(PipelineOrchestrator::new(llm, driver, PromptSet::default(), 10))
}

#[tokio::test]
async fn scenario_1_minimal_happy_path() {
    let objects = json!([
        object("GameManager", "game_manager"),
        object("Lantern", "interactive_object"),
    ]);
    let orch = orchestrator(objects, vec![], vec![]);
    let request = base_request(vec![exit_door()]);
    let bundle = orch.create_room(&request, &"room_1111111111111111".to_string()).await;

    assert_eq!(bundle["success"], json!(true));
    assert!(bundle["scripts"]["GameManager.cs"].is_string());
    assert!(bundle["scripts"]["Lantern.cs"].is_string());
    assert_eq!(bundle["model_tracking"]["Lantern"], json!("https://m/a Lantern.fbx"));
    assert!(bundle["model_tracking"].get("failed_models").is_none());
}

#[tokio::test]
async fn scenario_2_exit_door_missing() {
    let objects = json!([object("GameManager", "game_manager")]);
    let orch = orchestrator(objects, vec![], vec![]);
    let request = base_request(vec![]);
    let bundle = orch.create_room(&request, &"room_2222222222222222".to_string()).await;

    assert_eq!(bundle["success"], json!(false));
    assert!(bundle["error"].as_str().unwrap().contains("ExitDoor"));
    assert!(bundle.get("scripts").is_none());
}

#[tokio::test]
async fn scenario_3_partial_model_failure() {
    let objects = json!([
        object("GameManager", "game_manager"),
        object("ObjA", "interactive_object"),
        object("ObjB", "interactive_object"),
        object("ObjC", "interactive_object"),
    ]);
    let orch = orchestrator(objects, vec!["ObjC".to_string()], vec![]);
    let request = base_request(vec![exit_door()]);
    let bundle = orch.create_room(&request, &"room_3333333333333333".to_string()).await;

    assert_eq!(bundle["success"], json!(true));
    let tracking = bundle["model_tracking"].as_object().unwrap();
    assert!(tracking.contains_key("ObjA"));
    assert!(tracking.contains_key("ObjB"));
    let failed = tracking["failed_models"].as_object().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed["ObjC"].as_str().unwrap().starts_with("error-"));
}

#[tokio::test]
async fn scenario_4_batched_scripts() {
    let mut objects = vec![object("GameManager", "game_manager")];
    for i in 0..12 {
        objects.push(object(&format!("Obj{i}"), "interactive_object"));
    }
    let orch = orchestrator(json!(objects), vec![], vec![]);
    let request = base_request(vec![exit_door()]);
    let bundle = orch.create_room(&request, &"room_4444444444444444".to_string()).await;

    assert_eq!(bundle["success"], json!(true));
    let scripts = bundle["scripts"].as_object().unwrap();
    assert!(scripts.len() >= 13);
    assert!(scripts.contains_key("GameManager.cs"));
}

#[tokio::test(start_paused = true)]
async fn scenario_5_model_timeout() {
    let objects = json!([
        object("GameManager", "game_manager"),
        object("FastObj", "interactive_object"),
        object("SlowObj", "interactive_object"),
    ]);
    let orch = orchestrator(objects, vec![], vec!["SlowObj".to_string()]);
    let request = base_request(vec![exit_door()]);
    let bundle = orch.create_room(&request, &"room_5555555555555555".to_string()).await;

    assert_eq!(bundle["success"], json!(true));
    let tracking = bundle["model_tracking"].as_object().unwrap();
    assert!(tracking.contains_key("FastObj"));
    let failed = tracking["failed_models"].as_object().unwrap();
    assert!(failed["SlowObj"].as_str().unwrap().starts_with("timeout-"));
}

#[tokio::test]
async fn scenario_6_queue_fifo_respects_max_concurrent() {
    let objects = json!([object("GameManager", "game_manager")]);
    let order = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));

    struct OrderTrackingLlm {
        inner: ScenarioLlm,
        order: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LlmClient for OrderTrackingLlm {
        async fn generate_scenario(&self, prompt: &str, input: Value) -> Option<Value> {
            let ruid = input["ruid"].as_str().unwrap_or("").to_string();
            self.order.lock().unwrap().push(format!("start-{ruid}"));
            tokio::time::sleep(Duration::from_millis(30)).await;
            let result = self.inner.generate_scenario(prompt, input).await;
            self.order.lock().unwrap().push(format!("end-{ruid}"));
            result
        }

        async fn generate_scripts(&self, prompt: &str, input: Value) -> Option<HashMap<String, String>> {
            self.inner.generate_scripts(prompt, input).await
        }
    }

    let keys = Arc::new(ApiKeyRotator::new(vec!["k1".into()]));
    let mesh_client = Arc::new(ScriptedMesh { fail_names: vec![], slow_names: vec![] });
    let driver = Arc::new(MeshTaskDriver::new(mesh_client, keys));
    let llm = Arc::new(OrderTrackingLlm {
        inner: ScenarioLlm { object_instructions: objects },
        order: order.clone(),
    });
    let orchestrator = Arc::new(PipelineOrchestrator::new(llm, driver, PromptSet::default(), 10));

    let mut config = CoreConfig::default();
    config.n_workers = 1;
    let store = JobResultStore::new();
    let manager = QueueManager::new(config, store.clone(), orchestrator);

    let ruid_a = manager.submit(base_request(vec![exit_door()])).await.unwrap();
    let ruid_b = manager.submit(base_request(vec![exit_door()])).await.unwrap();

    for _ in 0..200 {
        if let (Some(a), Some(b)) = (store.get(&ruid_a).await, store.get(&ruid_b).await) {
            if a.status.is_terminal() && b.status.is_terminal() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let seq = order.lock().unwrap().clone();
    let a_end = seq.iter().position(|s| s == &format!("end-{ruid_a}")).unwrap();
    let b_start = seq.iter().position(|s| s == &format!("start-{ruid_b}")).unwrap();
    assert!(a_end < b_start, "job B must not start before job A finishes with maxConcurrent=1: {seq:?}");
    assert_eq!(JobStatus::Completed, store.get(&ruid_a).await.unwrap().status);
}
