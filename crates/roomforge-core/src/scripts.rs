//! Component F — splits an object set into a serial first batch plus
//! parallel remainder batches for gameplay script generation (spec §4.F).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::clients::LlmClient;
use crate::config::{BATCH_SIZE, FIRST_BATCH_SIZE, SCRIPT_TIMEOUT};
use crate::error::{Result, RuntimeError};
use crate::types::{ObjectInstruction, ObjectType, Scenario};

pub struct ScriptBatcher<'a, C: LlmClient> {
    pub client: &'a C,
    pub prompt: &'a str,
    /// Shared with [`crate::orchestrator::PipelineOrchestrator`]'s model
    /// fan-out so both Stage 3 and Stage 4 respect the same concurrency cap.
    fanout: Arc<Semaphore>,
}

impl<'a, C: LlmClient> ScriptBatcher<'a, C> {
    pub fn new(client: &'a C, prompt: &'a str, fanout: Arc<Semaphore>) -> Self {
        Self { client, prompt, fanout }
    }

    /// Runs the full two-phase batching strategy and returns the merged
    /// `{scriptName → base64 content}` map. Fails only if Phase 1 does not
    /// produce a `GameManager` entry (spec §4.F).
    pub async fn run(&self, scenario: &Scenario) -> Result<HashMap<String, String>> {
        let instructions = &scenario.object_instructions;
        let (game_managers, others): (Vec<&ObjectInstruction>, Vec<&ObjectInstruction>) = instructions
            .iter()
            .partition(|i| i.kind == ObjectType::GameManager);

        let first_count = FIRST_BATCH_SIZE.min(others.len());
        let first_others = &others[..first_count];
        let remaining = &others[first_count..];

        let first_batch: Vec<&ObjectInstruction> =
            game_managers.iter().copied().chain(first_others.iter().copied()).collect();

        let mut merged = self.call_first_batch(&first_batch, scenario).await?;
        if !merged.contains_key("GameManager") {
            return Err(RuntimeError::validation(
                "first script batch did not include a GameManager entry",
            ));
        }
        let game_manager_script = merged.get("GameManager").cloned().unwrap_or_default();

        if remaining.is_empty() {
            return Ok(merged);
        }

        let chunks: Vec<(usize, Vec<&ObjectInstruction>)> = remaining
            .chunks(BATCH_SIZE)
            .enumerate()
            .map(|(i, chunk)| (first_count + i * BATCH_SIZE, chunk.to_vec()))
            .collect();

        let fut = async {
            let calls = chunks.into_iter().map(|(start_index, batch)| {
                self.call_remaining_batch(&batch, scenario, &game_manager_script, start_index)
            });
            futures::future::join_all(calls).await
        };

        let results = match tokio::time::timeout(SCRIPT_TIMEOUT, fut).await {
            Ok(results) => results,
            Err(_) => return Err(RuntimeError::Timeout("script batch deadline exceeded".into())),
        };

        for result in results {
            match result {
                Ok(map) => merged.extend(map),
                Err(e) => warn!("script batch failed: {e}"),
            }
        }

        Ok(merged)
    }

    async fn call_first_batch(
        &self,
        batch: &[&ObjectInstruction],
        scenario: &Scenario,
    ) -> Result<HashMap<String, String>> {
        let input = json!({
            "is_first_batch": true,
            "objects": batch,
            "scenario": scenario,
        });
        self.client
            .generate_scripts(self.prompt, input)
            .await
            .ok_or_else(|| RuntimeError::upstream("first script batch returned no result"))
    }

    async fn call_remaining_batch(
        &self,
        batch: &[&ObjectInstruction],
        scenario: &Scenario,
        game_manager_script: &str,
        start_index: usize,
    ) -> std::result::Result<HashMap<String, String>, String> {
        let names: Vec<&str> = batch.iter().map(|o| o.name.as_str()).collect();
        let scales: Value = scenario
            .model_scales
            .as_ref()
            .map(|m| {
                json!(m
                    .iter()
                    .filter(|(k, _)| names.contains(&k.as_str()))
                    .collect::<HashMap<_, _>>())
            })
            .unwrap_or_else(|| json!({}));

        let input = json!({
            "is_first_batch": false,
            "objects": batch,
            "scenario": scenario,
            "game_manager_script": game_manager_script,
            "batch_index": start_index,
            "model_scales": scales,
        });

        let _permit = self.fanout.acquire().await;
        let result = self
            .client
            .generate_scripts(self.prompt, input)
            .await
            .ok_or_else(|| "batch returned no result".to_string())?;

        if result.len() < batch.len() {
            let missing: Vec<&str> = batch
                .iter()
                .map(|o| o.name.as_str())
                .filter(|n| !result.contains_key(*n))
                .collect();
            warn!("script batch at index {start_index} missing entries for: {missing:?}");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScenarioData;
    use std::sync::Mutex;

    struct StubClient {
        calls: Mutex<Vec<Value>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for StubClient {
        async fn generate_scenario(&self, _prompt: &str, _input: Value) -> Option<Value> {
            None
        }

        async fn generate_scripts(&self, _prompt: &str, input: Value) -> Option<HashMap<String, String>> {
            self.calls.lock().unwrap().push(input.clone());
            let is_first = input["is_first_batch"].as_bool().unwrap_or(false);
            if is_first {
                let mut m = HashMap::new();
                m.insert("GameManager".to_string(), "Z2FtZQ==".to_string());
                for obj in input["objects"].as_array().unwrap() {
                    let name = obj["name"].as_str().unwrap();
                    if name != "GameManager" {
                        m.insert(name.to_string(), "b2JqZWN0".to_string());
                    }
                }
                Some(m)
            } else {
                let mut m = HashMap::new();
                for obj in input["objects"].as_array().unwrap() {
                    let name = obj["name"].as_str().unwrap();
                    m.insert(name.to_string(), "b2JqZWN0".to_string());
                }
                Some(m)
            }
        }
    }

    fn instruction(name: &str, kind: ObjectType) -> ObjectInstruction {
        ObjectInstruction {
            name: name.to_string(),
            kind,
            visual_description: Some("desc".into()),
            simple_visual_description: None,
        }
    }

    fn scenario_with(n_objects: usize) -> Scenario {
        let mut instructions = vec![instruction("GameManager", ObjectType::GameManager)];
        for i in 0..n_objects {
            instructions.push(instruction(&format!("Obj{i}"), ObjectType::InteractiveObject));
        }
        Scenario {
            scenario_data: ScenarioData {
                theme: "t".into(),
                description: "d".into(),
                escape_condition: "e".into(),
                puzzle_flow: "p".into(),
            },
            object_instructions: instructions,
            model_scales: None,
        }
    }

    #[tokio::test]
    async fn small_set_fits_in_first_batch() {
        let client = StubClient { calls: Mutex::new(vec![]) };
        let batcher = ScriptBatcher::new(&client, "prompt", Arc::new(Semaphore::new(10)));
        let scenario = scenario_with(3);
        let result = batcher.run(&scenario).await.unwrap();
        assert!(result.contains_key("GameManager"));
        assert_eq!(result.len(), 4);
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn large_set_splits_into_remaining_batches() {
        let client = StubClient { calls: Mutex::new(vec![]) };
        let batcher = ScriptBatcher::new(&client, "prompt", Arc::new(Semaphore::new(10)));
        let scenario = scenario_with(12);
        let result = batcher.run(&scenario).await.unwrap();
        assert!(result.len() >= 13);
        assert!(client.calls.lock().unwrap().len() > 1);
    }
}
