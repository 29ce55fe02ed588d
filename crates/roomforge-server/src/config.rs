//! Server configuration, loaded from environment variables at startup.

use roomforge_core::PromptSet;

/// Runtime configuration for roomforge-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set, except the provider API keys,
/// which have no safe default.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Bounded job-queue capacity (spec §4.E).
    pub queue_capacity: usize,

    /// Number of worker tasks processing the job queue (spec §4.E).
    pub n_workers: usize,

    /// Concurrency allowed for internal mesh/script fan-out (spec §5).
    pub mesh_worker_concurrency: usize,

    /// When `true`, serve the Swagger UI at `/swagger-ui` and the OpenAPI
    /// spec at `/api-docs/openapi.json`.
    pub enable_swagger: bool,

    /// Comma-separated list of allowed CORS origins. `None` means allow all.
    pub cors_allowed_origins: Option<String>,

    /// Optional bearer token required for `/queue/status`. `None` disables
    /// the check.
    pub admin_api_token: Option<String>,

    /// Anthropic-style LLM provider API key.
    pub anthropic_api_key: Option<String>,

    /// Mesh provider API keys, loaded from `MESHY_API_KEY`,
    /// `MESHY_API_KEY_2` .. `MESHY_API_KEY_10` (spec §6).
    pub mesh_api_keys: Vec<String>,

    /// Base URL for the LLM provider.
    pub llm_base_url: String,

    /// Base URL for the mesh provider.
    pub mesh_base_url: String,

    /// Prompt templates retrieved opaquely by name (spec §6).
    pub prompts: PromptSet,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to
    /// defaults, and load the prompt document from
    /// `ROOMFORGE_PROMPTS_FILE` (default `prompts.toml`).
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("ROOMFORGE_BIND", "0.0.0.0:3000"),
            log_level: env_or("ROOMFORGE_LOG", "info"),
            log_json: std::env::var("ROOMFORGE_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            queue_capacity: parse_env("ROOMFORGE_QUEUE_CAPACITY", 256),
            n_workers: parse_env("ROOMFORGE_WORKERS", 4),
            mesh_worker_concurrency: parse_env("ROOMFORGE_MESH_CONCURRENCY", 10),
            enable_swagger: std::env::var("ROOMFORGE_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            cors_allowed_origins: std::env::var("ROOMFORGE_CORS_ORIGINS").ok(),
            admin_api_token: std::env::var("ROOMFORGE_ADMIN_TOKEN").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            mesh_api_keys: load_mesh_keys(),
            llm_base_url: env_or("ROOMFORGE_LLM_BASE_URL", "https://api.anthropic.com"),
            mesh_base_url: env_or("ROOMFORGE_MESH_BASE_URL", "https://api.meshy.ai"),
            prompts: load_prompts(&env_or("ROOMFORGE_PROMPTS_FILE", "prompts.toml")),
        }
    }
}

/// Loads `MESHY_API_KEY`, then `MESHY_API_KEY_2`..`MESHY_API_KEY_10` in
/// order, skipping unset slots (spec §6).
fn load_mesh_keys() -> Vec<String> {
    let mut keys = Vec::new();
    if let Ok(k) = std::env::var("MESHY_API_KEY") {
        if !k.is_empty() {
            keys.push(k);
        }
    }
    for i in 2..=10 {
        if let Ok(k) = std::env::var(format!("MESHY_API_KEY_{i}")) {
            if !k.is_empty() {
                keys.push(k);
            }
        }
    }
    keys
}

#[derive(serde::Deserialize, Default)]
struct PromptsDocument {
    prompts: PromptsTable,
}

#[derive(serde::Deserialize, Default)]
struct PromptsTable {
    #[serde(default)]
    scenario: String,
    #[serde(default)]
    unified_scripts: String,
    #[serde(default)]
    scripts_batch: String,
}

const DEFAULT_SCENARIO_PROMPT: &str = include_str!("../prompts/scenario.txt");
const DEFAULT_UNIFIED_SCRIPTS_PROMPT: &str = include_str!("../prompts/unified_scripts.txt");
const DEFAULT_SCRIPTS_BATCH_PROMPT: &str = include_str!("../prompts/scripts_batch.txt");

fn load_prompts(path: &str) -> PromptSet {
    let doc = std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| toml::from_str::<PromptsDocument>(&raw).ok());

    match doc {
        Some(doc) => PromptSet {
            scenario: non_empty_or(doc.prompts.scenario, DEFAULT_SCENARIO_PROMPT),
            unified_scripts: non_empty_or(doc.prompts.unified_scripts, DEFAULT_UNIFIED_SCRIPTS_PROMPT),
            scripts_batch: non_empty_or(doc.prompts.scripts_batch, DEFAULT_SCRIPTS_BATCH_PROMPT),
        },
        None => PromptSet {
            scenario: DEFAULT_SCENARIO_PROMPT.to_string(),
            unified_scripts: DEFAULT_UNIFIED_SCRIPTS_PROMPT.to_string(),
            scripts_batch: DEFAULT_SCRIPTS_BATCH_PROMPT.to_string(),
        },
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
