use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::validation::{validate_config, ConfigError};

/// Typed view of `config.yml` after defaults and environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin is accepted.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    #[serde(alias = "lmstudio", alias = "openai_compatible")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_allowed_origins: Vec::new(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
        }
    }
}

fn default_config_value() -> Value {
    serde_json::to_value(AppConfig::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RELAY_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml` over the built-in defaults, applies environment
    /// overrides and validates the result.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let file_config = load_yaml_file(&self.config_path())?;
        let merged = deep_merge(&default_config_value(), &file_config);
        let merged = deep_merge(&merged, &env_overrides(|key| env::var(key).ok()));

        let config: AppConfig =
            serde_json::from_value(merged).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate_config(&config)?;
        Ok(config)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(ConfigError::Parse(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
        Err(e) => Err(ConfigError::Parse(e.to_string())),
    }
}

fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = json!({ "server": {}, "llm": {} });

    if let Some(port) = lookup("PORT").and_then(|val| val.parse::<u16>().ok()) {
        overrides["server"]["port"] = json!(port);
    }
    if let Some(host) = lookup("RELAY_HOST") {
        overrides["server"]["host"] = json!(host);
    }

    let llm_keys = [
        ("LLM_PROVIDER", "provider"),
        ("LLM_BASE_URL", "base_url"),
        ("LLM_CHAT_MODEL", "chat_model"),
        ("LLM_EMBEDDING_MODEL", "embedding_model"),
    ];
    for (var, key) in llm_keys {
        if let Some(val) = lookup(var).filter(|v| !v.trim().is_empty()) {
            overrides["llm"][key] = json!(val.trim());
        }
    }

    overrides
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}
