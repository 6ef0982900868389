use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which translation backend family serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineKind {
    #[serde(rename = "google", alias = "cloud")]
    CloudApi,
    #[serde(rename = "openai", alias = "chat")]
    ChatCompletion,
    #[default]
    #[serde(rename = "local")]
    LocalModel,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [
        EngineKind::CloudApi,
        EngineKind::ChatCompletion,
        EngineKind::LocalModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::CloudApi => "google",
            EngineKind::ChatCompletion => "openai",
            EngineKind::LocalModel => "local",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "cloud" => Ok(EngineKind::CloudApi),
            "openai" | "chat" => Ok(EngineKind::ChatCompletion),
            "local" => Ok(EngineKind::LocalModel),
            _ => Err(format!(
                "Unknown engine: {}. Use 'google', 'openai', or 'local'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub endpoint: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: None,
            endpoint: "https://translation.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub model_name: String,
    /// "cuda" or "cpu".
    pub device: String,
    /// "float32" or "float16".
    pub precision: String,
    pub batch_size: usize,
    pub max_length: usize,
    /// Base URL of the inference runtime hosting the model.
    pub endpoint: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_name: "facebook/nllb-200-distilled-600M".to_string(),
            device: "cuda".to_string(),
            precision: "float32".to_string(),
            batch_size: 8,
            max_length: 512,
            endpoint: "http://127.0.0.1:5008".to_string(),
        }
    }
}

/// Request size bounds enforced before a request reaches a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_text_length: usize,
    pub max_batch_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_length: 5000,
            max_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineKind,
    pub cloud: CloudConfig,
    pub chat: ChatConfig,
    pub local: LocalConfig,
    pub limits: Limits,
    pub log_level: Option<String>,
}

/// Snapshot of which engines are usable with the current configuration.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub current_engine: EngineKind,
    pub available_engines: Vec<EngineKind>,
    pub google_configured: bool,
    pub openai_configured: bool,
    pub local_model: String,
    pub local_device: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Load a single TOML file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    fn apply_env(&mut self) {
        if let Ok(engine) = std::env::var("TRANSLATION_ENGINE") {
            if let Ok(kind) = engine.parse() {
                self.engine = kind;
            }
        }

        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            self.cloud.api_key = Some(key);
        }
        if let Ok(project) = std::env::var("GOOGLE_PROJECT_ID") {
            self.cloud.project_id = Some(project);
        }
        if let Ok(endpoint) = std::env::var("GOOGLE_TRANSLATE_ENDPOINT") {
            self.cloud.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.chat.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.chat.model = model;
        }
        if let Ok(endpoint) = std::env::var("OPENAI_BASE_URL") {
            self.chat.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("LOCAL_MODEL_NAME") {
            self.local.model_name = model;
        }
        if let Ok(device) = std::env::var("LOCAL_DEVICE") {
            self.local.device = device;
        }
        if let Ok(precision) = std::env::var("LOCAL_MODEL_PRECISION") {
            self.local.precision = precision;
        }
        if let Ok(size) = std::env::var("LOCAL_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.local.batch_size = s;
            }
        }
        if let Ok(len) = std::env::var("LOCAL_MAX_LENGTH") {
            if let Ok(l) = len.parse() {
                self.local.max_length = l;
            }
        }
        if let Ok(endpoint) = std::env::var("LOCAL_RUNTIME_URL") {
            self.local.endpoint = endpoint;
        }

        if let Ok(len) = std::env::var("MAX_TEXT_LENGTH") {
            if let Ok(l) = len.parse() {
                self.limits.max_text_length = l;
            }
        }
        if let Ok(size) = std::env::var("MAX_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.limits.max_batch_size = s;
            }
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = Some(level);
        }
    }

    pub fn validate(&self, engine: EngineKind) -> Result<(), ConfigError> {
        match engine {
            EngineKind::CloudApi => {
                if !has_key(&self.cloud.api_key) {
                    return Err(ConfigError::Invalid(
                        "GOOGLE_API_KEY not set. Create one in the Google Cloud console"
                            .to_string(),
                    ));
                }
            }
            EngineKind::ChatCompletion => {
                if !has_key(&self.chat.api_key) {
                    return Err(ConfigError::Invalid(
                        "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                            .to_string(),
                    ));
                }
            }
            EngineKind::LocalModel => {
                if self.local.batch_size == 0 {
                    return Err(ConfigError::Invalid(
                        "Local batch size must be greater than 0".to_string(),
                    ));
                }
                if self.local.max_length == 0 {
                    return Err(ConfigError::Invalid(
                        "Local max length must be greater than 0".to_string(),
                    ));
                }
            }
        }

        if self.limits.max_text_length == 0 || self.limits.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "Request limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn engine_status(&self) -> EngineStatus {
        EngineStatus {
            current_engine: self.engine,
            available_engines: EngineKind::ALL
                .into_iter()
                .filter(|kind| self.validate(*kind).is_ok())
                .collect(),
            google_configured: has_key(&self.cloud.api_key),
            openai_configured: has_key(&self.chat.api_key),
            local_model: self.local.model_name.clone(),
            local_device: self.local.device.clone(),
        }
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("transgate").join("config.toml"))
    }
}

// An empty key counts as missing.
fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.is_empty())
}
