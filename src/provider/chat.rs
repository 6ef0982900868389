//! Chat-completion translation using an OpenAI-compatible API.

use crate::config::{ChatConfig, EngineKind};
use crate::error::{Result, TranslateError};
use crate::languages::{name_or_code, CHAT_LANGUAGES};
use crate::provider::{http_failure, LanguageCatalog, TranslationProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// OpenAI API base URL.
const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

const ENGINE: EngineKind = EngineKind::ChatCompletion;

/// Translator prompting a chat-completion model.
pub struct ChatTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    name: String,
}

impl ChatTranslator {
    /// Create a new translator with the given API key.
    pub fn new(api_key: String) -> Self {
        let defaults = ChatConfig::default();
        Self {
            client: reqwest::Client::new(),
            api_key,
            name: format!("OpenAI ({})", defaults.model),
            model: defaults.model,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Build from configuration. Fails when no API key is configured.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TranslateError::engine(ENGINE.as_str(), "API key not configured"))?;

        let mut translator = Self::new(api_key)
            .with_model(config.model.clone())
            .with_endpoint(config.endpoint.clone());
        translator.temperature = config.temperature;
        translator.max_tokens = config.max_tokens;
        Ok(translator)
    }

    /// Set a different model (e.g., "gpt-4o-mini").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.name = format!("OpenAI ({})", self.model);
        self
    }

    /// Point the client at a different OpenAI-compatible host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the system and user messages for one translation.
    fn build_messages(&self, text: &str, source: &str, target: &str) -> Vec<ChatMessage> {
        let source_name = name_or_code(source);
        let target_name = name_or_code(target);

        vec![
            ChatMessage {
                role: "system".to_string(),
                content: format!(
                    "You are a professional translator. Translate text accurately from {} to {}.",
                    source_name, target_name
                ),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!(
                    "Translate the following text from {} to {}. Only provide the translation, no additional text.\n\nText: {}",
                    source_name, target_name, text
                ),
            },
        ]
    }

    async fn complete(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(self.temperature),
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslateError::engine(ENGINE.as_str(), format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TranslateError::engine(ENGINE.as_str(), format!("Failed to read response: {}", e))
        })?;
        debug!("Chat completion response status: {}", status);

        if !status.is_success() {
            let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => format!("{} ({})", api_error.error.message, api_error.error.r#type),
                Err(_) => body,
            };
            return Err(http_failure(ENGINE, status, &detail));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            TranslateError::engine(ENGINE.as_str(), format!("Malformed completion: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(TranslateError::engine(ENGINE.as_str(), "Empty completion"));
        }

        Ok(content)
    }
}

#[async_trait]
impl TranslationProvider for ChatTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.check_language_pair(source, target)?;

        self.complete(self.build_messages(text, source, target), self.max_tokens)
            .await
            .inspect_err(|e| error!("OpenAI translation error: {}", e))
    }

    async fn batch_translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<Vec<String>> {
        self.check_language_pair(source, target)?;

        let mut results = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let translated = self
                .complete(self.build_messages(text, source, target), self.max_tokens)
                .await
                .inspect_err(|e| error!("OpenAI batch item {} failed: {}", index, e))?;
            results.push(translated);
        }
        Ok(results)
    }

    async fn supported_languages(&self) -> Result<LanguageCatalog> {
        Ok(CHAT_LANGUAGES
            .iter()
            .map(|code| (code.to_string(), name_or_code(code)))
            .collect())
    }

    fn validate_language_pair(&self, source: &str, target: &str) -> bool {
        let known = |code: &str| CHAT_LANGUAGES.iter().any(|l| l.eq_ignore_ascii_case(code));
        known(source) && known(target) && !source.eq_ignore_ascii_case(target)
    }

    async fn health_check(&self) -> bool {
        let probe = vec![ChatMessage {
            role: "user".to_string(),
            content: "hello".to_string(),
        }];

        match self.complete(probe, 10).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EngineKind {
        ENGINE
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    r#type: String,
}
