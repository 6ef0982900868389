//! Google Cloud Translation (v2 REST) provider.

use crate::config::{CloudConfig, EngineKind};
use crate::error::{Result, TranslateError};
use crate::languages::is_two_letter_code;
use crate::provider::{http_failure, LanguageCatalog, TranslationProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

/// Google Cloud Translation API base URL.
const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com";

const ENGINE: EngineKind = EngineKind::CloudApi;

/// Translator backed by the Google Cloud Translation API.
pub struct CloudTranslator {
    client: reqwest::Client,
    api_key: String,
    project_id: Option<String>,
    endpoint: String,
    catalog: OnceCell<LanguageCatalog>,
}

impl CloudTranslator {
    /// Create a new translator with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            project_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            catalog: OnceCell::new(),
        }
    }

    /// Build from configuration. Fails when no API key is configured.
    pub fn from_config(config: &CloudConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TranslateError::engine(ENGINE.as_str(), "API key not configured"))?;

        let mut translator = Self::new(api_key).with_endpoint(config.endpoint.clone());
        if let Some(ref project) = config.project_id {
            translator = translator.with_project(project.clone());
        }
        Ok(translator)
    }

    /// Point the client at a different API host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Bill requests to the given Google Cloud project.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.query(&[("key", self.api_key.as_str())]);
        match self.project_id {
            Some(ref project) => builder.header("x-goog-user-project", project),
            None => builder,
        }
    }

    async fn call_translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let url = format!("{}/language/translate/v2", self.endpoint);
        let body = TranslateBody {
            q: text,
            source,
            target,
            format: "text",
        };

        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::engine(ENGINE.as_str(), format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TranslateError::engine(ENGINE.as_str(), format!("Failed to read response: {}", e))
        })?;
        debug!("Google Translate response status: {}", status);

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(http_failure(ENGINE, status, &detail));
        }

        let parsed: TranslateResponse = serde_json::from_str(&body).map_err(|e| {
            TranslateError::engine(ENGINE.as_str(), format!("Failed to parse response: {}", e))
        })?;

        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| TranslateError::engine(ENGINE.as_str(), "Response contained no translations"))
    }

    async fn fetch_languages(&self) -> Result<LanguageCatalog> {
        let url = format!("{}/language/translate/v2/languages", self.endpoint);

        let response = self
            .request(self.client.get(&url))
            .query(&[("target", "en")])
            .send()
            .await
            .map_err(|e| TranslateError::engine(ENGINE.as_str(), format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(http_failure(ENGINE, status, &detail));
        }

        let parsed: LanguagesResponse = response.json().await.map_err(|e| {
            TranslateError::engine(ENGINE.as_str(), format!("Failed to parse languages: {}", e))
        })?;

        Ok(parsed
            .data
            .languages
            .into_iter()
            .map(|l| {
                let name = l.name.unwrap_or_else(|| l.language.clone());
                (l.language, name)
            })
            .collect())
    }
}

#[async_trait]
impl TranslationProvider for CloudTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.check_language_pair(source, target)?;

        self.call_translate(text, source, target)
            .await
            .inspect_err(|e| error!("Google Translate error: {}", e))
    }

    async fn batch_translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<Vec<String>> {
        self.check_language_pair(source, target)?;

        // No native batch endpoint in use: one request per item, aborting on first failure.
        let mut results = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let translated = self
                .call_translate(text, source, target)
                .await
                .inspect_err(|e| error!("Google Translate batch item {} failed: {}", index, e))?;
            results.push(translated);
        }
        Ok(results)
    }

    async fn supported_languages(&self) -> Result<LanguageCatalog> {
        self.catalog
            .get_or_try_init(|| self.fetch_languages())
            .await
            .cloned()
            .inspect_err(|e| error!("Failed to get supported languages: {}", e))
    }

    fn validate_language_pair(&self, source: &str, target: &str) -> bool {
        is_two_letter_code(source)
            && is_two_letter_code(target)
            && !source.eq_ignore_ascii_case(target)
    }

    async fn health_check(&self) -> bool {
        match self.call_translate("hello", "en", "es").await {
            Ok(text) => !text.is_empty(),
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "Google Cloud Translation"
    }

    fn kind(&self) -> EngineKind {
        ENGINE
    }
}

// API request/response types

#[derive(Serialize)]
struct TranslateBody<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize, Debug)]
struct TranslateResponse {
    data: TranslationsData,
}

#[derive(Deserialize, Debug)]
struct TranslationsData {
    translations: Vec<Translation>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Deserialize, Debug)]
struct LanguagesResponse {
    data: LanguagesData,
}

#[derive(Deserialize, Debug)]
struct LanguagesData {
    languages: Vec<Language>,
}

#[derive(Deserialize, Debug)]
struct Language {
    language: String,
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: String,
}
