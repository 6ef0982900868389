//! Locally hosted sequence-to-sequence translation models.
//!
//! The model itself lives in an inference runtime reached through
//! [`ModelLoader`] and [`Seq2SeqModel`]. The default [`RuntimeLoader`] talks
//! to a runtime sidecar over HTTP; tests plug in their own loaders.

use crate::config::{EngineKind, LocalConfig};
use crate::error::{Result, TranslateError};
use crate::languages::name_or_code;
use crate::provider::{LanguageCatalog, TranslationProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const ENGINE: EngineKind = EngineKind::LocalModel;

/// A model family with known language coverage.
#[derive(Debug)]
pub struct KnownModel {
    pub id: &'static str,
    pub name: &'static str,
    pub languages: &'static [&'static str],
}

pub const KNOWN_MODELS: [KnownModel; 3] = [
    KnownModel {
        id: "facebook/nllb-200-distilled-600M",
        name: "NLLB-200 Distilled 600M",
        languages: &["en", "es", "fr", "de", "zh", "ja", "ko", "ru", "pt", "hi", "ar", "it"],
    },
    KnownModel {
        id: "facebook/m2m100_418M",
        name: "M2M-100 418M",
        languages: &["en", "es", "fr", "de", "zh", "ja", "ko", "ru", "pt", "hi", "ar", "it"],
    },
    KnownModel {
        id: "Helsinki-NLP/Tatoeba-MT",
        name: "MarianMT",
        languages: &["en", "es", "fr", "de", "zh", "ja"],
    },
];

pub fn known_model(id: &str) -> Option<&'static KnownModel> {
    KNOWN_MODELS.iter().find(|m| m.id == id)
}

/// What to load and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub model: String,
    pub device: String,
    pub precision: String,
    pub max_length: usize,
}

impl From<&LocalConfig> for ModelSpec {
    fn from(config: &LocalConfig) -> Self {
        Self {
            model: config.model_name.clone(),
            device: config.device.clone(),
            precision: config.precision.clone(),
            max_length: config.max_length,
        }
    }
}

/// A model resident in an inference runtime.
#[async_trait]
pub trait Seq2SeqModel: Send + Sync {
    /// Language codes the loaded artifact can translate between.
    fn languages(&self) -> &[String];

    /// Device the runtime actually placed the model on.
    fn device(&self) -> &str;

    /// Translate all `texts` in one pass. Output is index-aligned with input.
    async fn generate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> anyhow::Result<Vec<String>>;

    /// Drop the model and free device memory.
    async fn unload(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, spec: &ModelSpec) -> anyhow::Result<Box<dyn Seq2SeqModel>>;
}

/// Loads models into an inference runtime sidecar over HTTP.
#[derive(Clone)]
pub struct RuntimeLoader {
    base_url: String,
    http: Client,
}

impl RuntimeLoader {
    /// Create a loader for the runtime at `url`, e.g. "http://127.0.0.1:5008".
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl ModelLoader for RuntimeLoader {
    async fn load(&self, spec: &ModelSpec) -> anyhow::Result<Box<dyn Seq2SeqModel>> {
        let url = format!("{}/v1/models/load", self.base_url);
        let request = LoadRequest {
            model: &spec.model,
            device: &spec.device,
            precision: &spec.precision,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: LoadResponse = response.json().await?;
        if !body.ok {
            return Err(anyhow::anyhow!(
                body.error.unwrap_or_else(|| "Unknown error".to_string())
            ));
        }

        // Prefer what the runtime reports for the artifact, then the known table.
        let languages = body
            .languages
            .filter(|l| !l.is_empty())
            .or_else(|| {
                known_model(&spec.model)
                    .map(|m| m.languages.iter().map(|l| l.to_string()).collect())
            })
            .unwrap_or_default();

        Ok(Box::new(RuntimeModel {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            model: spec.model.clone(),
            device: body.device.unwrap_or_else(|| spec.device.clone()),
            max_length: spec.max_length,
            languages,
        }))
    }
}

struct RuntimeModel {
    base_url: String,
    http: Client,
    model: String,
    device: String,
    max_length: usize,
    languages: Vec<String>,
}

#[async_trait]
impl Seq2SeqModel for RuntimeModel {
    fn languages(&self) -> &[String] {
        &self.languages
    }

    fn device(&self) -> &str {
        &self.device
    }

    async fn generate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/v1/translate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            src_lang: source,
            tgt_lang: target,
            texts,
            max_length: self.max_length,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: GenerateResponse = response.json().await?;
        if !body.ok {
            return Err(anyhow::anyhow!(
                body.error.unwrap_or_else(|| "Unknown error".to_string())
            ));
        }
        body.texts
            .ok_or_else(|| anyhow::anyhow!("No translation texts in response"))
    }

    async fn unload(&self) -> anyhow::Result<()> {
        let url = format!("{}/v1/models/unload", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&UnloadRequest { model: &self.model })
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}

/// Translator backed by a locally loaded seq2seq model.
pub struct LocalTranslator {
    spec: ModelSpec,
    batch_size: usize,
    name: String,
    languages: Vec<String>,
    catalog: OnceLock<LanguageCatalog>,
    // Serializes access to the runtime; `None` once released.
    model: Mutex<Option<Box<dyn Seq2SeqModel>>>,
}

impl LocalTranslator {
    /// Load the configured model. Any failure surfaces as `ModelLoadFailure`.
    pub async fn load(config: &LocalConfig, loader: &dyn ModelLoader) -> Result<Self> {
        let spec = ModelSpec::from(config);
        info!("Loading model: {} on device: {}", spec.model, spec.device);

        if config.batch_size == 0 {
            return Err(TranslateError::model_load(&spec.model, "batch size must be > 0"));
        }

        let model = loader.load(&spec).await.map_err(|e| {
            error!("Failed to load model {}: {}", spec.model, e);
            TranslateError::model_load(&spec.model, e.to_string())
        })?;

        if spec.device == "cuda" && model.device() != "cuda" {
            warn!("CUDA not available, falling back to {}", model.device());
        }

        let languages = model.languages().to_vec();
        if languages.is_empty() {
            if let Err(e) = model.unload().await {
                warn!("Failed to unload model {}: {}", spec.model, e);
            }
            return Err(TranslateError::model_load(
                &spec.model,
                "model reported no language coverage",
            ));
        }

        let name = match known_model(&spec.model) {
            Some(known) => format!("{} (local)", known.name),
            None => format!("{} (local)", spec.model),
        };

        info!("Model loaded successfully: {}", spec.model);

        Ok(Self {
            spec,
            batch_size: config.batch_size,
            name,
            languages,
            catalog: OnceLock::new(),
            model: Mutex::new(Some(model)),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.spec.model
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn is_loaded(&self) -> bool {
        self.model.lock().await.is_some()
    }

    /// One pass through the runtime for a group of texts.
    async fn generate(&self, texts: &[String], source: &str, target: &str) -> Result<Vec<String>> {
        let guard = self.model.lock().await;
        let model = guard
            .as_ref()
            .ok_or_else(|| TranslateError::engine(ENGINE.as_str(), "Model has been released"))?;

        let outputs = model
            .generate(texts, source, target)
            .await
            .map_err(|e| TranslateError::engine(ENGINE.as_str(), e.to_string()))?;

        if outputs.len() != texts.len() {
            return Err(TranslateError::engine(
                ENGINE.as_str(),
                format!(
                    "Model returned {} outputs for {} inputs",
                    outputs.len(),
                    texts.len()
                ),
            ));
        }
        Ok(outputs)
    }

    fn probe_pair(&self) -> Option<(&str, &str)> {
        if self.validate_language_pair("en", "es") {
            return Some(("en", "es"));
        }
        match self.languages.as_slice() {
            [first, second, ..] => Some((first.as_str(), second.as_str())),
            _ => None,
        }
    }
}

#[async_trait]
impl TranslationProvider for LocalTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.check_language_pair(source, target)?;
        let (source, target) = (source.to_ascii_lowercase(), target.to_ascii_lowercase());

        let mut outputs = self
            .generate(&[text.to_string()], &source, &target)
            .await
            .inspect_err(|e| error!("Local translation error: {}", e))?;
        Ok(outputs.remove(0))
    }

    async fn batch_translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<Vec<String>> {
        self.check_language_pair(source, target)?;
        let (source, target) = (source.to_ascii_lowercase(), target.to_ascii_lowercase());

        let mut results = Vec::with_capacity(texts.len());
        for (index, chunk) in texts.chunks(self.batch_size).enumerate() {
            debug!("Generating chunk {} ({} texts)", index, chunk.len());
            let outputs = self
                .generate(chunk, &source, &target)
                .await
                .inspect_err(|e| error!("Batch translation error: {}", e))?;
            results.extend(outputs);
        }
        Ok(results)
    }

    async fn supported_languages(&self) -> Result<LanguageCatalog> {
        Ok(self
            .catalog
            .get_or_init(|| {
                self.languages
                    .iter()
                    .map(|code| (code.clone(), name_or_code(code)))
                    .collect()
            })
            .clone())
    }

    fn validate_language_pair(&self, source: &str, target: &str) -> bool {
        let covered = |code: &str| self.languages.iter().any(|l| l.eq_ignore_ascii_case(code));
        covered(source) && covered(target) && !source.eq_ignore_ascii_case(target)
    }

    async fn health_check(&self) -> bool {
        let Some((source, target)) = self.probe_pair() else {
            return false;
        };

        match self.generate(&["hello".to_string()], source, target).await {
            Ok(outputs) => outputs.first().is_some_and(|t| !t.is_empty()),
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

    async fn release(&self) {
        let Some(model) = self.model.lock().await.take() else {
            return;
        };

        match model.unload().await {
            Ok(()) => info!("Model unloaded successfully: {}", self.spec.model),
            Err(e) => error!("Failed to unload model {}: {}", self.spec.model, e),
        }
    }
}

// Runtime wire types

#[derive(Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
    device: &'a str,
    precision: &'a str,
}

#[derive(Deserialize, Debug)]
struct LoadResponse {
    ok: bool,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    languages: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    src_lang: &'a str,
    tgt_lang: &'a str,
    texts: &'a [String],
    max_length: usize,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    ok: bool,
    #[serde(default)]
    texts: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct UnloadRequest<'a> {
    model: &'a str,
}
