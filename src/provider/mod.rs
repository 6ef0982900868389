pub mod chat;
pub mod cloud;
pub mod local;

pub use chat::ChatTranslator;
pub use cloud::CloudTranslator;
pub use local::{
    known_model, KnownModel, LocalTranslator, ModelLoader, ModelSpec, RuntimeLoader,
    Seq2SeqModel, KNOWN_MODELS,
};

use crate::config::EngineKind;
use crate::error::{Result, TranslateError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::BTreeMap;

/// Language code to display name, owned by a provider for its lifetime.
pub type LanguageCatalog = BTreeMap<String, String>;

/// Capability set every translation backend implements.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate a single text. Rejects unsupported pairs before touching the engine.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Translate many texts sharing one language pair.
    ///
    /// The pair is validated once for the whole batch and the output has the
    /// same length and order as `texts`.
    async fn batch_translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<Vec<String>>;

    /// Languages this provider can translate between.
    async fn supported_languages(&self) -> Result<LanguageCatalog>;

    /// Pure pre-flight check, never performs I/O.
    fn validate_language_pair(&self, source: &str, target: &str) -> bool;

    /// One lightweight real call through the engine. Never fails.
    async fn health_check(&self) -> bool;

    /// Human-readable engine name reported on results.
    fn name(&self) -> &str;

    fn kind(&self) -> EngineKind;

    /// Free any resources held by the backend. Called by the registry only.
    async fn release(&self) {}

    fn check_language_pair(&self, source: &str, target: &str) -> Result<()> {
        if self.validate_language_pair(source, target) {
            Ok(())
        } else {
            Err(TranslateError::unsupported_pair(source, target))
        }
    }
}

/// Map a non-success HTTP answer from an engine into the taxonomy.
pub(crate) fn http_failure(engine: EngineKind, status: StatusCode, detail: &str) -> TranslateError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return TranslateError::RateLimited;
    }
    TranslateError::engine(
        engine.as_str(),
        format!("API error ({}): {}", status, detail),
    )
}
