use crate::error::{Result, TranslateError};
use crate::registry::ProviderRegistry;
use crate::schema::{
    BatchTranslationRequest, BatchTranslationResult, HealthReport, LanguagesResult,
    TranslationRequest, TranslationResult,
};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Request-facing facade over the active translation provider.
///
/// Every call resolves the provider through the registry, times the call and
/// wraps the output in a result envelope tagged with the engine name.
#[derive(Clone)]
pub struct TranslationService {
    registry: Arc<ProviderRegistry>,
}

impl TranslationService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Translate a single text.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let provider = self.registry.resolve().await?;
        let engine = provider.kind().as_str();

        let start_time = Instant::now();
        let translated_text = guarded(
            engine,
            provider.translate(
                &request.text,
                &request.source_language,
                &request.target_language,
            ),
        )
        .await
        .inspect_err(|e| error!("Translation error: {}", e))?;
        let duration = start_time.elapsed();

        info!(
            "Translation completed in {:.2}s - {}->{}",
            duration.as_secs_f64(),
            request.source_language,
            request.target_language
        );

        Ok(TranslationResult {
            original_text: request.text.clone(),
            translated_text,
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            engine_name: provider.name().to_string(),
            completed_at: Utc::now(),
        })
    }

    /// Translate many texts sharing one language pair.
    pub async fn batch_translate(
        &self,
        request: &BatchTranslationRequest,
    ) -> Result<BatchTranslationResult> {
        let provider = self.registry.resolve().await?;
        let engine = provider.kind().as_str();

        let start_time = Instant::now();
        let translated_texts = guarded(
            engine,
            provider.batch_translate(
                &request.texts,
                &request.source_language,
                &request.target_language,
            ),
        )
        .await
        .inspect_err(|e| error!("Batch translation error: {}", e))?;
        let duration = start_time.elapsed();

        if translated_texts.len() != request.texts.len() {
            let err = TranslateError::engine(
                engine,
                format!(
                    "Engine returned {} translations for {} texts",
                    translated_texts.len(),
                    request.texts.len()
                ),
            );
            error!("Batch translation error: {}", err);
            return Err(err);
        }

        info!(
            "Batch translation completed in {:.2}s - {} texts translated",
            duration.as_secs_f64(),
            request.texts.len()
        );

        Ok(BatchTranslationResult {
            original_texts: request.texts.clone(),
            count: translated_texts.len(),
            translated_texts,
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            engine_name: provider.name().to_string(),
            completed_at: Utc::now(),
        })
    }

    /// Languages the active engine supports.
    pub async fn supported_languages(&self) -> Result<LanguagesResult> {
        let provider = self.registry.resolve().await?;
        let engine = provider.kind().as_str();

        let start_time = Instant::now();
        let languages = guarded(engine, provider.supported_languages())
            .await
            .inspect_err(|e| error!("Error getting supported languages: {}", e))?;
        let duration = start_time.elapsed();

        info!(
            "Supported languages listed in {:.2}s - {} languages",
            duration.as_secs_f64(),
            languages.len()
        );

        Ok(LanguagesResult {
            total: languages.len(),
            languages,
            engine: provider.name().to_string(),
        })
    }

    /// Probe the active engine. Always answers, even when nothing can be resolved.
    pub async fn health_check(&self) -> HealthReport {
        let start_time = Instant::now();

        let outcome = AssertUnwindSafe(async {
            let provider = self.registry.resolve().await?;
            let healthy = provider.health_check().await;
            Ok::<_, TranslateError>((healthy, provider.name().to_string()))
        })
        .catch_unwind()
        .await;

        match outcome {
            Ok(Ok((healthy, engine))) => HealthReport {
                healthy,
                engine,
                checked_at: Utc::now(),
                response_time_ms: round_ms(start_time.elapsed().as_secs_f64() * 1000.0),
                error: None,
            },
            Ok(Err(e)) => unhealthy(e.to_string()),
            Err(panic) => unhealthy(panic_message(panic.as_ref())),
        }
    }
}

/// Run a provider call, turning a panic into `EngineUnavailable`.
async fn guarded<T, F>(engine: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(TranslateError::engine(engine, panic_message(panic.as_ref()))),
    }
}

fn unhealthy(reason: String) -> HealthReport {
    error!("Health check error: {}", reason);
    HealthReport {
        healthy: false,
        engine: "unknown".to_string(),
        checked_at: Utc::now(),
        response_time_ms: 0.0,
        error: Some(reason),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider panicked".to_string()
    }
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
