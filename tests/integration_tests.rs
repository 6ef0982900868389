//! Integration tests for the registry and the service layer
//!
//! Engines are replaced by in-process spies so the tests can observe how
//! often models are loaded, called and released.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transgate::config::{Config, EngineKind};
use transgate::provider::{
    known_model, ChatTranslator, CloudTranslator, LanguageCatalog, LocalTranslator, ModelLoader,
    ModelSpec, Seq2SeqModel, TranslationProvider,
};
use transgate::{
    BatchTranslationRequest, EngineFactory, ProviderFactory, ProviderRegistry, Result,
    TranslateError, TranslationRequest, TranslationService,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    generates: AtomicUsize,
    unloads: AtomicUsize,
}

struct SpyModel {
    languages: Vec<String>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Seq2SeqModel for SpyModel {
    fn languages(&self) -> &[String] {
        &self.languages
    }

    fn device(&self) -> &str {
        "cpu"
    }

    async fn generate(
        &self,
        texts: &[String],
        _source: &str,
        target: &str,
    ) -> anyhow::Result<Vec<String>> {
        self.counters.generates.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| format!("[{}] {}", target, t)).collect())
    }

    async fn unload(&self) -> anyhow::Result<()> {
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Loads any model from the known table; anything else is "not found".
#[derive(Default)]
struct SpyLoader {
    counters: Arc<Counters>,
}

#[async_trait]
impl ModelLoader for SpyLoader {
    async fn load(&self, spec: &ModelSpec) -> anyhow::Result<Box<dyn Seq2SeqModel>> {
        let known = known_model(&spec.model)
            .ok_or_else(|| anyhow::anyhow!("{} is not a valid model identifier", spec.model))?;
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SpyModel {
            languages: known.languages.iter().map(|l| l.to_string()).collect(),
            counters: self.counters.clone(),
        }))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    None,
    PanicOnHealth,
    FailOnHealth,
    PanicOnTranslate,
    DropsBatchItems,
}

struct FaultyProvider {
    fault: Fault,
}

#[async_trait]
impl TranslationProvider for FaultyProvider {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        if self.fault == Fault::PanicOnTranslate {
            panic!("tokenizer crashed");
        }
        Ok(text.chars().rev().collect())
    }

    async fn batch_translate(
        &self,
        texts: &[String],
        _source: &str,
        _target: &str,
    ) -> Result<Vec<String>> {
        if self.fault == Fault::DropsBatchItems {
            return Ok(texts.iter().skip(1).cloned().collect());
        }
        Ok(texts.to_vec())
    }

    async fn supported_languages(&self) -> Result<LanguageCatalog> {
        Ok(LanguageCatalog::from([
            ("en".to_string(), "English".to_string()),
            ("fr".to_string(), "French".to_string()),
        ]))
    }

    fn validate_language_pair(&self, source: &str, target: &str) -> bool {
        source != target
    }

    async fn health_check(&self) -> bool {
        match self.fault {
            Fault::PanicOnHealth => panic!("probe exploded"),
            Fault::FailOnHealth => false,
            _ => true,
        }
    }

    fn name(&self) -> &str {
        "Faulty"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::LocalModel
    }
}

/// Hands out a fresh provider on every construction, slowly.
struct CountingFactory {
    fault: Fault,
    created: AtomicUsize,
}

impl CountingFactory {
    fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            fault,
            created: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderFactory for CountingFactory {
    async fn create(
        &self,
        _kind: EngineKind,
        _config: &Config,
    ) -> Result<Arc<dyn TranslationProvider>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FaultyProvider { fault: self.fault }))
    }
}

fn local_config(model: &str) -> Config {
    let mut config = Config::default();
    config.engine = EngineKind::LocalModel;
    config.local.model_name = model.to_string();
    config
}

fn spy_registry(config: Config, loader: Arc<SpyLoader>) -> Arc<ProviderRegistry> {
    let factory = EngineFactory::new().with_loader(loader);
    Arc::new(ProviderRegistry::with_factory(config, Arc::new(factory)))
}

fn strings(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

// ============================================================================
// Registry
// ============================================================================

mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_resolve_constructs_once() {
        let factory = CountingFactory::new(Fault::None);
        let registry = Arc::new(ProviderRegistry::with_factory(
            Config::default(),
            factory.clone(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve().await })
            })
            .collect();

        let mut providers = Vec::new();
        for handle in futures::future::join_all(handles).await {
            providers.push(handle.unwrap().unwrap());
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert!(providers.windows(2).all(|p| Arc::ptr_eq(&p[0], &p[1])));
    }

    #[tokio::test]
    async fn test_resolve_without_reset_returns_same_provider() {
        let loader = Arc::new(SpyLoader::default());
        let registry = spy_registry(local_config("facebook/m2m100_418M"), loader.clone());

        let first = registry.resolve().await.unwrap();
        let second = registry.resolve().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.counters.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_unloads_model_and_next_resolve_reloads() {
        let loader = Arc::new(SpyLoader::default());
        let registry = spy_registry(local_config("facebook/m2m100_418M"), loader.clone());

        let first = registry.resolve().await.unwrap();
        registry.reset().await;
        assert_eq!(loader.counters.unloads.load(Ordering::SeqCst), 1);
        assert!(!registry.is_resolved().await);

        let second = registry.resolve().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(loader.counters.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_switch_from_local_releases_model() {
        let loader = Arc::new(SpyLoader::default());
        let mut config = local_config("facebook/nllb-200-distilled-600M");
        config.cloud.api_key = Some("test-key".to_string());
        let registry = spy_registry(config, loader.clone());

        registry.resolve().await.unwrap();
        let provider = registry.switch_engine(EngineKind::CloudApi).await.unwrap();

        assert_eq!(loader.counters.unloads.load(Ordering::SeqCst), 1);
        assert_eq!(provider.kind(), EngineKind::CloudApi);
        assert_eq!(provider.name(), "Google Cloud Translation");
        assert_eq!(registry.engine().await, EngineKind::CloudApi);
    }

    #[tokio::test]
    async fn test_switch_to_unconfigured_engine_fails() {
        let loader = Arc::new(SpyLoader::default());
        let registry = spy_registry(local_config("facebook/m2m100_418M"), loader.clone());
        registry.resolve().await.unwrap();

        let err = registry
            .switch_engine(EngineKind::ChatCompletion)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TranslateError::EngineUnavailable { ref engine, .. } if engine == "openai"));
        assert!(!registry.is_resolved().await);
        assert_eq!(registry.engine().await, EngineKind::ChatCompletion);
        // the old model was still released
        assert_eq!(loader.counters.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_load_failure_then_retry() {
        let loader = Arc::new(SpyLoader::default());
        let registry = spy_registry(local_config("nobody/does-not-exist"), loader.clone());

        let err = registry.resolve().await.err().unwrap();
        match err {
            TranslateError::ModelLoadFailure { ref model, .. } => {
                assert_eq!(model, "nobody/does-not-exist")
            }
            ref other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.status_code(), 500);
        assert!(!registry.is_resolved().await);

        // resolving again retries and fails the same way
        assert!(registry.resolve().await.is_err());

        registry
            .reconfigure(local_config("Helsinki-NLP/Tatoeba-MT"))
            .await;
        let provider = registry.resolve().await.unwrap();
        assert_eq!(provider.name(), "MarianMT (local)");
        assert_eq!(loader.counters.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_active_provider() {
        let loader = Arc::new(SpyLoader::default());
        let registry = spy_registry(local_config("facebook/m2m100_418M"), loader.clone());

        registry.shutdown().await;
        assert_eq!(loader.counters.unloads.load(Ordering::SeqCst), 0);

        registry.resolve().await.unwrap();
        registry.shutdown().await;
        assert_eq!(loader.counters.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_status_tracks_switches() {
        let registry = ProviderRegistry::with_factory(
            Config::default(),
            CountingFactory::new(Fault::None),
        );
        let status = registry.engine_status().await;
        assert_eq!(status.current_engine, EngineKind::LocalModel);
        assert!(!status.available_engines.contains(&EngineKind::CloudApi));

        registry.switch_engine(EngineKind::CloudApi).await.unwrap();
        assert_eq!(
            registry.engine_status().await.current_engine,
            EngineKind::CloudApi
        );
    }
}

// ============================================================================
// Language pair rules shared by every adapter
// ============================================================================

mod language_pair_tests {
    use super::*;

    async fn all_adapters() -> Vec<Box<dyn TranslationProvider>> {
        let loader = SpyLoader::default();
        let local = LocalTranslator::load(
            &local_config("facebook/nllb-200-distilled-600M").local,
            &loader,
        )
        .await
        .unwrap();

        vec![
            Box::new(CloudTranslator::new("test-key".to_string())),
            Box::new(ChatTranslator::new("sk-test".to_string())),
            Box::new(local),
        ]
    }

    #[tokio::test]
    async fn test_identical_pair_is_never_valid() {
        for provider in all_adapters().await {
            for code in ["en", "es", "fr", "de", "ja", "zh"] {
                assert!(
                    !provider.validate_language_pair(code, code),
                    "{} accepted {}->{}",
                    provider.name(),
                    code,
                    code
                );
            }
            assert!(provider.validate_language_pair("en", "es"));
        }
    }

    #[tokio::test]
    async fn test_translate_rejects_invalid_pair() {
        for provider in all_adapters().await {
            let err = provider.translate("hello", "fr", "fr").await.unwrap_err();
            assert_eq!(err, TranslateError::unsupported_pair("fr", "fr"));
            assert_eq!(err.status_code(), 400);
        }
    }
}

// ============================================================================
// Service
// ============================================================================

mod service_tests {
    use super::*;

    fn faulty_service(fault: Fault) -> TranslationService {
        TranslationService::new(Arc::new(ProviderRegistry::with_factory(
            Config::default(),
            CountingFactory::new(fault),
        )))
    }

    #[tokio::test]
    async fn test_translate_hello_through_cloud() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "translations": [{ "translatedText": "hola" }] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.engine = EngineKind::CloudApi;
        config.cloud.api_key = Some("test-key".to_string());
        config.cloud.endpoint = server.uri();
        let service = TranslationService::new(Arc::new(ProviderRegistry::new(config)));

        let result = service
            .translate(&TranslationRequest::new("hello", "en", "es"))
            .await
            .unwrap();

        assert_eq!(result.translated_text, "hola");
        assert_eq!(result.original_text, "hello");
        assert_eq!(result.source_language, "en");
        assert_eq!(result.target_language, "es");
        assert_eq!(result.engine_name, "Google Cloud Translation");
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_count() {
        let loader = Arc::new(SpyLoader::default());
        let mut config = local_config("facebook/m2m100_418M");
        config.local.batch_size = 2;
        let service = TranslationService::new(spy_registry(config, loader.clone()));

        let request = BatchTranslationRequest::new(strings(&["one", "two", "three"]), "en", "de");
        let result = service.batch_translate(&request).await.unwrap();

        assert_eq!(result.count, 3);
        assert_eq!(result.original_texts, request.texts);
        assert_eq!(
            result.translated_texts,
            strings(&["[de] one", "[de] two", "[de] three"])
        );
        assert_eq!(result.engine_name, "M2M-100 418M (local)");
        assert_eq!(loader.counters.generates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_identical_pair_batch_never_reaches_local_engine() {
        let loader = Arc::new(SpyLoader::default());
        let service = TranslationService::new(spy_registry(
            local_config("facebook/m2m100_418M"),
            loader.clone(),
        ));

        let request = BatchTranslationRequest::new(strings(&["a", "b"]), "en", "en");
        let err = service.batch_translate(&request).await.unwrap_err();

        assert!(matches!(err, TranslateError::InvalidLanguagePair(_)));
        assert_eq!(loader.counters.generates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identical_pair_batch_never_reaches_remote_engines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.cloud.api_key = Some("test-key".to_string());
        config.cloud.endpoint = server.uri();
        config.chat.api_key = Some("sk-test".to_string());
        config.chat.endpoint = server.uri();

        let registry = Arc::new(ProviderRegistry::new(config));
        let service = TranslationService::new(registry.clone());
        let request = BatchTranslationRequest::new(strings(&["a", "b"]), "en", "en");

        for kind in [EngineKind::CloudApi, EngineKind::ChatCompletion] {
            registry.switch_engine(kind).await.unwrap();
            let err = service.batch_translate(&request).await.unwrap_err();
            assert!(matches!(err, TranslateError::InvalidLanguagePair(_)));
        }
    }

    #[tokio::test]
    async fn test_short_batch_is_engine_unavailable() {
        let service = faulty_service(Fault::DropsBatchItems);
        let request = BatchTranslationRequest::new(strings(&["a", "b", "c"]), "en", "fr");

        let err = service.batch_translate(&request).await.unwrap_err();
        assert_eq!(err.kind(), "EngineUnavailable");
        assert!(err.to_string().contains("2 translations for 3 texts"));
    }

    #[tokio::test]
    async fn test_panicking_translate_is_engine_unavailable() {
        let service = faulty_service(Fault::PanicOnTranslate);

        let err = service
            .translate(&TranslationRequest::new("hello", "en", "fr"))
            .await
            .unwrap_err();
        assert_eq!(err, TranslateError::engine("local", "tokenizer crashed"));

        // the provider stays cached and usable for other calls
        assert!(service.registry().is_resolved().await);
        assert!(service.health_check().await.healthy);
    }

    #[tokio::test]
    async fn test_supported_languages_envelope() {
        let service = faulty_service(Fault::None);
        let result = service.supported_languages().await.unwrap();

        assert_eq!(result.total, 2);
        assert_eq!(result.engine, "Faulty");
        assert_eq!(result.languages.get("fr").map(String::as_str), Some("French"));
    }

    #[tokio::test]
    async fn test_health_check_healthy() {
        let report = faulty_service(Fault::None).health_check().await;

        assert!(report.healthy);
        assert_eq!(report.engine, "Faulty");
        assert!(report.response_time_ms >= 0.0);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_health_check_unhealthy_engine() {
        let report = faulty_service(Fault::FailOnHealth).health_check().await;

        assert!(!report.healthy);
        assert_eq!(report.engine, "Faulty");
    }

    #[tokio::test]
    async fn test_health_check_survives_panicking_probe() {
        let report = faulty_service(Fault::PanicOnHealth).health_check().await;

        assert!(!report.healthy);
        assert_eq!(report.engine, "unknown");
        assert_eq!(report.error.as_deref(), Some("probe exploded"));
    }

    #[tokio::test]
    async fn test_health_check_when_nothing_resolves() {
        let loader = Arc::new(SpyLoader::default());
        let service = TranslationService::new(spy_registry(
            local_config("nobody/does-not-exist"),
            loader,
        ));

        let report = service.health_check().await;

        assert!(!report.healthy);
        assert_eq!(report.engine, "unknown");
        assert!(report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Failed to load model")
                && e.contains("is not a valid model identifier")));
    }
}
