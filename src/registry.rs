//! Selection and lifetime of the active translation provider.

use crate::config::{Config, EngineKind, EngineStatus};
use crate::error::Result;
use crate::provider::{
    ChatTranslator, CloudTranslator, LocalTranslator, ModelLoader, RuntimeLoader,
    TranslationProvider,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Builds a provider for an engine kind.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, kind: EngineKind, config: &Config)
        -> Result<Arc<dyn TranslationProvider>>;
}

/// Builds the production providers from configuration.
#[derive(Default)]
pub struct EngineFactory {
    loader: Option<Arc<dyn ModelLoader>>,
}

impl EngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific model loader instead of the HTTP runtime from config.
    pub fn with_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }
}

#[async_trait]
impl ProviderFactory for EngineFactory {
    async fn create(
        &self,
        kind: EngineKind,
        config: &Config,
    ) -> Result<Arc<dyn TranslationProvider>> {
        let provider: Arc<dyn TranslationProvider> = match kind {
            EngineKind::CloudApi => Arc::new(CloudTranslator::from_config(&config.cloud)?),
            EngineKind::ChatCompletion => Arc::new(ChatTranslator::from_config(&config.chat)?),
            EngineKind::LocalModel => {
                let translator = match self.loader {
                    Some(ref loader) => LocalTranslator::load(&config.local, loader.as_ref()).await?,
                    None => {
                        let loader = RuntimeLoader::new(config.local.endpoint.clone());
                        LocalTranslator::load(&config.local, &loader).await?
                    }
                };
                Arc::new(translator)
            }
        };
        Ok(provider)
    }
}

struct RegistryState {
    config: Config,
    active: Option<Arc<dyn TranslationProvider>>,
}

/// Owns the single active provider.
///
/// Resolution is lazy and cached. Construction, reset and engine switches
/// take the write lock, so at most one provider is ever live and no two
/// constructions race. Callers only get a per-call handle.
pub struct ProviderRegistry {
    factory: Arc<dyn ProviderFactory>,
    state: RwLock<RegistryState>,
}

impl ProviderRegistry {
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, Arc::new(EngineFactory::new()))
    }

    pub fn with_factory(config: Config, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(RegistryState {
                config,
                active: None,
            }),
        }
    }

    /// Return the active provider, constructing it on first use.
    pub async fn resolve(&self) -> Result<Arc<dyn TranslationProvider>> {
        if let Some(ref provider) = self.state.read().await.active {
            return Ok(provider.clone());
        }

        let mut state = self.state.write().await;
        self.construct(&mut state).await
    }

    /// Tear down the active provider, releasing its resources.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        Self::teardown(&mut state).await;
    }

    /// Switch to another engine and construct it immediately.
    ///
    /// On construction failure the registry is left unresolved with the new
    /// engine selected, so the next `resolve` retries it.
    pub async fn switch_engine(&self, kind: EngineKind) -> Result<Arc<dyn TranslationProvider>> {
        info!("Switching translation engine to: {}", kind);

        let mut state = self.state.write().await;
        state.config.engine = kind;
        Self::teardown(&mut state).await;
        let provider = self.construct(&mut state).await?;

        info!("Translation engine switched successfully to: {}", kind);
        Ok(provider)
    }

    /// Replace the configuration. The active provider is torn down and the
    /// next `resolve` builds one from the new settings.
    pub async fn reconfigure(&self, config: Config) {
        let mut state = self.state.write().await;
        Self::teardown(&mut state).await;
        state.config = config;
    }

    pub async fn shutdown(&self) {
        self.reset().await;
    }

    pub async fn engine(&self) -> EngineKind {
        self.state.read().await.config.engine
    }

    pub async fn is_resolved(&self) -> bool {
        self.state.read().await.active.is_some()
    }

    pub async fn engine_status(&self) -> EngineStatus {
        self.state.read().await.config.engine_status()
    }

    async fn construct(&self, state: &mut RegistryState) -> Result<Arc<dyn TranslationProvider>> {
        if let Some(ref provider) = state.active {
            return Ok(provider.clone());
        }

        let kind = state.config.engine;
        info!("Initializing translation engine: {}", kind);

        match self.factory.create(kind, &state.config).await {
            Ok(provider) => {
                info!(
                    "Translation engine initialized successfully: {} ({})",
                    kind,
                    provider.name()
                );
                state.active = Some(provider.clone());
                Ok(provider)
            }
            Err(e) => {
                error!("Failed to initialize translation engine {}: {}", kind, e);
                Err(e)
            }
        }
    }

    async fn teardown(state: &mut RegistryState) {
        if let Some(provider) = state.active.take() {
            provider.release().await;
            info!("Translation provider reset");
        }
    }
}
