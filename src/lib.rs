pub mod config;
pub mod error;
pub mod interactive;
pub mod languages;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod service;

pub use config::{Config, EngineKind};
pub use error::{Result, Severity, TranslateError};
pub use provider::{LanguageCatalog, TranslationProvider};
pub use registry::{EngineFactory, ProviderFactory, ProviderRegistry};
pub use schema::{
    BatchTranslationRequest, BatchTranslationResult, HealthReport, LanguagesResult,
    TranslationRequest, TranslationResult,
};
pub use service::TranslationService;
