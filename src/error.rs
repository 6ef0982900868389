use thiserror::Error;

/// Coarse failure class used by outer layers to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    ClientFault,
    DependencyFault,
    Fatal,
    Throttled,
}

/// Every failure the translation core can produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("{0}")]
    InvalidLanguagePair(String),

    #[error("Translation engine error ({engine}): {message}")]
    EngineUnavailable { engine: String, message: String },

    #[error("Failed to load model: {model} ({reason})")]
    ModelLoadFailure { model: String, reason: String },

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
}

impl TranslateError {
    pub fn unsupported_pair(source: &str, target: &str) -> Self {
        TranslateError::InvalidLanguagePair(format!(
            "Language pair {}->{} not supported",
            source, target
        ))
    }

    pub fn engine(engine: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::EngineUnavailable {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn model_load(model: impl Into<String>, reason: impl Into<String>) -> Self {
        TranslateError::ModelLoadFailure {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            TranslateError::InvalidLanguagePair(_) => Severity::ClientFault,
            TranslateError::EngineUnavailable { .. } => Severity::DependencyFault,
            TranslateError::ModelLoadFailure { .. } => Severity::Fatal,
            TranslateError::RateLimited => Severity::Throttled,
        }
    }

    /// HTTP status an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.severity() {
            Severity::ClientFault => 400,
            Severity::DependencyFault => 503,
            Severity::Fatal => 500,
            Severity::Throttled => 429,
        }
    }

    /// Short machine-checkable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::InvalidLanguagePair(_) => "InvalidLanguagePair",
            TranslateError::EngineUnavailable { .. } => "EngineUnavailable",
            TranslateError::ModelLoadFailure { .. } => "ModelLoadFailure",
            TranslateError::RateLimited => "RateLimited",
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;
