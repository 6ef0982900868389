//! Request and response envelopes around the translation core.

use crate::config::Limits;
use crate::provider::LanguageCatalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-shape violations caught before the core sees a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Text must not be empty")]
    EmptyText,

    #[error("Text is {length} characters long (max {max})")]
    TextTooLong { length: usize, max: usize },

    #[error("Batch must contain at least one text")]
    EmptyBatch,

    #[error("Batch has {count} texts (max {max})")]
    BatchTooLarge { count: usize, max: usize },

    #[error("Batch item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
}

impl RequestError {
    pub fn status_code(&self) -> u16 {
        422
    }
}

fn check_text(text: &str, limits: &Limits) -> Result<(), RequestError> {
    if text.is_empty() {
        return Err(RequestError::EmptyText);
    }
    let length = text.chars().count();
    if length > limits.max_text_length {
        return Err(RequestError::TextTooLong {
            length,
            max: limits.max_text_length,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    pub fn validate(&self, limits: &Limits) -> Result<(), RequestError> {
        check_text(&self.text, limits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTranslationRequest {
    pub texts: Vec<String>,
    pub source_language: String,
    pub target_language: String,
}

impl BatchTranslationRequest {
    pub fn new(
        texts: Vec<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            texts,
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    pub fn validate(&self, limits: &Limits) -> Result<(), RequestError> {
        if self.texts.is_empty() {
            return Err(RequestError::EmptyBatch);
        }
        if self.texts.len() > limits.max_batch_size {
            return Err(RequestError::BatchTooLarge {
                count: self.texts.len(),
                max: limits.max_batch_size,
            });
        }
        for (index, text) in self.texts.iter().enumerate() {
            check_text(text, limits).map_err(|e| RequestError::InvalidItem {
                index,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub engine_name: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTranslationResult {
    pub original_texts: Vec<String>,
    pub translated_texts: Vec<String>,
    pub source_language: String,
    pub target_language: String,
    pub engine_name: String,
    pub count: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagesResult {
    pub languages: LanguageCatalog,
    pub engine: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub engine: String,
    pub checked_at: DateTime<Utc>,
    pub response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request_bounds() {
        let limits = Limits {
            max_text_length: 5,
            max_batch_size: 2,
        };
        assert!(TranslationRequest::new("hello", "en", "es").validate(&limits).is_ok());
        assert_eq!(
            TranslationRequest::new("", "en", "es").validate(&limits),
            Err(RequestError::EmptyText)
        );
        assert_eq!(
            TranslationRequest::new("hello!", "en", "es").validate(&limits),
            Err(RequestError::TextTooLong { length: 6, max: 5 })
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let limits = Limits {
            max_text_length: 2,
            max_batch_size: 1,
        };
        // two characters, six bytes
        assert!(TranslationRequest::new("日本", "ja", "en").validate(&limits).is_ok());
    }

    #[test]
    fn test_batch_request_bounds() {
        let limits = Limits {
            max_text_length: 10,
            max_batch_size: 2,
        };
        let batch = |texts: &[&str]| {
            BatchTranslationRequest::new(texts.iter().map(|t| t.to_string()).collect(), "en", "es")
        };

        assert!(batch(&["a", "b"]).validate(&limits).is_ok());
        assert_eq!(batch(&[]).validate(&limits), Err(RequestError::EmptyBatch));
        assert_eq!(
            batch(&["a", "b", "c"]).validate(&limits),
            Err(RequestError::BatchTooLarge { count: 3, max: 2 })
        );
        assert!(matches!(
            batch(&["a", ""]).validate(&limits),
            Err(RequestError::InvalidItem { index: 1, .. })
        ));
    }

    #[test]
    fn test_health_report_omits_missing_error() {
        let report = HealthReport {
            healthy: true,
            engine: "Google Cloud Translation".to_string(),
            checked_at: Utc::now(),
            response_time_ms: 12.5,
            error: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"healthy\":true"));
    }
}
