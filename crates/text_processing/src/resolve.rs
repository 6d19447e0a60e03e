//! Language resolution for synthesis requests
//!
//! Requests may carry an explicit language. When they don't, the text is run
//! through the [`ScriptDetector`]. Tags the model has no embedding for, from
//! either source, fall back to the configured default. Resolution never fails.

use zonos_tts_config::{EndpointConfig, LanguageConfig};
use zonos_tts_core::LanguageTag;

use crate::ScriptDetector;

/// Where a resolved language came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSource {
    /// Given by the caller
    Explicit,
    /// Identified from the text
    Detected,
    /// Detection disabled, default used
    Default,
    /// Caller's tag or detection was unusable, default used
    Fallback,
}

impl LanguageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageSource::Explicit => "explicit",
            LanguageSource::Detected => "detected",
            LanguageSource::Default => "default",
            LanguageSource::Fallback => "fallback",
        }
    }
}

/// Outcome of language resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub language: LanguageTag,
    pub source: LanguageSource,
    /// Detector confidence, when detection ran
    pub confidence: Option<f32>,
}

/// Resolves the language of a request
#[derive(Debug, Clone)]
pub struct LanguageResolver {
    detector: ScriptDetector,
    default_language: LanguageTag,
    detection: bool,
    min_confidence: f32,
}

impl LanguageResolver {
    pub fn new(config: &LanguageConfig) -> Self {
        Self {
            detector: ScriptDetector::new(config.max_scan_chars),
            default_language: config.default.clone(),
            detection: config.detection,
            min_confidence: config.min_confidence,
        }
    }

    /// Build a resolver from endpoint settings, keeping the detector tuning from `config`
    pub fn for_endpoint(endpoint: &EndpointConfig, config: &LanguageConfig) -> Self {
        Self {
            detector: ScriptDetector::new(config.max_scan_chars),
            default_language: endpoint.default_language.clone(),
            detection: endpoint.language_detection,
            min_confidence: config.min_confidence,
        }
    }

    pub fn default_language(&self) -> &LanguageTag {
        &self.default_language
    }

    /// Resolve the language for `text`, preferring an explicit tag
    pub fn resolve(&self, explicit: Option<&str>, text: &str) -> Resolution {
        if let Some(raw) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            match LanguageTag::parse(raw) {
                Ok(language) if language.is_supported() => {
                    return Resolution {
                        language,
                        source: LanguageSource::Explicit,
                        confidence: None,
                    };
                }
                Ok(language) => {
                    tracing::warn!(
                        language = %language,
                        default = %self.default_language,
                        "Language not known to the model, using default"
                    );
                    return self.fallback(None);
                }
                Err(e) => {
                    tracing::warn!(language = raw, error = %e, "Ignoring unusable language tag");
                    return self.fallback(None);
                }
            }
        }

        if !self.detection {
            return Resolution {
                language: self.default_language.clone(),
                source: LanguageSource::Default,
                confidence: None,
            };
        }

        match self.detector.detect_with_confidence(text) {
            Some((language, confidence))
                if confidence >= self.min_confidence && language.is_supported() =>
            {
                tracing::debug!(language = %language, confidence, "Detected language");
                Resolution {
                    language,
                    source: LanguageSource::Detected,
                    confidence: Some(confidence),
                }
            }
            Some((language, confidence)) => {
                tracing::warn!(
                    language = %language,
                    confidence,
                    "Language detection inconclusive, using default"
                );
                self.fallback(Some(confidence))
            }
            None => {
                tracing::warn!("Language detection failed, using default");
                self.fallback(None)
            }
        }
    }

    fn fallback(&self, confidence: Option<f32>) -> Resolution {
        Resolution {
            language: self.default_language.clone(),
            source: LanguageSource::Fallback,
            confidence,
        }
    }
}

impl Default for LanguageResolver {
    fn default() -> Self {
        Self::new(&LanguageConfig::default())
    }
}
