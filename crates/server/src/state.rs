//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use zonos_tts_config::{EndpointConfig, Settings};
use zonos_tts_pipeline::{ModelHandle, SynthesisService};
use zonos_tts_text_processing::LanguageResolver;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Cache and language behaviour of `/tts`
    pub endpoint: EndpointConfig,
    /// Model, pipeline and result cache
    pub service: Arc<SynthesisService>,
    /// Language resolution for requests
    pub resolver: Arc<LanguageResolver>,
}

impl AppState {
    /// Create new application state around a loaded model
    pub fn new(config: Settings, model: ModelHandle) -> Self {
        let endpoint = config.endpoint();
        let resolver = LanguageResolver::for_endpoint(&endpoint, &config.language);
        let service = SynthesisService::new(model, &config);

        Self {
            config: Arc::new(config),
            endpoint,
            service: Arc::new(service),
            resolver: Arc::new(resolver),
        }
    }
}
