//! Model handle
//!
//! The model is loaded once at startup and shared read-only by every
//! request for the life of the process.

use std::sync::Arc;
use std::time::Instant;

use zonos_tts_config::{ModelBackend, ModelsConfig, PhonemizerConfig};
use zonos_tts_core::Result;

use crate::{GraphInfo, SimpleSynthesizer, Synthesizer};

/// Shared handle to the loaded model
#[derive(Clone)]
pub struct ModelHandle {
    synthesizer: Arc<dyn Synthesizer>,
}

impl ModelHandle {
    /// Load the configured backend producing audio at `sample_rate`
    pub fn load(models: &ModelsConfig, phonemizer: &PhonemizerConfig, sample_rate: u32) -> Result<Self> {
        let started = Instant::now();

        let synthesizer: Arc<dyn Synthesizer> = match models.backend {
            ModelBackend::Simple => Arc::new(SimpleSynthesizer::new(sample_rate)),
            ModelBackend::Onnx => Self::load_onnx(models, phonemizer, sample_rate)?,
        };

        tracing::info!(
            model = synthesizer.name(),
            sample_rate,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model ready"
        );

        Ok(Self { synthesizer })
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(
        models: &ModelsConfig,
        phonemizer: &PhonemizerConfig,
        sample_rate: u32,
    ) -> Result<Arc<dyn Synthesizer>> {
        let synthesizer = crate::OnnxSynthesizer::load(models, phonemizer, sample_rate)?;
        Ok(Arc::new(synthesizer))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(
        _models: &ModelsConfig,
        _phonemizer: &PhonemizerConfig,
        _sample_rate: u32,
    ) -> Result<Arc<dyn Synthesizer>> {
        Err(zonos_tts_core::Error::ModelLoad(
            "built without onnx support; enable the `onnx` feature or set models.backend = \"simple\""
                .to_string(),
        ))
    }

    /// Wrap an already constructed model
    pub fn from_synthesizer(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    pub fn synthesizer(&self) -> Arc<dyn Synthesizer> {
        self.synthesizer.clone()
    }

    pub fn name(&self) -> &str {
        self.synthesizer.name()
    }

    pub fn sample_rate(&self) -> u32 {
        self.synthesizer.sample_rate()
    }

    pub fn graphs(&self) -> Vec<GraphInfo> {
        self.synthesizer.graphs()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.synthesizer.name())
            .field("sample_rate", &self.synthesizer.sample_rate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonos_tts_core::Error;

    #[test]
    fn test_load_simple_backend() {
        let models = ModelsConfig {
            backend: ModelBackend::Simple,
            ..Default::default()
        };
        let handle = ModelHandle::load(&models, &PhonemizerConfig::default(), 24_000).unwrap();
        assert_eq!(handle.name(), "simple");
        assert_eq!(handle.sample_rate(), 24_000);
        assert!(handle.graphs().is_empty());
    }

    #[test]
    fn test_onnx_backend_without_models_fails() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelsConfig {
            backend: ModelBackend::Onnx,
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let err = ModelHandle::load(&models, &PhonemizerConfig::default(), 44_100).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(_)));
    }
}
