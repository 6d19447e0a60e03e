//! Model capability
//!
//! The pipeline never talks to model weights directly. Everything the model
//! does (conditioning, code generation, decoding, speaker embedding) goes
//! through [`Synthesizer`], so the request path can run against the
//! exported ONNX graphs in production and a deterministic stand-in in tests.

mod simple;

#[cfg(feature = "onnx")]
mod onnx;

pub use simple::SimpleSynthesizer;

#[cfg(feature = "onnx")]
pub use onnx::OnnxSynthesizer;

use zonos_tts_config::SynthesisConfig;
use zonos_tts_core::{AcousticCodes, ConditionRequest, Conditioning, Result, Waveform};

/// Generation parameters passed to [`Synthesizer::generate`]
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated frames
    pub max_new_tokens: usize,
    /// Classifier-free guidance scale
    pub cfg_scale: f32,
}

impl From<&SynthesisConfig> for GenerationParams {
    fn from(config: &SynthesisConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            cfg_scale: config.cfg_scale,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&SynthesisConfig::default())
    }
}

/// Input/output names of one loaded graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInfo {
    pub role: &'static str,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// A text-to-speech model.
///
/// Calls are blocking and may be CPU/accelerator heavy; callers run them off
/// the async executor. Implementations must tolerate concurrent calls, or
/// the pipeline must be configured to serialize them.
pub trait Synthesizer: Send + Sync {
    /// Short identifier for logs and the readiness endpoint
    fn name(&self) -> &str;

    /// Sample rate of waveforms returned by [`Synthesizer::decode`]
    fn sample_rate(&self) -> u32;

    /// Extract a voice embedding from a reference recording
    fn embed_speaker(&self, waveform: &Waveform) -> Result<Vec<f32>>;

    /// Turn text, language and optional speaker into conditioning
    fn prepare(&self, request: &ConditionRequest) -> Result<Conditioning>;

    /// Generate acoustic codes, never more than `params.max_new_tokens` frames
    fn generate(&self, conditioning: &Conditioning, params: &GenerationParams) -> Result<AcousticCodes>;

    /// Decode acoustic codes into audio
    fn decode(&self, codes: &AcousticCodes) -> Result<Waveform>;

    /// Graphs backing this model, if any
    fn graphs(&self) -> Vec<GraphInfo> {
        Vec::new()
    }
}
