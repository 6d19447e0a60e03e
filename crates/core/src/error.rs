//! Error types for the TTS service

use std::fmt;

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the synthesis pipeline that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisStage {
    /// Building the conditioning from text, language and speaker
    Prepare,
    /// Autoregressive generation of acoustic codes
    Generate,
    /// Decoding acoustic codes into a waveform
    Decode,
    /// Encoding the waveform into an audio container
    Encode,
}

impl SynthesisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStage::Prepare => "prepare",
            SynthesisStage::Generate => "generate",
            SynthesisStage::Decode => "decode",
            SynthesisStage::Encode => "encode",
        }
    }
}

impl fmt::Display for SynthesisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the TTS service
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected before any model call (missing text, empty text)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A request input (reference audio) could not be loaded or embedded
    #[error("Input error: {0}")]
    Input(String),

    /// The model failed while synthesizing
    #[error("Synthesis failed at {stage}: {message}")]
    Synthesis {
        stage: SynthesisStage,
        message: String,
    },

    /// Synthesis exceeded the configured wall-clock budget
    #[error("Synthesis timed out after {0}s")]
    Timeout(u64),

    /// Model weights could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// External phonemizer failed
    #[error("Phonemizer error: {0}")]
    Phonemizer(String),

    /// Audio decoding / encoding / resampling errors
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a model failure with the stage it happened in
    pub fn synthesis(stage: SynthesisStage, message: impl Into<String>) -> Self {
        Error::Synthesis {
            stage,
            message: message.into(),
        }
    }

    /// Short machine-readable name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Input(_) => "reference_audio",
            Error::Synthesis { stage, .. } => stage.as_str(),
            Error::Timeout(_) => "timeout",
            Error::ModelLoad(_) => "model_load",
            Error::Phonemizer(_) => "phonemizer",
            Error::Audio(_) => "audio",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }

    /// True for errors caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
