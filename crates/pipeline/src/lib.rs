//! Speech synthesis pipeline
//!
//! Components:
//! - Synthesizer: the model capability (ONNX graphs or a deterministic stand-in)
//! - Audio: reference decoding, resampling, WAV encoding
//! - Speaker/Condition: reference voice embedding and request conditioning
//! - Pipeline: prepare, generate, decode, encode
//! - Cache: LRU of finished results
//! - Service: the entry point used by the HTTP layer

pub mod audio;
pub mod cache;
pub mod condition;
pub mod handle;
pub mod phonemizer;
pub mod pipeline;
pub mod service;
pub mod speaker;
pub mod synthesizer;

pub use audio::{decode_audio_file, encode_wav, resample_linear};
pub use cache::{CacheKey, CacheSnapshot, CacheStats, ResultCache};
pub use condition::ConditionBuilder;
pub use handle::ModelHandle;
pub use phonemizer::{EspeakPhonemizer, PhonemeVocabulary};
pub use pipeline::SynthesisPipeline;
pub use service::SynthesisService;
pub use speaker::SpeakerEmbedder;
pub use synthesizer::{GenerationParams, GraphInfo, SimpleSynthesizer, Synthesizer};

#[cfg(feature = "onnx")]
pub use synthesizer::OnnxSynthesizer;
