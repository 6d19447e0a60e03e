//! Core types for the Zonos TTS service
//!
//! This crate provides foundational types used across all other crates:
//! - Language tags understood by the model
//! - Speaker embeddings, conditioning and acoustic codes
//! - Waveforms and encoded audio buffers
//! - Error types

pub mod audio;
pub mod error;
pub mod language;
pub mod synthesis;

pub use audio::{AudioBuffer, Waveform, WAV_MIME_TYPE};
pub use error::{Error, Result, SynthesisStage};
pub use language::{LanguageTag, SUPPORTED_LANGUAGES};
pub use synthesis::{AcousticCodes, ConditionRequest, Conditioning, SpeakerEmbedding, SpeakerId};
