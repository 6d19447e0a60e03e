//! Values that flow between the condition builder, the model and the cache

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::LanguageTag;

/// Stable identity of a reference voice: SHA-256 of the source audio bytes.
///
/// Used as the speaker part of a cache key in place of the embedding
/// itself, which is a float vector and neither hashable nor stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeakerId(String);

impl SpeakerId {
    /// Content hash of raw audio bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Voice embedding extracted from a reference recording
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerEmbedding {
    id: SpeakerId,
    vector: Arc<[f32]>,
}

impl SpeakerEmbedding {
    pub fn new(id: SpeakerId, vector: impl Into<Arc<[f32]>>) -> Self {
        Self {
            id,
            vector: vector.into(),
        }
    }

    pub fn id(&self) -> &SpeakerId {
        &self.id
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// Everything the condition builder needs for one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRequest {
    pub text: String,
    pub language: LanguageTag,
    pub speaker: Option<SpeakerEmbedding>,
}

impl ConditionRequest {
    pub fn new(text: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            text: text.into(),
            language,
            speaker: None,
        }
    }

    pub fn with_speaker(mut self, speaker: SpeakerEmbedding) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn speaker_id(&self) -> Option<&SpeakerId> {
        self.speaker.as_ref().map(|s| s.id())
    }
}

/// Opaque conditioning tensor produced by the model's prepare step
#[derive(Debug, Clone, PartialEq)]
pub struct Conditioning {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Conditioning {
    /// Returns `None` when the data length does not match the shape
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Option<Self> {
        let expected: usize = shape.iter().product();
        (expected == data.len()).then_some(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Discrete codec tokens laid out as `codebooks x frames`, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcousticCodes {
    codebooks: usize,
    frames: usize,
    tokens: Vec<i64>,
}

impl AcousticCodes {
    /// Returns `None` when `tokens.len() != codebooks * frames`
    pub fn new(codebooks: usize, frames: usize, tokens: Vec<i64>) -> Option<Self> {
        (codebooks * frames == tokens.len()).then_some(Self {
            codebooks,
            frames,
            tokens,
        })
    }

    pub fn codebooks(&self) -> usize {
        self.codebooks
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn tokens(&self) -> &[i64] {
        &self.tokens
    }

    /// Token of `codebook` at `frame`
    pub fn get(&self, codebook: usize, frame: usize) -> Option<i64> {
        if codebook >= self.codebooks || frame >= self.frames {
            return None;
        }
        self.tokens.get(codebook * self.frames + frame).copied()
    }

    /// Keep at most `max_frames` frames of every codebook
    pub fn truncate(&mut self, max_frames: usize) {
        if max_frames >= self.frames {
            return;
        }

        let mut kept = Vec::with_capacity(self.codebooks * max_frames);
        for row in self.tokens.chunks(self.frames) {
            kept.extend_from_slice(&row[..max_frames]);
        }

        self.tokens = kept;
        self.frames = max_frames;
    }
}
