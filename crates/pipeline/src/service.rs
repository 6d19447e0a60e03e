//! Synthesis service
//!
//! What the HTTP layer calls: one model, one pipeline, an optional result
//! cache and reference-audio loading.

use std::path::Path;

use zonos_tts_config::Settings;
use zonos_tts_core::{AudioBuffer, ConditionRequest, Result, SpeakerEmbedding};

use crate::audio::decode_audio_file;
use crate::cache::{CacheKey, CacheSnapshot, ResultCache};
use crate::{ModelHandle, SpeakerEmbedder, SynthesisPipeline};

pub struct SynthesisService {
    model: ModelHandle,
    pipeline: SynthesisPipeline,
    embedder: SpeakerEmbedder,
    cache: Option<ResultCache>,
    reference_max_bytes: u64,
}

impl SynthesisService {
    pub fn new(model: ModelHandle, settings: &Settings) -> Self {
        let synthesizer = model.synthesizer();
        let cache = settings
            .cache
            .enabled
            .then(|| ResultCache::new(settings.cache.capacity));

        Self {
            pipeline: SynthesisPipeline::new(synthesizer.clone(), &settings.synthesis),
            embedder: SpeakerEmbedder::new(synthesizer),
            cache,
            reference_max_bytes: settings.reference_audio.max_bytes,
            model,
        }
    }

    /// Synthesize `request`, serving repeats from the cache when enabled. Blocking.
    pub fn synthesize(&self, request: &ConditionRequest) -> Result<AudioBuffer> {
        match &self.cache {
            Some(cache) => cache.get_or_compute(CacheKey::for_request(request), || {
                self.pipeline.synthesize(request)
            }),
            None => self.pipeline.synthesize(request),
        }
    }

    /// Decode the recording at `path` and extract its voice. Blocking.
    pub fn embed_reference(&self, path: &Path) -> Result<SpeakerEmbedding> {
        let (waveform, id) = decode_audio_file(path, self.reference_max_bytes)?;
        self.embedder.embed(&waveform, id)
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.pipeline.sample_rate()
    }

    pub fn cache_stats(&self) -> Option<CacheSnapshot> {
        self.cache.as_ref().map(ResultCache::snapshot)
    }
}

impl std::fmt::Debug for SynthesisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisService")
            .field("model", &self.model)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}
