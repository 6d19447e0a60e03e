//! Synthesis pipeline
//!
//! prepare -> generate -> decode -> encode, run to completion on the
//! calling thread. Each stage failure is reported with the stage name and
//! nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use zonos_tts_config::SynthesisConfig;
use zonos_tts_core::{AudioBuffer, ConditionRequest, Error, Result, SynthesisStage};

use crate::audio::encode_wav;
use crate::condition::{at_stage, ConditionBuilder};
use crate::{GenerationParams, Synthesizer};

pub struct SynthesisPipeline {
    synthesizer: Arc<dyn Synthesizer>,
    builder: ConditionBuilder,
    params: GenerationParams,
    sample_rate: u32,
    /// Present when the model must not run concurrently
    guard: Option<Mutex<()>>,
}

impl SynthesisPipeline {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, config: &SynthesisConfig) -> Self {
        Self {
            builder: ConditionBuilder::new(synthesizer.clone()),
            synthesizer,
            params: GenerationParams::from(config),
            sample_rate: config.sample_rate,
            guard: config.serialize_inference.then(|| Mutex::new(())),
        }
    }

    /// Output sample rate every result is checked against
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Produce a complete WAV file for `request`. Blocking.
    pub fn synthesize(&self, request: &ConditionRequest) -> Result<AudioBuffer> {
        let _guard = self.guard.as_ref().map(|m| m.lock());
        let started = Instant::now();

        let conditioning = self.builder.build(request)?;

        let mut codes = self
            .synthesizer
            .generate(&conditioning, &self.params)
            .map_err(|e| at_stage(SynthesisStage::Generate, e))?;

        if codes.frames() > self.params.max_new_tokens {
            tracing::warn!(
                frames = codes.frames(),
                max_new_tokens = self.params.max_new_tokens,
                "Model exceeded token budget, truncating"
            );
            codes.truncate(self.params.max_new_tokens);
        }
        if codes.frames() == 0 {
            return Err(Error::synthesis(
                SynthesisStage::Generate,
                "model produced no acoustic codes",
            ));
        }

        let waveform = self
            .synthesizer
            .decode(&codes)
            .map_err(|e| at_stage(SynthesisStage::Decode, e))?;

        if waveform.sample_rate != self.sample_rate {
            return Err(Error::synthesis(
                SynthesisStage::Decode,
                format!(
                    "decoder produced {} Hz, expected {} Hz",
                    waveform.sample_rate, self.sample_rate
                ),
            ));
        }
        if waveform.is_empty() {
            return Err(Error::synthesis(SynthesisStage::Decode, "decoder produced no samples"));
        }

        let buffer = encode_wav(&waveform).map_err(|e| at_stage(SynthesisStage::Encode, e))?;

        tracing::info!(
            model = self.synthesizer.name(),
            language = %request.language,
            speaker = request.speaker_id().map(|s| s.short()).unwrap_or("neutral"),
            chars = request.text.chars().count(),
            frames = codes.frames(),
            audio_ms = buffer.duration_ms(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesized speech"
        );

        Ok(buffer)
    }
}
