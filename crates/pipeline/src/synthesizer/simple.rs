//! Deterministic synthesizer for tests and model-free deployments

use std::f32::consts::TAU;

use zonos_tts_core::{
    AcousticCodes, ConditionRequest, Conditioning, Error, Result, SynthesisStage, Waveform,
};

use super::{GenerationParams, Synthesizer};

/// Codec frames per second of audio
const FRAME_RATE: u32 = 86;
const CODEBOOKS: usize = 9;
const CODEBOOK_SIZE: i64 = 1024;
const FRAMES_PER_CHAR: usize = 4;

/// Synthesizer that renders tones derived from the input text.
///
/// Output depends only on the request, so equal requests give equal bytes.
#[derive(Debug, Clone)]
pub struct SimpleSynthesizer {
    sample_rate: u32,
    embedding_dim: usize,
}

impl SimpleSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            embedding_dim: 128,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

impl Default for SimpleSynthesizer {
    fn default() -> Self {
        Self::new(44_100)
    }
}

impl Synthesizer for SimpleSynthesizer {
    fn name(&self) -> &str {
        "simple"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn embed_speaker(&self, waveform: &Waveform) -> Result<Vec<f32>> {
        if waveform.is_empty() {
            return Err(Error::Input("reference audio has no samples".to_string()));
        }

        let mut embedding = vec![0.0f32; self.embedding_dim];
        for (i, s) in waveform.samples.iter().enumerate() {
            embedding[i % self.embedding_dim] += s.abs();
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        Ok(embedding)
    }

    fn prepare(&self, request: &ConditionRequest) -> Result<Conditioning> {
        let bias = request
            .speaker
            .as_ref()
            .map(|s| s.vector().iter().sum::<f32>() / s.dim().max(1) as f32)
            .unwrap_or(0.0);

        let language = request
            .language
            .model_id()
            .map(|id| id as f32)
            .unwrap_or(-1.0);

        let mut data = Vec::with_capacity(request.text.len() + 1);
        data.push(language);
        data.extend(
            request
                .text
                .chars()
                .map(|c| (c as u32 % CODEBOOK_SIZE as u32) as f32 / CODEBOOK_SIZE as f32 + bias),
        );

        let len = data.len();
        Conditioning::new(vec![1, len], data).ok_or_else(|| {
            Error::synthesis(SynthesisStage::Prepare, "conditioning shape mismatch")
        })
    }

    fn generate(&self, conditioning: &Conditioning, params: &GenerationParams) -> Result<AcousticCodes> {
        let data = conditioning.data();
        let symbols = if data.len() > 1 { &data[1..] } else { data };
        if symbols.is_empty() {
            return Err(Error::synthesis(SynthesisStage::Generate, "empty conditioning"));
        }

        let frames = (symbols.len() * FRAMES_PER_CHAR).min(params.max_new_tokens);
        let mut tokens = Vec::with_capacity(CODEBOOKS * frames);
        for cb in 0..CODEBOOKS {
            for f in 0..frames {
                let symbol = symbols[(f / FRAMES_PER_CHAR) % symbols.len()];
                let base = (symbol * CODEBOOK_SIZE as f32) as i64;
                tokens.push((base + cb as i64 * 31 + f as i64).rem_euclid(CODEBOOK_SIZE));
            }
        }

        AcousticCodes::new(CODEBOOKS, frames, tokens)
            .ok_or_else(|| Error::synthesis(SynthesisStage::Generate, "code shape mismatch"))
    }

    fn decode(&self, codes: &AcousticCodes) -> Result<Waveform> {
        let samples_per_frame = (self.sample_rate / FRAME_RATE).max(1) as usize;
        let mut samples = Vec::with_capacity(codes.frames() * samples_per_frame);
        let mut phase = 0.0f32;

        for frame in 0..codes.frames() {
            let token = codes.get(0, frame).unwrap_or(0);
            let freq = 110.0 + (token % 32) as f32 * 15.0;
            let step = TAU * freq / self.sample_rate as f32;
            for _ in 0..samples_per_frame {
                samples.push(0.3 * phase.sin());
                phase = (phase + step) % TAU;
            }
        }

        Ok(Waveform::new(samples, self.sample_rate))
    }
}
