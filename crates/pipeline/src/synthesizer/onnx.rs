//! Zonos exported as four ONNX graphs
//!
//! | role            | inputs                                            | outputs               |
//! |-----------------|---------------------------------------------------|-----------------------|
//! | conditioner     | phoneme_ids, language_id, speaker_embedding       | prefix_conditioning   |
//! | generator       | prefix_conditioning                               | out_codes `[1, 9, T]` |
//! | decoder         | codes `[1, 9, T]`                                 | waveform              |
//! | speaker_encoder | waveform `[1, N]` at 16 kHz                       | speaker_embedding     |

use std::path::Path;

use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use ort::{CUDAExecutionProvider, GraphOptimizationLevel, Session};

use zonos_tts_config::{Device, ModelsConfig, PhonemizerConfig};
use zonos_tts_core::{
    AcousticCodes, ConditionRequest, Conditioning, Error, Result, SynthesisStage, Waveform,
};

use super::{GenerationParams, GraphInfo, Synthesizer};
use crate::audio::resample_linear;
use crate::phonemizer::{EspeakPhonemizer, PhonemeVocabulary};

const SPEAKER_ENCODER_RATE: u32 = 16_000;
const SPEAKER_DIM: usize = 128;

const CONDITIONER_IO: (&[&str], &[&str]) = (
    &["phoneme_ids", "language_id", "speaker_embedding"],
    &["prefix_conditioning"],
);
const GENERATOR_IO: (&[&str], &[&str]) = (&["prefix_conditioning"], &["out_codes"]);
const DECODER_IO: (&[&str], &[&str]) = (&["codes"], &["waveform"]);
const SPEAKER_ENCODER_IO: (&[&str], &[&str]) = (&["waveform"], &["speaker_embedding"]);

fn model_error(e: impl std::fmt::Display) -> Error {
    Error::ModelLoad(e.to_string())
}

/// Zonos running on ONNX Runtime
pub struct OnnxSynthesizer {
    conditioner: Session,
    generator: Session,
    decoder: Session,
    speaker_encoder: Session,
    phonemizer: EspeakPhonemizer,
    vocabulary: PhonemeVocabulary,
    sample_rate: u32,
}

impl OnnxSynthesizer {
    /// Load all four graphs and check their input/output names
    pub fn load(models: &ModelsConfig, phonemizer: &PhonemizerConfig, sample_rate: u32) -> Result<Self> {
        let conditioner = Self::load_session(&models.conditioner_path(), models)?;
        let generator = Self::load_session(&models.generator_path(), models)?;
        let decoder = Self::load_session(&models.decoder_path(), models)?;
        let speaker_encoder = Self::load_session(&models.speaker_encoder_path(), models)?;

        check_io("conditioner", &conditioner, CONDITIONER_IO)?;
        check_io("generator", &generator, GENERATOR_IO)?;
        check_io("decoder", &decoder, DECODER_IO)?;
        check_io("speaker_encoder", &speaker_encoder, SPEAKER_ENCODER_IO)?;

        tracing::info!(
            dir = %models.dir.display(),
            device = ?models.device,
            sample_rate,
            "Loaded Zonos ONNX graphs"
        );

        Ok(Self {
            conditioner,
            generator,
            decoder,
            speaker_encoder,
            phonemizer: EspeakPhonemizer::new(phonemizer),
            vocabulary: PhonemeVocabulary::new(),
            sample_rate,
        })
    }

    fn load_session(path: &Path, models: &ModelsConfig) -> Result<Session> {
        if !path.is_file() {
            return Err(Error::ModelLoad(format!("model file not found: {}", path.display())));
        }

        let mut builder = Session::builder()
            .map_err(model_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_error)?
            .with_intra_threads(models.intra_threads)
            .map_err(model_error)?;

        if models.device == Device::Cuda {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(model_error)?;
        }

        builder
            .commit_from_file(path)
            .map_err(|e| Error::ModelLoad(format!("Failed to load {}: {}", path.display(), e)))
    }
}

fn check_io(role: &str, session: &Session, (inputs, outputs): (&[&str], &[&str])) -> Result<()> {
    for name in inputs {
        if !session.inputs.iter().any(|i| i.name == *name) {
            return Err(Error::ModelLoad(format!("{} graph has no input '{}'", role, name)));
        }
    }
    for name in outputs {
        if !session.outputs.iter().any(|o| o.name == *name) {
            return Err(Error::ModelLoad(format!("{} graph has no output '{}'", role, name)));
        }
    }
    Ok(())
}

fn graph_info(role: &'static str, session: &Session) -> GraphInfo {
    GraphInfo {
        role,
        inputs: session.inputs.iter().map(|i| i.name.clone()).collect(),
        outputs: session.outputs.iter().map(|o| o.name.clone()).collect(),
    }
}

impl Synthesizer for OnnxSynthesizer {
    fn name(&self) -> &str {
        "zonos-onnx"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn embed_speaker(&self, waveform: &Waveform) -> Result<Vec<f32>> {
        let samples = resample_linear(&waveform.samples, waveform.sample_rate, SPEAKER_ENCODER_RATE)?;
        if samples.is_empty() {
            return Err(Error::Input("reference audio has no samples".to_string()));
        }

        let input = Array2::from_shape_vec((1, samples.len()), samples)
            .map_err(|e| Error::Input(e.to_string()))?;

        let outputs = self
            .speaker_encoder
            .run(ort::inputs!["waveform" => input.view()].map_err(|e| Error::Input(e.to_string()))?)
            .map_err(|e| Error::Input(format!("Speaker encoder failed: {}", e)))?;

        let embedding = outputs
            .get("speaker_embedding")
            .ok_or_else(|| Error::Input("Missing speaker_embedding output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Input(e.to_string()))?;

        Ok(embedding.view().iter().copied().collect())
    }

    fn prepare(&self, request: &ConditionRequest) -> Result<Conditioning> {
        let stage = |e: ort::Error| Error::synthesis(SynthesisStage::Prepare, e.to_string());

        let ipa = self.phonemizer.phonemize(&request.text, &request.language)?;
        let ids = self.vocabulary.encode(&ipa);

        let language_id = request.language.model_id().ok_or_else(|| {
            Error::synthesis(
                SynthesisStage::Prepare,
                format!("language '{}' is not supported by the model", request.language),
            )
        })?;

        // no reference voice: neutral (all-zero) speaker
        let speaker = match &request.speaker {
            Some(s) => s.vector().to_vec(),
            None => vec![0.0f32; SPEAKER_DIM],
        };

        let phoneme_ids = Array2::from_shape_vec((1, ids.len()), ids)
            .map_err(|e| Error::synthesis(SynthesisStage::Prepare, e.to_string()))?;
        let language = Array1::from_vec(vec![language_id as i64]);
        let speaker = Array2::from_shape_vec((1, speaker.len()), speaker)
            .map_err(|e| Error::synthesis(SynthesisStage::Prepare, e.to_string()))?;

        let outputs = self
            .conditioner
            .run(ort::inputs![
                "phoneme_ids" => phoneme_ids.view(),
                "language_id" => language.view(),
                "speaker_embedding" => speaker.view(),
            ]
            .map_err(stage)?)
            .map_err(stage)?;

        let cond = outputs
            .get("prefix_conditioning")
            .ok_or_else(|| Error::synthesis(SynthesisStage::Prepare, "Missing prefix_conditioning output"))?
            .try_extract_tensor::<f32>()
            .map_err(stage)?;

        let shape = cond.shape().to_vec();
        let data = cond.iter().copied().collect();
        Conditioning::new(shape, data)
            .ok_or_else(|| Error::synthesis(SynthesisStage::Prepare, "conditioning shape mismatch"))
    }

    fn generate(&self, conditioning: &Conditioning, params: &GenerationParams) -> Result<AcousticCodes> {
        let stage = |e: ort::Error| Error::synthesis(SynthesisStage::Generate, e.to_string());

        let input = ArrayD::from_shape_vec(IxDyn(conditioning.shape()), conditioning.data().to_vec())
            .map_err(|e| Error::synthesis(SynthesisStage::Generate, e.to_string()))?;

        tracing::debug!(
            max_new_tokens = params.max_new_tokens,
            cfg_scale = params.cfg_scale,
            "Running generator"
        );

        let outputs = self
            .generator
            .run(ort::inputs!["prefix_conditioning" => input.view()].map_err(stage)?)
            .map_err(stage)?;

        let codes = outputs
            .get("out_codes")
            .ok_or_else(|| Error::synthesis(SynthesisStage::Generate, "Missing out_codes output"))?
            .try_extract_tensor::<i64>()
            .map_err(stage)?;

        let shape = codes.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(Error::synthesis(
                SynthesisStage::Generate,
                format!("unexpected out_codes shape {:?}", shape),
            ));
        }

        let tokens = codes.iter().copied().collect();
        let mut codes = AcousticCodes::new(shape[1], shape[2], tokens)
            .ok_or_else(|| Error::synthesis(SynthesisStage::Generate, "code shape mismatch"))?;
        codes.truncate(params.max_new_tokens);
        Ok(codes)
    }

    fn decode(&self, codes: &AcousticCodes) -> Result<Waveform> {
        let stage = |e: ort::Error| Error::synthesis(SynthesisStage::Decode, e.to_string());

        let input = Array3::from_shape_vec((1, codes.codebooks(), codes.frames()), codes.tokens().to_vec())
            .map_err(|e| Error::synthesis(SynthesisStage::Decode, e.to_string()))?;

        let outputs = self
            .decoder
            .run(ort::inputs!["codes" => input.view()].map_err(stage)?)
            .map_err(stage)?;

        let waveform = outputs
            .get("waveform")
            .ok_or_else(|| Error::synthesis(SynthesisStage::Decode, "Missing waveform output"))?
            .try_extract_tensor::<f32>()
            .map_err(stage)?;

        Ok(Waveform::new(waveform.iter().copied().collect(), self.sample_rate))
    }

    fn graphs(&self) -> Vec<GraphInfo> {
        vec![
            graph_info("conditioner", &self.conditioner),
            graph_info("generator", &self.generator),
            graph_info("decoder", &self.decoder),
            graph_info("speaker_encoder", &self.speaker_encoder),
        ]
    }
}
