//! Condition building

use std::sync::Arc;

use zonos_tts_core::{
    ConditionRequest, Conditioning, Error, LanguageTag, Result, SpeakerEmbedding, SynthesisStage,
};

use crate::Synthesizer;

/// Validates a request and asks the model for its conditioning
#[derive(Clone)]
pub struct ConditionBuilder {
    synthesizer: Arc<dyn Synthesizer>,
}

impl ConditionBuilder {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Assemble a request; the language must already be resolved
    pub fn request(
        text: impl Into<String>,
        language: LanguageTag,
        speaker: Option<SpeakerEmbedding>,
    ) -> ConditionRequest {
        let request = ConditionRequest::new(text, language);
        match speaker {
            Some(speaker) => request.with_speaker(speaker),
            None => request,
        }
    }

    /// Empty or whitespace-only text is rejected before the model is called
    pub fn build(&self, request: &ConditionRequest) -> Result<Conditioning> {
        if request.text.trim().is_empty() {
            return Err(Error::Validation("text must not be empty".to_string()));
        }

        self.synthesizer
            .prepare(request)
            .map_err(|e| at_stage(SynthesisStage::Prepare, e))
    }
}

/// Attribute a model failure to `stage` unless it already names one
pub(crate) fn at_stage(stage: SynthesisStage, error: Error) -> Error {
    match error {
        Error::Synthesis { .. } | Error::Validation(_) | Error::Timeout(_) => error,
        other => Error::synthesis(stage, other.to_string()),
    }
}
