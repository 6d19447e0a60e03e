//! Speaker embedding extraction

use std::sync::Arc;

use zonos_tts_core::{Error, Result, SpeakerEmbedding, SpeakerId, Waveform};

use crate::Synthesizer;

/// Turns a decoded reference recording into a [`SpeakerEmbedding`]
#[derive(Clone)]
pub struct SpeakerEmbedder {
    synthesizer: Arc<dyn Synthesizer>,
}

impl SpeakerEmbedder {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Embed `waveform`, tagging the result with `id`
    pub fn embed(&self, waveform: &Waveform, id: SpeakerId) -> Result<SpeakerEmbedding> {
        if waveform.sample_rate == 0 {
            return Err(Error::Input("reference audio has no sample rate".to_string()));
        }
        if waveform.is_empty() {
            return Err(Error::Input("reference audio has no samples".to_string()));
        }

        let vector = self.synthesizer.embed_speaker(waveform).map_err(|e| match e {
            Error::Input(_) => e,
            other => Error::Input(format!("speaker embedding failed: {}", other)),
        })?;

        if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::Input("speaker embedding is empty or not finite".to_string()));
        }

        tracing::debug!(speaker = id.short(), dim = vector.len(), "Extracted speaker embedding");
        Ok(SpeakerEmbedding::new(id, vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleSynthesizer;

    #[test]
    fn test_embed_reference() {
        let embedder = SpeakerEmbedder::new(Arc::new(SimpleSynthesizer::default()));
        let waveform = Waveform::new(vec![0.1, -0.2, 0.3, 0.0], 16_000);
        let id = SpeakerId::from_bytes(b"reference");

        let embedding = embedder.embed(&waveform, id.clone()).unwrap();
        assert_eq!(embedding.id(), &id);
        assert_eq!(embedding.dim(), 128);
    }

    #[test]
    fn test_rejects_unusable_audio() {
        let embedder = SpeakerEmbedder::new(Arc::new(SimpleSynthesizer::default()));
        let id = SpeakerId::from_bytes(b"x");

        let empty = Waveform::new(vec![], 16_000);
        assert!(matches!(embedder.embed(&empty, id.clone()), Err(Error::Input(_))));

        let no_rate = Waveform::new(vec![0.5], 0);
        assert!(matches!(embedder.embed(&no_rate, id), Err(Error::Input(_))));
    }
}
