//! Audio types shared across the pipeline

use bytes::Bytes;

/// MIME type of every buffer produced by the service
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Duration in milliseconds (0 for a zero sample rate)
    pub fn duration_ms(&self) -> u64 {
        duration_ms(self.sample_rate, self.samples.len())
    }
}

/// A complete encoded audio file held in memory.
///
/// Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Bytes,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
}

impl AudioBuffer {
    pub fn new(bytes: impl Into<Bytes>, sample_rate: u32, channels: u16, duration_ms: u64) -> Self {
        Self {
            bytes: bytes.into(),
            sample_rate,
            channels,
            duration_ms,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Hand the bytes over to a response body
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Sample rate declared in the container header
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        WAV_MIME_TYPE
    }
}

pub fn duration_ms(sample_rate: u32, samples: usize) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    ((samples as u128) * 1000u128 / (sample_rate as u128)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(duration_ms(44100, 44100), 1000);
        assert_eq!(duration_ms(16000, 8000), 500);
        assert_eq!(duration_ms(0, 100), 0);
    }

    #[test]
    fn test_waveform_duration() {
        let wav = Waveform::new(vec![0.0; 22050], 44100);
        assert_eq!(wav.duration_ms(), 500);
        assert!(!wav.is_empty());
    }

    #[test]
    fn test_buffer_clone_shares_bytes() {
        let buffer = AudioBuffer::new(vec![1u8, 2, 3], 44100, 1, 0);
        let copy = buffer.clone();
        assert_eq!(buffer, copy);
        assert_eq!(copy.into_bytes().as_ref(), &[1, 2, 3]);
        assert_eq!(buffer.mime_type(), "audio/wav");
    }
}
