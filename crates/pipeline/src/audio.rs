//! Audio file decoding, resampling and WAV encoding

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use zonos_tts_core::{AudioBuffer, Error, Result, SpeakerId, Waveform};

/// Decode an audio file to mono samples.
///
/// The returned [`SpeakerId`] is a digest of the file bytes, so the same
/// recording under a different path maps to the same identity.
pub fn decode_audio_file(path: &Path, max_bytes: u64) -> Result<(Waveform, SpeakerId)> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::Input(format!("cannot read {}: {}", path.display(), e)))?;

    if !metadata.is_file() {
        return Err(Error::Input(format!("{} is not a file", path.display())));
    }
    if metadata.len() > max_bytes {
        return Err(Error::Input(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            metadata.len(),
            max_bytes
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| Error::Input(format!("cannot read {}: {}", path.display(), e)))?;
    let id = SpeakerId::from_bytes(&bytes);

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let waveform = decode_audio_bytes(bytes, &hint)
        .map_err(|e| Error::Input(format!("cannot decode {}: {}", path.display(), e)))?;

    tracing::debug!(
        path = %path.display(),
        speaker = id.short(),
        sample_rate = waveform.sample_rate,
        duration_ms = waveform.duration_ms(),
        "Decoded reference audio"
    );

    Ok((waveform, id))
}

fn decode_audio_bytes(bytes: Vec<u8>, hint: &Hint) -> std::result::Result<Waveform, String> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| e.to_string())?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| "no supported audio track".to_string())?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("unsupported codec: {}", e))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut mono = Vec::new();
    while let Ok(packet) = format.next_packet() {
        while !format.metadata().is_latest() {
            format.metadata().pop();
        }

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // corrupt frame, keep going
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.to_string()),
        };

        let spec = *decoded.spec();
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mono.extend(multichannel_to_mono(buf.samples(), channels));
    }

    if sample_rate == 0 {
        return Err("unknown sample rate".to_string());
    }
    if mono.is_empty() {
        return Err("no audio samples".to_string());
    }

    Ok(Waveform::new(mono, sample_rate))
}

/// Average interleaved frames down to one channel
pub fn multichannel_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Audio("sample rate must be greater than 0".to_string()));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    let output = (0..output_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let src_idx = (src_pos.floor() as usize).min(last);
            let frac = (src_pos - src_idx as f64) as f32;
            if src_idx < last {
                samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
            } else {
                samples[last]
            }
        })
        .collect();

    Ok(output)
}

/// Symmetric mapping: -1.0 -> -32768, +1.0 -> 32767
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| {
            let x = if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 };
            if x >= 0.0 {
                (x * 32767.0).round() as i16
            } else {
                (x * 32768.0).round() as i16
            }
        })
        .collect()
}

/// Encode a waveform as a 16-bit mono WAV file
pub fn encode_wav(waveform: &Waveform) -> Result<AudioBuffer> {
    if waveform.sample_rate == 0 {
        return Err(Error::Audio("sample rate must be greater than 0".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Cursor::new(Vec::<u8>::with_capacity(44 + waveform.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).map_err(wav_error)?;
        for sample in f32_to_pcm16(&waveform.samples) {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }

    Ok(AudioBuffer::new(
        buf.into_inner(),
        waveform.sample_rate,
        1,
        waveform.duration_ms(),
    ))
}

fn wav_error(e: hound::Error) -> Error {
    Error::Audio(format!("WAV encoding failed: {}", e))
}
