//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use zonos_tts_core::LanguageTag;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation parameters
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Language resolution
    #[serde(default)]
    pub language: LanguageConfig,

    /// Reference voice handling
    #[serde(default)]
    pub reference_audio: ReferenceAudioConfig,

    /// Model files
    #[serde(default)]
    pub models: ModelsConfig,

    /// External phonemizer
    #[serde(default)]
    pub phonemizer: PhonemizerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.capacity".to_string(),
                message: "Capacity must be at least 1 when the cache is enabled".to_string(),
            });
        }

        if self.synthesis.max_new_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.max_new_tokens".to_string(),
                message: "Token budget must be greater than zero".to_string(),
            });
        }

        if self.synthesis.exceeds_exported_budget() {
            tracing::warn!(
                max_new_tokens = self.synthesis.max_new_tokens,
                exported = EXPORTED_TOKEN_BUDGET,
                "synthesis.max_new_tokens is above the generator's exported budget and cannot raise it"
            );
        }

        if self.synthesis.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.sample_rate".to_string(),
                message: "Sample rate must be greater than zero".to_string(),
            });
        }

        if self.synthesis.timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.timeout_seconds".to_string(),
                message: "Timeout must be greater than zero (omit it to disable)".to_string(),
            });
        }

        if !self.language.default.is_supported() {
            return Err(ConfigError::InvalidValue {
                field: "language.default".to_string(),
                message: format!("'{}' is not a language the model supports", self.language.default),
            });
        }

        if !(0.0..=1.0).contains(&self.language.min_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "language.min_confidence".to_string(),
                message: "Confidence threshold must be within [0, 1]".to_string(),
            });
        }

        if self.models.backend == ModelBackend::Onnx {
            self.validate_model_paths();
        }

        Ok(())
    }

    /// Warn about missing model files; the loader reports the hard error
    fn validate_model_paths(&self) {
        let mut warnings = Vec::new();

        for (field, path) in self.models.graph_paths() {
            if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
                warnings.push(format!("{}: expected .onnx extension, got '{}'", field, path.display()));
            }

            if !path.exists() {
                tracing::warn!("Model not found: {} = {}", field, path.display());
            } else if !path.is_file() {
                warnings.push(format!("{}: path exists but is not a file: {}", field, path.display()));
            }
        }

        if !warnings.is_empty() {
            tracing::warn!("Model path validation warnings:\n  - {}", warnings.join("\n  - "));
        }
    }

    /// Endpoint behaviour derived from the cache and language sections
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            enable_cache: self.cache.enabled,
            default_language: self.language.default.clone(),
            language_detection: self.language.detection,
        }
    }
}

/// The knobs that distinguish the deployments of the `/tts` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    /// Memoize synthesized audio
    pub enable_cache: bool,
    /// Tag used when no language is given and detection is off or inconclusive
    pub default_language: LanguageTag,
    /// Run language identification on requests without a language
    pub language_detection: bool,
}

impl EndpointConfig {
    /// Cached endpoint with automatic language detection
    pub fn cached_autodetect() -> Self {
        Self {
            enable_cache: true,
            default_language: LanguageTag::english(),
            language_detection: true,
        }
    }

    /// Uncached endpoint that always falls back to a fixed language
    pub fn uncached_fixed(language: LanguageTag) -> Self {
        Self {
            enable_cache: false,
            default_language: language,
            language_detection: false,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::cached_autodetect()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Maximum accepted request body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Upper bound on generated code frames.
    ///
    /// The exported generator graph carries its own fixed budget of
    /// [`EXPORTED_TOKEN_BUDGET`] frames. Lower values truncate its output;
    /// higher values have no effect.
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    /// Classifier-free guidance scale
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f32,

    /// Output sample rate of the decoder
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Serialize model calls when the backend is not safe for concurrent inference
    #[serde(default)]
    pub serialize_inference: bool,

    /// Optional wall-clock limit per synthesis
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Frames the exported generator produces at most (86 frames/s x 30 s)
pub const EXPORTED_TOKEN_BUDGET: usize = 86 * 30;

fn default_max_new_tokens() -> usize {
    EXPORTED_TOKEN_BUDGET
}
fn default_cfg_scale() -> f32 {
    2.0
}
fn default_sample_rate() -> u32 {
    44100
}

impl SynthesisConfig {
    /// True when `max_new_tokens` asks for more than the generator can emit
    pub fn exceeds_exported_budget(&self) -> bool {
        self.max_new_tokens > EXPORTED_TOKEN_BUDGET
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            cfg_scale: default_cfg_scale(),
            sample_rate: default_sample_rate(),
            serialize_inference: false,
            timeout_seconds: None,
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached audio buffers
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
        }
    }
}

/// Language resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Detect the language of requests that omit one
    #[serde(default = "default_true")]
    pub detection: bool,

    /// Fallback language
    #[serde(default)]
    pub default: LanguageTag,

    /// Detections below this confidence fall back to the default
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Upper bound on characters inspected by the detector
    #[serde(default = "default_max_scan_chars")]
    pub max_scan_chars: usize,
}

fn default_min_confidence() -> f32 {
    0.5
}
fn default_max_scan_chars() -> usize {
    1024
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            detection: true,
            default: LanguageTag::english(),
            min_confidence: default_min_confidence(),
            max_scan_chars: default_max_scan_chars(),
        }
    }
}

/// What to do when a reference clip cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceAudioPolicy {
    /// Fail the request
    #[default]
    Reject,
    /// Log and continue with the model's default voice
    Fallback,
}

/// Reference voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceAudioConfig {
    #[serde(default)]
    pub on_failure: ReferenceAudioPolicy,

    /// Refuse reference files larger than this
    #[serde(default = "default_reference_max_bytes")]
    pub max_bytes: u64,
}

fn default_reference_max_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for ReferenceAudioConfig {
    fn default() -> Self {
        Self {
            on_failure: ReferenceAudioPolicy::Reject,
            max_bytes: default_reference_max_bytes(),
        }
    }
}

/// Which synthesizer implementation to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Exported ONNX graphs
    #[default]
    Onnx,
    /// Deterministic model-free synthesizer for smoke tests
    Simple,
}

/// Compute device the model is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

/// Model file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub backend: ModelBackend,

    #[serde(default)]
    pub device: Device,

    /// Directory holding the exported graphs
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    /// Text/language/speaker -> prefix conditioning
    #[serde(default = "default_conditioner")]
    pub conditioner: String,

    /// Prefix conditioning -> acoustic codes
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Acoustic codes -> waveform
    #[serde(default = "default_decoder")]
    pub decoder: String,

    /// Reference waveform -> speaker embedding
    #[serde(default = "default_speaker_encoder")]
    pub speaker_encoder: String,

    /// Intra-op threads per session
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models/zonos")
}
fn default_conditioner() -> String {
    "conditioner.onnx".to_string()
}
fn default_generator() -> String {
    "zonos_generate.onnx".to_string()
}
fn default_decoder() -> String {
    "dac_autoencoder.onnx".to_string()
}
fn default_speaker_encoder() -> String {
    "speaker_encoder.onnx".to_string()
}
fn default_intra_threads() -> usize {
    2
}

impl ModelsConfig {
    pub fn conditioner_path(&self) -> PathBuf {
        self.dir.join(&self.conditioner)
    }

    pub fn generator_path(&self) -> PathBuf {
        self.dir.join(&self.generator)
    }

    pub fn decoder_path(&self) -> PathBuf {
        self.dir.join(&self.decoder)
    }

    pub fn speaker_encoder_path(&self) -> PathBuf {
        self.dir.join(&self.speaker_encoder)
    }

    /// (config field, resolved path) for every graph
    pub fn graph_paths(&self) -> [(&'static str, PathBuf); 4] {
        [
            ("models.conditioner", self.conditioner_path()),
            ("models.generator", self.generator_path()),
            ("models.decoder", self.decoder_path()),
            ("models.speaker_encoder", self.speaker_encoder_path()),
        ]
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Onnx,
            device: Device::Cpu,
            dir: default_models_dir(),
            conditioner: default_conditioner(),
            generator: default_generator(),
            decoder: default_decoder(),
            speaker_encoder: default_speaker_encoder(),
            intra_threads: default_intra_threads(),
        }
    }
}

/// eSpeak phonemizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonemizerConfig {
    /// Executable name or path
    #[serde(default = "default_phonemizer_command")]
    pub command: String,

    /// Kill the subprocess after this long
    #[serde(default = "default_phonemizer_timeout")]
    pub timeout_ms: u64,
}

fn default_phonemizer_command() -> String {
    "espeak".to_string()
}
fn default_phonemizer_timeout() -> u64 {
    2000
}

impl Default for PhonemizerConfig {
    fn default() -> Self {
        Self {
            command: default_phonemizer_command(),
            timeout_ms: default_phonemizer_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/` and the environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (ZONOS_TTS__ prefix)
/// 2. config/{env}.(toml|yaml) (if env specified)
/// 3. config/default.(toml|yaml)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("ZONOS_TTS")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
