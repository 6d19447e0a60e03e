use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use zonos_tts_config::{ReferenceAudioPolicy, Settings};
use zonos_tts_core::{AcousticCodes, ConditionRequest, Conditioning, Result, Waveform};
use zonos_tts_pipeline::{GenerationParams, ModelHandle, SimpleSynthesizer, Synthesizer};
use zonos_tts_server::{create_router, AppState};

/// Counts model calls and can misbehave on request
#[derive(Default)]
struct CountingSynthesizer {
    inner: SimpleSynthesizer,
    embeds: AtomicUsize,
    prepares: AtomicUsize,
    delay: Option<Duration>,
    panic: bool,
}

impl Synthesizer for CountingSynthesizer {
    fn name(&self) -> &str {
        "counting"
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn embed_speaker(&self, waveform: &Waveform) -> Result<Vec<f32>> {
        self.embeds.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_speaker(waveform)
    }

    fn prepare(&self, request: &ConditionRequest) -> Result<Conditioning> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("model crashed");
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.inner.prepare(request)
    }

    fn generate(&self, conditioning: &Conditioning, params: &GenerationParams) -> Result<AcousticCodes> {
        self.inner.generate(conditioning, params)
    }

    fn decode(&self, codes: &AcousticCodes) -> Result<Waveform> {
        self.inner.decode(codes)
    }
}

fn app_with(settings: Settings, synth: CountingSynthesizer) -> (Router, Arc<CountingSynthesizer>) {
    let synth = Arc::new(synth);
    let model = ModelHandle::from_synthesizer(synth.clone());
    (create_router(AppState::new(settings, model)), synth)
}

fn app() -> (Router, Arc<CountingSynthesizer>) {
    app_with(Settings::default(), CountingSynthesizer::default())
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tts")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn write_reference(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..3200 {
        writer.write_sample(((i % 80) * 150) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn test_missing_text_is_rejected_without_model_call() {
    let (app, synth) = app();

    for body in ["", "language=en-us", "text=", "text=%20%20%20"] {
        let response = app.clone().oneshot(form_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");

        let json = json_body(response).await;
        assert_eq!(json["stage"], "validation");
        assert!(json["error"].is_string());
    }

    assert_eq!(synth.prepares.load(Ordering::SeqCst), 0);
    assert_eq!(synth.embeds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_synthesize_returns_wav() {
    let (app, synth) = app();

    let response = app
        .oneshot(form_request("text=Hello%20world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=output.wav"
    );
    assert_eq!(headers["x-language"], "en-us");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let reader = hound::WavReader::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(reader.spec().sample_rate, 44_100);
    assert_eq!(reader.spec().channels, 1);
    assert!(reader.len() > 0);

    assert_eq!(synth.prepares.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let (app, synth) = app();

    let first = app.clone().oneshot(form_request("text=Hello")).await.unwrap();
    let first = axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let second = app.clone().oneshot(form_request("text=Hello")).await.unwrap();
    let second = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 1);

    // a different language is a different result
    app.clone()
        .oneshot(form_request("text=Hello&language=de"))
        .await
        .unwrap();
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_disabled_calls_model_each_time() {
    let mut settings = Settings::default();
    settings.cache.enabled = false;
    let (app, synth) = app_with(settings, CountingSynthesizer::default());

    for _ in 0..2 {
        let response = app.clone().oneshot(form_request("text=Hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreadable_reference_audio_fails_before_synthesis() {
    let (app, synth) = app();

    let response = app
        .oneshot(form_request(
            "text=Hello&reference_audio_path=/nonexistent/voice.wav",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = json_body(response).await;
    assert_eq!(json["stage"], "reference_audio");
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreadable_reference_audio_fallback_policy() {
    let mut settings = Settings::default();
    settings.reference_audio.on_failure = ReferenceAudioPolicy::Fallback;
    let (app, synth) = app_with(settings, CountingSynthesizer::default());

    let response = app
        .oneshot(form_request(
            "text=Hello&reference_audio_path=/nonexistent/voice.wav",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reference_audio_conditions_the_voice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voice.wav");
    write_reference(&path);

    let (app, synth) = app();

    let body = format!("text=Hello&reference_audio_path={}", path.display());
    let voiced = app.clone().oneshot(form_request(&body)).await.unwrap();
    assert_eq!(voiced.status(), StatusCode::OK);
    assert_eq!(synth.embeds.load(Ordering::SeqCst), 1);

    // neutral voice is cached separately
    let neutral = app.clone().oneshot(form_request("text=Hello")).await.unwrap();
    assert_eq!(neutral.status(), StatusCode::OK);
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_multipart_form_and_detected_language() {
    let (app, _synth) = app();

    let boundary = "zonosboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nПривет, мир!\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/tts")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-language"], "ru");
}

#[tokio::test]
async fn test_explicit_language_header() {
    let (app, _synth) = app();
    let response = app
        .oneshot(form_request("text=Hello&language=FR_fr"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-language"], "fr-fr");
}

#[tokio::test]
async fn test_unknown_language_uses_default() {
    let (app, synth) = app();
    let response = app
        .oneshot(form_request("text=Bonjour&language=fr"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-language"], "en-us");
    assert_eq!(synth.prepares.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hebrew_text_with_fallback_voice() {
    let mut settings = Settings::default();
    settings.reference_audio.on_failure = ReferenceAudioPolicy::Fallback;
    let (app, synth) = app_with(settings, CountingSynthesizer::default());

    let response = app
        .oneshot(form_request(
            "text=%D7%A9%D7%9C%D7%95%D7%9D&reference_audio_path=/missing/voice.wav",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // Hebrew text has no model language, so the default is used
    assert_eq!(response.headers()["x-language"], "en-us");
    assert_eq!(synth.embeds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_synthesis_times_out() {
    let mut settings = Settings::default();
    settings.synthesis.timeout_seconds = Some(1);
    let synth = CountingSynthesizer {
        delay: Some(Duration::from_millis(1500)),
        ..Default::default()
    };
    let (app, _synth) = app_with(settings, synth);

    let response = app.oneshot(form_request("text=Hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["stage"], "timeout");
}

#[tokio::test]
async fn test_panicking_model_is_internal_error() {
    let synth = CountingSynthesizer {
        panic: true,
        ..Default::default()
    };
    let (app, _synth) = app_with(Settings::default(), synth);

    let response = app.clone().oneshot(form_request("text=Hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // still serving
    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_model_and_cache() {
    let (app, _synth) = app();
    app.clone().oneshot(form_request("text=Hello")).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["model"], "counting");
    assert_eq!(json["sample_rate"], 44_100);
    assert_eq!(json["default_language"], "en-us");
    assert_eq!(json["cache"]["entries"], 1);
    assert_eq!(json["cache"]["misses"], 1);
}
