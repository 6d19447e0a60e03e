//! HTTP Endpoints
//!
//! `POST /tts` accepts `text`, `language` and `reference_audio_path` as
//! either `application/x-www-form-urlencoded` or `multipart/form-data` and
//! answers with a complete WAV file.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use zonos_tts_config::ReferenceAudioPolicy;
use zonos_tts_core::{Error, SpeakerEmbedding, WAV_MIME_TYPE};
use zonos_tts_pipeline::ConditionBuilder;

use crate::state::AppState;
use crate::ServerError;

const X_LANGUAGE: &str = "x-language";
const CONTENT_DISPOSITION: &str = "attachment; filename=output.wav";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let mut router = Router::new()
        .route("/tts", post(synthesize))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Middleware
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if server.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

/// `/tts` form fields
#[derive(Debug, Default, Deserialize)]
pub struct TtsForm {
    pub text: Option<String>,
    pub language: Option<String>,
    pub reference_audio_path: Option<String>,
}

#[async_trait]
impl<S> FromRequest<S> for TtsForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Form(form) = Form::<TtsForm>::from_request(req, state)
                .await
                .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

        let mut form = TtsForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::InvalidRequest(format!("invalid multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            let slot = match name.as_str() {
                "text" => &mut form.text,
                "language" => &mut form.language,
                "reference_audio_path" => &mut form.reference_audio_path,
                _ => continue,
            };
            let value = field
                .text()
                .await
                .map_err(|e| ServerError::InvalidRequest(format!("{} read error: {}", name, e)))?;
            *slot = Some(value);
        }

        Ok(form)
    }
}

/// Run blocking work off the executor; a panicking worker becomes a 500
async fn run_blocking<T, F>(work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> zonos_tts_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("synthesis worker failed: {}", e)))?
        .map_err(ServerError::from)
}

/// Synthesize speech
async fn synthesize(State(state): State<AppState>, form: TtsForm) -> Result<Response, ServerError> {
    let text = form
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("text is required".to_string()))?;

    let resolution = state.resolver.resolve(form.language.as_deref(), &text);
    tracing::debug!(
        language = %resolution.language,
        source = resolution.source.as_str(),
        "Resolved language"
    );

    let speaker = match form
        .reference_audio_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        Some(path) => load_speaker(&state, PathBuf::from(path)).await?,
        None => None,
    };

    let language = resolution.language;
    let request = ConditionBuilder::request(text, language.clone(), speaker);
    let service = state.service.clone();
    let task = tokio::task::spawn_blocking(move || service.synthesize(&request));

    let joined = match state.config.synthesis.timeout_seconds {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            // the worker keeps running; its result is dropped
            .map_err(|_| ServerError::from(Error::Timeout(secs)))?,
        None => task.await,
    };

    let audio = joined
        .map_err(|e| ServerError::Internal(format!("synthesis worker failed: {}", e)))??;

    let language_header = HeaderValue::from_str(language.as_str())
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(WAV_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, HeaderValue::from_static(CONTENT_DISPOSITION)),
            (HeaderName::from_static(X_LANGUAGE), language_header),
        ],
        Body::from(audio.into_bytes()),
    )
        .into_response())
}

/// Embed the reference voice, applying the configured failure policy
async fn load_speaker(state: &AppState, path: PathBuf) -> Result<Option<SpeakerEmbedding>, ServerError> {
    let service = state.service.clone();
    let shown = path.display().to_string();

    match run_blocking(move || service.embed_reference(&path)).await {
        Ok(embedding) => Ok(Some(embedding)),
        Err(e) if state.config.reference_audio.on_failure == ReferenceAudioPolicy::Fallback => {
            tracing::warn!(path = %shown, error = %e, "Reference audio unusable, using neutral voice");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.service.cache_stats().map(|stats| {
        serde_json::json!({
            "entries": stats.entries,
            "capacity": stats.capacity,
            "hits": stats.hits,
            "misses": stats.misses,
            "evictions": stats.evictions,
            "hit_rate": stats.hit_rate,
        })
    });

    Json(serde_json::json!({
        "status": "ready",
        "model": state.service.model().name(),
        "sample_rate": state.service.sample_rate(),
        "default_language": state.endpoint.default_language.as_str(),
        "language_detection": state.endpoint.language_detection,
        "cache": cache,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zonos_tts_config::Settings;
    use zonos_tts_pipeline::{ModelHandle, SimpleSynthesizer};

    #[test]
    fn test_router_creation() {
        let model = ModelHandle::from_synthesizer(Arc::new(SimpleSynthesizer::default()));
        let state = AppState::new(Settings::default(), model);
        let _ = create_router(state);
    }
}
