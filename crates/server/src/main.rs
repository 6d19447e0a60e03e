//! Zonos TTS Server Entry Point

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use zonos_tts_config::{load_settings_from, ModelBackend, Settings};
use zonos_tts_core::ConditionRequest;
use zonos_tts_pipeline::{EspeakPhonemizer, ModelHandle, SynthesisService};
use zonos_tts_server::{create_router, AppState};
use zonos_tts_text_processing::LanguageResolver;

#[derive(Debug, Parser)]
#[command(name = "zonos-tts-server", version, about = "Zonos text-to-speech HTTP service")]
struct Cli {
    /// Directory holding default.toml and environment overlays
    #[arg(long, env = "ZONOS_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Environment overlay to apply on top of the defaults (e.g. `production`)
    #[arg(long, env = "ZONOS_CONFIG_ENV")]
    config_env: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the model and serve HTTP (default)
    Serve,
    /// Load the model, run one synthesis and report
    Check {
        /// Sentence to synthesize
        #[arg(long, default_value = "Hello, this is a Zonos speech check.")]
        text: String,
        /// Language tag; detected from the text when omitted
        #[arg(long)]
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first (need observability settings for tracing init)
    let config = load_settings_from(&cli.config_dir, cli.config_env.as_deref())
        .with_context(|| format!("failed to load configuration from {}", cli.config_dir.display()))?;

    init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Check { text, language } => check(config, text, language).await,
    }
}

async fn serve(config: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting Zonos TTS Server v{}", env!("CARGO_PKG_VERSION"));

    let model = load_model(&config).await?;

    // Create application state
    let state = AppState::new(config.clone(), model);
    tracing::info!(
        cache = state.endpoint.enable_cache,
        language_detection = state.endpoint.language_detection,
        default_language = %state.endpoint.default_language,
        "Initialized application state"
    );

    // Create router
    let app = create_router(state);

    // Bind address
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn check(config: Settings, text: String, language: Option<String>) -> anyhow::Result<()> {
    let model = load_model(&config).await?;

    for graph in model.graphs() {
        println!(
            "{:<16} inputs: {:?} outputs: {:?}",
            graph.role, graph.inputs, graph.outputs
        );
    }

    let resolver = LanguageResolver::new(&config.language);
    let resolution = resolver.resolve(language.as_deref(), &text);
    println!(
        "language: {} ({})",
        resolution.language,
        resolution.source.as_str()
    );

    if config.models.backend == ModelBackend::Onnx {
        let phonemizer = EspeakPhonemizer::new(&config.phonemizer);
        let ipa = phonemizer
            .phonemize(&text, &resolution.language)
            .context("phonemizer check failed")?;
        println!("phonemes: {}", ipa);
    }

    let service = SynthesisService::new(model, &config);
    let request = ConditionRequest::new(text, resolution.language);
    let started = Instant::now();
    let audio = tokio::task::spawn_blocking(move || service.synthesize(&request))
        .await
        .context("synthesis worker failed")?
        .context("synthesis check failed")?;

    println!(
        "synthesized {} ms of audio at {} Hz ({} bytes) in {} ms",
        audio.duration_ms(),
        audio.sample_rate(),
        audio.len(),
        started.elapsed().as_millis()
    );
    Ok(())
}

/// Load the model once; failure aborts startup
async fn load_model(config: &Settings) -> anyhow::Result<ModelHandle> {
    let models = config.models.clone();
    let phonemizer = config.phonemizer.clone();
    let sample_rate = config.synthesis.sample_rate;

    let result = tokio::task::spawn_blocking(move || {
        ModelHandle::load(&models, &phonemizer, sample_rate)
    })
    .await
    .context("model loader panicked")?;

    match result {
        Ok(model) => Ok(model),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load model");
            Err(e).context("failed to load model")
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize console logging (JSON or human-readable)
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("zonos_tts={},tower_http=debug", level).into()
    });

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
