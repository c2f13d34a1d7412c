use anyhow::{Context, Result};
use echo_tutor::integration::{ConversationController, TutorConfig};
use echo_tutor::llm::GeminiClient;
use echo_tutor::speech::{
    CommandSynthesizer, SpeechRecognizer, TtsEngine, UnavailableRecognizer,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo_tutor=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Echo English tutor");

    let config = TutorConfig::from_env();
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("echo-worker")
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let client = GeminiClient::new(config.chat.clone())?;

    let engine = config
        .voice_output
        .engine
        .as_deref()
        .map(TtsEngine::from_program)
        .unwrap_or_else(TtsEngine::detect);
    let synthesizer = CommandSynthesizer::new(
        engine,
        config.voice_output.rate_wpm,
        runtime.handle().clone(),
    );

    let recognizer = build_recognizer(&config);

    let mut controller = ConversationController::new(
        config,
        Arc::new(client),
        Box::new(synthesizer),
        recognizer,
        runtime.handle().clone(),
    );

    // the window still opens so the error can be shown
    if let Err(e) = controller.initialize() {
        warn!("Chat unavailable: {}", e);
    }

    echo_tutor::ui::run(controller).map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    Ok(())
}

#[cfg(feature = "whisper")]
fn build_recognizer(config: &TutorConfig) -> Box<dyn SpeechRecognizer> {
    use echo_tutor::speech::WhisperRecognizer;

    let Some(model) = config.voice_input.whisper_model.as_deref() else {
        info!("ECHO_WHISPER_MODEL not set, voice input disabled");
        return Box::new(UnavailableRecognizer::new());
    };

    match WhisperRecognizer::new(model, &config.voice_input) {
        Ok(recognizer) => Box::new(recognizer),
        Err(e) => {
            warn!("Voice input disabled: {}", e);
            Box::new(UnavailableRecognizer::new())
        }
    }
}

#[cfg(not(feature = "whisper"))]
fn build_recognizer(_config: &TutorConfig) -> Box<dyn SpeechRecognizer> {
    info!("Built without the whisper feature, voice input disabled");
    Box::new(UnavailableRecognizer::new())
}
