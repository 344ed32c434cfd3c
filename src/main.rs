use clap::Parser;
use ocr_prep::config::{Args, Command, Config, ServerConfig};
use ocr_prep::engines::EngineRegistry;
use ocr_prep::{ocr, server, OcrError};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.common.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(args.common);

    match args.command {
        Command::Serve {
            host,
            port,
            max_file_size,
            disable_recognition,
        } => {
            tracing::info!("Starting ocr-prep server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", host, port);
            let server_config = ServerConfig {
                host,
                port,
                max_file_size,
                recognition_enabled: !disable_recognition,
            };
            server::run(config, server_config).await
        }
        Command::Process {
            input,
            output,
            no_recognize,
        } => process(config, &input, &output, !no_recognize).await,
    }
}

/// Preprocess one file, write the result, then optionally recognize it
async fn process(config: Config, input: &Path, output: &Path, recognize: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(input).await?;
    let pipeline = Arc::new(config.pipeline());

    let preprocessed = ocr::preprocess(pipeline, bytes).await?;
    tokio::fs::write(output, &preprocessed.png).await?;
    tracing::info!(
        "Wrote {:?} ({} stages, {}ms)",
        output,
        preprocessed.preprocessing.steps.len(),
        preprocessed.preprocessing.total_time_ms
    );

    if !recognize {
        return Ok(());
    }

    let registry = tokio::task::spawn_blocking(move || {
        EngineRegistry::new(&config).map(|registry| (registry, config.default_language))
    })
    .await??;
    let (registry, language) = registry;
    let recognizer = registry
        .default()
        .ok_or_else(|| OcrError::Internal("default engine missing".to_string()))?;

    let (result, progress) = ocr::recognize(recognizer, &preprocessed.image, &language).await;
    for event in &progress {
        tracing::info!("{}", event.describe());
    }

    // The filtered image is already on disk even if this fails
    let recognition = result?;
    println!("{}", recognition.text);
    Ok(())
}
