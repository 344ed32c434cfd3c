use crate::config::{Config, ServerConfig};
use crate::engine::ProgressEvent;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::OcrError;
use crate::ocr::{self, OcrJob};
use crate::preprocessing::{Pipeline, PreprocessingResult, Preset, StageList};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when recognition is disabled
    pub engines: Option<Arc<EngineRegistry>>,
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
    pub max_file_size: usize,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
    pub language: String,
    pub engine: String,
    pub processing_time_ms: u64,
    pub preprocessing: PreprocessingResult,
    pub progress: Vec<ProgressEvent>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub recognition_enabled: bool,
    pub default_engine: Option<String>,
    pub available_engines: Vec<EngineInfo>,
    pub presets: Vec<&'static str>,
    pub default_pipeline: String,
    pub max_file_size_bytes: usize,
    pub default_language: String,
}

/// Run the HTTP server
pub async fn run(config: Config, server: ServerConfig) -> anyhow::Result<()> {
    let engines = if server.recognition_enabled {
        Some(Arc::new(EngineRegistry::new(&config)?))
    } else {
        tracing::info!("Recognition disabled, serving preprocessing only");
        None
    };

    let addr = format!("{}:{}", server.host, server.port);
    let state = AppState {
        engines,
        pipeline: Arc::new(config.pipeline()),
        config: Arc::new(config),
        max_file_size: server.max_file_size,
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let max_file_size = state.max_file_size;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/preprocess", post(handle_preprocess))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_file_size)),
        )
        .with_state(state)
}

/// Fields accepted by the upload endpoints
#[derive(Default)]
struct Upload {
    file: Option<Bytes>,
    language: Option<String>,
    preset: Option<String>,
    stages: Option<String>,
    engine: Option<String>,
}

impl Upload {
    async fn parse(mut multipart: Multipart) -> Result<Self, OcrError> {
        let mut upload = Upload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                upload.file = Some(field.bytes().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
                continue;
            }

            let slot = match name.as_str() {
                "language" | "languages" => &mut upload.language,
                "preset" => &mut upload.preset,
                "stages" => &mut upload.stages,
                "engine" => &mut upload.engine,
                // Ignore unknown fields
                _ => continue,
            };
            let text = field
                .text()
                .await
                .map_err(|e| OcrError::InvalidRequest(format!("Invalid {}: {}", name, e)))?;
            *slot = Some(text.trim().to_string()).filter(|t| !t.is_empty());
        }

        Ok(upload)
    }

    /// The uploaded file, checked against the size limit
    fn take_file(&mut self, max: usize) -> Result<Vec<u8>, OcrError> {
        let data = self.file.take().ok_or(OcrError::MissingFile)?;
        if data.len() > max {
            return Err(OcrError::ImageTooLarge {
                size: data.len(),
                max,
            });
        }
        Ok(data.to_vec())
    }

    /// Explicit stages win over a preset; neither means the server default
    fn pipeline(&self, state: &AppState) -> Result<Arc<Pipeline>, OcrError> {
        if let Some(stages) = &self.stages {
            let list: StageList = stages.parse()?;
            return Ok(Arc::new(state.pipeline.with_stages("custom", list.0)));
        }
        if let Some(preset) = &self.preset {
            let preset: Preset = preset.parse()?;
            return Ok(Arc::new(
                state.pipeline.with_stages(preset.as_str(), preset.stages()),
            ));
        }
        Ok(Arc::clone(&state.pipeline))
    }
}

/// Handle preprocessing-only requests: returns the filtered image as PNG
async fn handle_preprocess(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, OcrError> {
    let mut upload = Upload::parse(multipart).await?;
    let data = upload.take_file(state.max_file_size)?;
    let pipeline = upload.pipeline(&state)?;

    let preprocessed = ocr::preprocess(pipeline, data).await?;
    let result = &preprocessed.preprocessing;
    tracing::info!(
        "Preprocessed {}x{} image with '{}' in {}ms",
        preprocessed.image.width(),
        preprocessed.image.height(),
        result.pipeline,
        result.total_time_ms
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::HeaderName::from_static("x-preprocessing-ms"),
                result.total_time_ms.to_string(),
            ),
            (
                header::HeaderName::from_static("x-pipeline"),
                result.pipeline.clone(),
            ),
        ],
        preprocessed.png,
    )
        .into_response())
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let registry = state.engines.clone().ok_or_else(|| {
        OcrError::InitializationError("recognition is disabled on this server".to_string())
    })?;

    let mut upload = Upload::parse(multipart).await?;
    let data = upload.take_file(state.max_file_size)?;
    let pipeline = upload.pipeline(&state)?;

    let recognizer = match &upload.engine {
        Some(name) => registry
            .get(name)
            .ok_or_else(|| OcrError::InvalidRequest(format!("Unknown engine '{}'", name)))?,
        None => registry
            .default()
            .ok_or_else(|| OcrError::Internal("default engine missing".to_string()))?,
    };
    let language = upload
        .language
        .take()
        .unwrap_or_else(|| state.config.default_language.clone());

    let outcome = OcrJob {
        pipeline,
        recognizer,
        language,
    }
    .run(data)
    .await?;
    let recognition = outcome.recognition?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "OCR completed in {}ms with {}, text length: {}",
        processing_time_ms,
        outcome.engine,
        recognition.text.len()
    );

    Ok(Json(OcrResponse {
        text: recognition.text,
        language: recognition.language,
        engine: outcome.engine.to_string(),
        processing_time_ms,
        preprocessing: outcome.preprocessed.preprocessing,
        progress: outcome.progress,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let engines = state.engines.as_deref();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        recognition_enabled: engines.is_some(),
        default_engine: engines.map(|e| e.default_name().to_string()),
        available_engines: engines.map(|e| e.info()).unwrap_or_default(),
        presets: Preset::ALL.iter().map(|p| p.as_str()).collect(),
        default_pipeline: state.pipeline.label().to_string(),
        max_file_size_bytes: state.max_file_size,
        default_language: state.config.default_language.clone(),
    })
}
