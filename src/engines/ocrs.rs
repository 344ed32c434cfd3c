//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use super::download::{cache_dir, ensure_downloaded};
use crate::config::Config;
use crate::engine::{
    ProgressSink, Recognition, Recognizer, STATUS_DETECTING, STATUS_DONE, STATUS_LOADING,
};
use crate::error::OcrError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Lines recognized per batch between progress reports
const LINES_PER_BATCH: usize = 8;

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load the detection and recognition models, downloading them if needed
    pub fn new(_config: &Config) -> Result<Self, OcrError> {
        let models = cache_dir().join("models");
        let detection_model_path =
            ensure_downloaded(DETECTION_MODEL_URL, &models, "text-detection.rten")?;
        let recognition_model_path =
            ensure_downloaded(RECOGNITION_MODEL_URL, &models, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl Recognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &ProgressSink,
    ) -> Result<Recognition, OcrError> {
        if !self.supports_language(language) {
            return Err(OcrError::Recognition(format!(
                "ocrs does not support language '{}'",
                language
            )));
        }

        progress.status(STATUS_LOADING);
        // ImageSource::from_bytes expects RGB8 in HWC order
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();
        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions)
            .map_err(|e| OcrError::Recognition(format!("Failed to create image source: {}", e)))?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::Recognition(format!("Failed to prepare input: {}", e)))?;

        progress.status(STATUS_DETECTING);
        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::Recognition(format!("Failed to detect words: {}", e)))?;
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        progress.recognizing(0.0);
        let total = line_rects.len().max(1);
        let mut lines = Vec::with_capacity(line_rects.len());
        for (batch_index, batch) in line_rects.chunks(LINES_PER_BATCH).enumerate() {
            let line_texts = self
                .engine
                .recognize_text(&ocr_input, batch)
                .map_err(|e| OcrError::Recognition(format!("Failed to recognize text: {}", e)))?;

            lines.extend(line_texts.iter().filter_map(|line| line.as_ref()).map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            }));

            let done = ((batch_index + 1) * LINES_PER_BATCH).min(total);
            progress.recognizing(done as f32 / total as f32);
        }
        progress.recognizing(1.0);
        progress.status(STATUS_DONE);

        Ok(Recognition {
            text: lines.join("\n"),
            language: language.to_string(),
        })
    }
}
