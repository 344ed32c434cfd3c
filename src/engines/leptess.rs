//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy images like phone photos.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) per language on first use.

use super::download::{cache_dir, ensure_downloaded};
use crate::config::Config;
use crate::engine::{ProgressSink, Recognition, Recognizer, STATUS_DONE, STATUS_LOADING};
use crate::error::OcrError;
use image::DynamicImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Common languages offered by tessdata_fast
const LANGUAGES: &[&str] = &[
    "eng", "deu", "fra", "spa", "ita", "por", "nld", "jpn", "chi_sim", "chi_tra", "kor", "ara",
    "rus",
];

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Directory holding `<lang>.traineddata` files
    tessdata_dir: PathBuf,
    /// Whether missing languages may be downloaded into `tessdata_dir`
    download: bool,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let engine = match &config.tessdata_path {
            Some(path) => Self {
                tessdata_dir: PathBuf::from(path),
                download: false,
            },
            None => Self {
                tessdata_dir: cache_dir().join("tessdata"),
                download: true,
            },
        };

        // Fail at startup rather than on the first request
        let probe = engine.tesseract(&config.default_language)?;
        drop(probe);

        tracing::info!(
            "Leptess engine initialized (tessdata: {:?}, language: {})",
            engine.tessdata_dir,
            config.default_language
        );

        Ok(engine)
    }

    fn tesseract(&self, language: &str) -> Result<Tesseract, OcrError> {
        if self.download {
            ensure_downloaded(
                &tessdata_url(language),
                &self.tessdata_dir,
                &format!("{}.traineddata", language),
            )?;
        }

        let dir = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))?;

        Tesseract::new(Some(dir), Some(language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })
    }
}

impl Recognizer for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn supported_languages(&self) -> Vec<String> {
        LANGUAGES.iter().map(|l| l.to_string()).collect()
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &ProgressSink,
    ) -> Result<Recognition, OcrError> {
        if !self.supports_language(language) {
            return Err(OcrError::Recognition(format!(
                "leptess does not support language '{}'",
                language
            )));
        }

        progress.status(STATUS_LOADING);
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::ImageEncode(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Processing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        let tess = self
            .tesseract(language)
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        let tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::Recognition(format!("Failed to set image ({}x{}): {}", width, height, e))
        })?;

        // Tesseract gives no intermediate progress through this API
        progress.recognizing(0.0);
        let mut tess = tess
            .recognize()
            .map_err(|e| OcrError::Recognition(format!("Failed to recognize text: {}", e)))?;
        progress.recognizing(1.0);

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Recognition(format!("Failed to get text: {}", e)))?;
        progress.status(STATUS_DONE);

        Ok(Recognition {
            text: text.trim().to_string(),
            language: language.to_string(),
        })
    }
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
