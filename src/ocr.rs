//! End-to-end job: decode, preprocess, encode for display, recognize.
//!
//! Filtering is CPU-bound and runs on the blocking pool. Each stage starts
//! only once the previous one has finished with the buffer; a decode failure
//! stops the job before any filter runs.

use crate::engine::{ProgressEvent, ProgressSink, Recognition, Recognizer};
use crate::error::OcrError;
use crate::pixel::PixelBuffer;
use crate::preprocessing::{Pipeline, PreprocessingResult};
use futures::StreamExt;
use std::sync::Arc;

/// Filtered image, ready for display
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub image: PixelBuffer,
    /// PNG encoding of `image`
    pub png: Vec<u8>,
    pub preprocessing: PreprocessingResult,
}

/// Result of a full job.
///
/// Recognition can fail independently; the filtered image stays usable.
#[derive(Debug)]
pub struct OcrOutcome {
    pub preprocessed: Preprocessed,
    pub engine: &'static str,
    pub recognition: Result<Recognition, OcrError>,
    pub progress: Vec<ProgressEvent>,
}

/// Decode and filter an encoded image on the calling thread
pub fn preprocess_blocking(pipeline: &Pipeline, bytes: &[u8]) -> Result<Preprocessed, OcrError> {
    let mut image = PixelBuffer::decode(bytes)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "decoded image"
    );

    let preprocessing = pipeline.process(&mut image)?;
    let png = image.encode_png()?;

    Ok(Preprocessed {
        image,
        png,
        preprocessing,
    })
}

/// Decode and filter an encoded image on the blocking pool
pub async fn preprocess(pipeline: Arc<Pipeline>, bytes: Vec<u8>) -> Result<Preprocessed, OcrError> {
    tokio::task::spawn_blocking(move || preprocess_blocking(&pipeline, &bytes))
        .await
        .map_err(|e| OcrError::Internal(format!("preprocessing task failed: {}", e)))?
}

/// Recognize text in an already filtered image, collecting progress events
pub async fn recognize(
    recognizer: Arc<dyn Recognizer>,
    image: &PixelBuffer,
    language: &str,
) -> (Result<Recognition, OcrError>, Vec<ProgressEvent>) {
    let dynamic = match image.to_image() {
        Ok(dynamic) => dynamic,
        Err(e) => return (Err(e), Vec::new()),
    };
    let language = language.to_string();
    let (sink, events) = ProgressSink::channel();

    let task = tokio::task::spawn_blocking(move || {
        let result = recognizer.recognize(&dynamic, &language, &sink);
        if let Err(e) = &result {
            tracing::warn!("Recognition failed: {}", e);
        }
        result
    });

    // The sink moves into the task, so the stream ends when it finishes
    let progress: Vec<ProgressEvent> = events
        .inspect(|event| {
            tracing::debug!(status = %event.status, progress = ?event.progress, "ocr progress")
        })
        .collect()
        .await;

    let result = task
        .await
        .map_err(|e| OcrError::Recognition(format!("recognition task failed: {}", e)))
        .and_then(|r| r);
    (result, progress)
}

/// One image through the whole chain
pub struct OcrJob {
    pub pipeline: Arc<Pipeline>,
    pub recognizer: Arc<dyn Recognizer>,
    pub language: String,
}

impl OcrJob {
    pub async fn run(self, bytes: Vec<u8>) -> Result<OcrOutcome, OcrError> {
        let preprocessed = preprocess(self.pipeline, bytes).await?;
        let engine = self.recognizer.name();
        let (recognition, progress) =
            recognize(self.recognizer, &preprocessed.image, &self.language).await;

        Ok(OcrOutcome {
            preprocessed,
            engine,
            recognition,
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{STATUS_DONE, STATUS_RECOGNIZING};
    use crate::preprocessing::Preset;
    use image::DynamicImage;

    struct Scripted {
        fail: bool,
    }

    impl Recognizer for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn description(&self) -> &'static str {
            "returns the image size as text"
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }

        fn recognize(
            &self,
            image: &DynamicImage,
            language: &str,
            progress: &ProgressSink,
        ) -> Result<Recognition, OcrError> {
            progress.recognizing(0.5);
            if self.fail {
                return Err(OcrError::Recognition("scripted failure".into()));
            }
            progress.recognizing(1.0);
            progress.status(STATUS_DONE);
            Ok(Recognition {
                text: format!("{}x{}", image.width(), image.height()),
                language: language.to_string(),
            })
        }
    }

    fn job(fail: bool) -> OcrJob {
        OcrJob {
            pipeline: Arc::new(Pipeline::from_preset(Preset::Default)),
            recognizer: Arc::new(Scripted { fail }),
            language: "eng".to_string(),
        }
    }

    fn grey_png() -> Vec<u8> {
        PixelBuffer::filled(5, 3, [200, 200, 200, 255])
            .encode_png()
            .unwrap()
    }

    #[tokio::test]
    async fn test_job_filters_then_recognizes() {
        let outcome = job(false).run(grey_png()).await.unwrap();

        assert_eq!(
            outcome.preprocessed.image,
            PixelBuffer::filled(5, 3, [255, 255, 255, 255])
        );
        assert_eq!(outcome.engine, "scripted");
        assert_eq!(outcome.recognition.unwrap().text, "5x3");
        assert_eq!(outcome.progress.len(), 3);
        assert_eq!(outcome.progress[0].status, STATUS_RECOGNIZING);
        assert_eq!(outcome.progress[0].progress, Some(0.5));
    }

    #[tokio::test]
    async fn test_recognition_failure_keeps_filtered_image() {
        let outcome = job(true).run(grey_png()).await.unwrap();

        assert!(matches!(outcome.recognition, Err(OcrError::Recognition(_))));
        let decoded = PixelBuffer::decode(&outcome.preprocessed.png).unwrap();
        assert_eq!(decoded, outcome.preprocessed.image);
        assert_eq!(outcome.progress.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_aborts_before_filters() {
        let err = job(false).run(b"not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, OcrError::ImageDecode(_)));
    }
}
