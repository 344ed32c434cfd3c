use crate::error::OcrError;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use image::DynamicImage;
use serde::Serialize;

pub const STATUS_LOADING: &str = "loading image";
pub const STATUS_DETECTING: &str = "detecting text";
pub const STATUS_RECOGNIZING: &str = "recognizing text";
pub const STATUS_DONE: &str = "done";

/// Text recognized from one image
#[derive(Debug, Clone)]
pub struct Recognition {
    pub text: String,
    pub language: String,
}

/// Progress notification emitted while recognizing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub status: String,
    /// Completion fraction in [0, 1]; only set while recognizing text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

impl ProgressEvent {
    /// One-line rendering, e.g. `recognizing text: 40%`
    pub fn describe(&self) -> String {
        match self.progress {
            Some(p) => format!("{}: {}%", self.status, (p * 100.0).round() as u32),
            None => self.status.clone(),
        }
    }
}

/// Sending half of a progress event stream.
///
/// Sends never block and are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }

    /// A sink whose events go nowhere
    pub fn discard() -> Self {
        Self::channel().0
    }

    pub fn status(&self, status: &str) {
        self.send(ProgressEvent {
            status: status.to_string(),
            progress: None,
        });
    }

    pub fn recognizing(&self, fraction: f32) {
        self.send(ProgressEvent {
            status: STATUS_RECOGNIZING.to_string(),
            progress: Some(fraction.clamp(0.0, 1.0)),
        });
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.unbounded_send(event);
    }
}

/// Trait that all OCR engines must implement
pub trait Recognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;

    /// Recognize text in `image`, reporting progress to `progress`
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &ProgressSink,
    ) -> Result<Recognition, OcrError>;

    fn supports_language(&self, language: &str) -> bool {
        self.supported_languages().iter().any(|l| l == language)
    }
}
