use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid pixel buffer: {0}")]
    InvalidInput(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(String),

    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Invalid pipeline stage: {0}")]
    InvalidStage(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            OcrError::InvalidInput(_) => "INVALID_INPUT",
            OcrError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            OcrError::ImageEncode(_) => "IMAGE_ENCODE_ERROR",
            OcrError::Recognition(_) => "RECOGNITION_ERROR",
            OcrError::InitializationError(_) => "INIT_ERROR",
            OcrError::InvalidStage(_) => "INVALID_STAGE",
            OcrError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            OcrError::MissingFile => "MISSING_FILE",
            OcrError::InvalidRequest(_) => "INVALID_REQUEST",
            OcrError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OcrError::InvalidInput(_)
            | OcrError::ImageDecode(_)
            | OcrError::InvalidStage(_)
            | OcrError::MissingFile
            | OcrError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OcrError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            OcrError::Recognition(_) => StatusCode::BAD_GATEWAY,
            OcrError::InitializationError(_) => StatusCode::SERVICE_UNAVAILABLE,
            OcrError::ImageEncode(_) | OcrError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(
            OcrError::InvalidInput("len".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OcrError::ImageDecode("bad png".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OcrError::ImageTooLarge { size: 10, max: 5 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_recognition_error_code() {
        let err = OcrError::Recognition("engine crashed".into());
        assert_eq!(err.code(), "RECOGNITION_ERROR");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("engine crashed"));
    }
}
