use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Caller-visible failure taxonomy for the analysis pipeline. Collaborator
/// and storage causes ride along as structured sources instead of leaking
/// provider error text into the API contract.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Audio file is required.")]
    MissingAudio,

    #[error("Audio recording is too short or empty. Please record at least 3 seconds of speech.")]
    AudioTooSmall,

    #[error("Audio is too short or unclear. Please record at least 5 seconds of clear speech.")]
    InsufficientAudio,

    #[error("Could not transcribe audio. Please ensure you spoke clearly and the audio quality is good.")]
    TranscriptionFailed(#[source] anyhow::Error),

    #[error("Failed to save the analysis report. Please try again.")]
    PersistenceFailed(#[source] anyhow::Error),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingAudio
            | ApiError::AudioTooSmall
            | ApiError::InsufficientAudio
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TranscriptionFailed(_) | ApiError::PersistenceFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ApiError::AudioTooSmall => Some("Audio file too small".to_string()),
            ApiError::InsufficientAudio => Some("Insufficient audio content".to_string()),
            ApiError::TranscriptionFailed(source) | ApiError::PersistenceFailed(source) => {
                Some(format!("{:#}", source))
            }
            ApiError::MissingAudio | ApiError::BadRequest(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "analysis request failed");
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            error: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}
