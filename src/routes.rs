use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analysis;
use crate::analysis::feedback::{EvaluationMode, FeedbackComposer, FeedbackContext};
use crate::auth::TokenVerifier;
use crate::error::ApiError;
use crate::report::{AnalysisReport, ReportStore};
use crate::transcription::Transcriber;

/// Uploads larger than this are rejected before transcription.
const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;
/// Anything smaller cannot hold even a few seconds of encoded speech.
const MIN_AUDIO_BYTES: usize = 1000;
/// Transcripts shorter than this carry nothing worth scoring.
const MIN_TRANSCRIPT_CHARS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<Transcriber>,
    pub composer: Arc<FeedbackComposer>,
    pub store: Arc<ReportStore>,
    pub verifier: Arc<TokenVerifier>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/speech/analyze", post(analyze_speech))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

struct AnalyzeRequest {
    audio: Vec<u8>,
    mime_type: String,
    mode: EvaluationMode,
    is_practice_exercise: bool,
}

async fn read_analyze_request(mut multipart: Multipart) -> Result<AnalyzeRequest, ApiError> {
    let mut audio = None;
    let mut mime_type = "audio/webm".to_string();
    let mut mode = EvaluationMode::Interview;
    let mut is_practice_exercise = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                if let Some(content_type) = field.content_type() {
                    mime_type = content_type.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read audio field: {}", e)))?;
                audio = Some(bytes.to_vec());
            }
            "evaluationMode" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read evaluationMode: {}", e)))?;
                mode = EvaluationMode::from_str(value.trim());
            }
            "isPracticeExercise" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read isPracticeExercise: {}", e)))?;
                is_practice_exercise = value.trim() == "true";
            }
            _ => {}
        }
    }

    let audio = audio.ok_or(ApiError::MissingAudio)?;
    Ok(AnalyzeRequest { audio, mime_type, mode, is_practice_exercise })
}

/// Full analysis pipeline for one uploaded recording: transcribe, score,
/// compose feedback, and persist the report for authenticated non-practice
/// sessions. Each request owns all of its intermediates; nothing is shared
/// across requests.
async fn analyze_speech(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = read_analyze_request(multipart).await?;
    if request.audio.len() < MIN_AUDIO_BYTES {
        return Err(ApiError::AudioTooSmall);
    }

    // Missing or invalid credentials mean a guest analysis, never a 401.
    let user = state.verifier.user_from_headers(&headers);

    let transcription = state
        .transcriber
        .transcribe(&request.audio, &request.mime_type)
        .await
        .map_err(ApiError::TranscriptionFailed)?;

    if transcription.text.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
        return Err(ApiError::InsufficientAudio);
    }

    tracing::debug!(
        words = transcription.words.len(),
        chars = transcription.text.len(),
        "transcription received"
    );

    let speech = analysis::analyze_transcript(&transcription.text, &transcription.words);

    let (feedback, feedback_source) = {
        let ctx = FeedbackContext {
            transcript: &transcription.text,
            metrics: &speech.metrics,
            pace: &speech.pace,
            filler_words: &speech.filler_words,
            overall_score: speech.overall_score,
            mode: request.mode,
        };
        state.composer.compose(&ctx).await
    };

    let duration = transcription.words.last().map(|w| w.end).unwrap_or(0.0);
    let report = AnalysisReport {
        id: Uuid::new_v4(),
        user: user.clone(),
        transcript: transcription.text,
        overall_score: speech.overall_score,
        metrics: speech.metrics,
        pace: speech.pace,
        filler_words: speech.filler_words,
        strengths: feedback.strengths,
        areas_for_improvement: feedback.areas_for_improvement,
        recommendations: feedback.recommendations,
        evaluation_mode: request.mode,
        feedback_source,
        duration,
        word_count: transcription.words.len(),
        created_at: Utc::now(),
    };

    if user.is_some() && !request.is_practice_exercise {
        // The write must be confirmed before the response goes out.
        state.store.save(&report).map_err(ApiError::PersistenceFailed)?;
        tracing::info!(report_id = %report.id, overall = report.overall_score, "analysis report saved");
    } else if request.is_practice_exercise {
        tracing::debug!("practice exercise, analysis not persisted");
    } else {
        tracing::debug!("guest analysis, not persisted");
    }

    Ok(Json(json!({
        "success": true,
        "message": "Analysis completed successfully",
        "data": report,
    })))
}
