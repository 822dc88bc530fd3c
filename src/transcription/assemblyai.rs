use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::json;

use super::{Transcription, TranscriptWord};

const UPLOAD_URL: &str = "https://api.assemblyai.com/v2/upload";
const TRANSCRIPT_URL: &str = "https://api.assemblyai.com/v2/transcript";

/// Max poll time before giving up on an in-flight transcription.
const MAX_POLL_DURATION_SECS: u64 = 300;
/// Poll interval.
const POLL_INTERVAL_SECS: u64 = 3;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<AssemblyAiWord>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyAiWord {
    text: String,
    start: u64, // milliseconds
    end: u64,   // milliseconds
    confidence: f64,
}

pub async fn transcribe(client: &reqwest::Client, api_key: &str, audio: &[u8]) -> Result<Transcription> {
    tracing::debug!(bytes = audio.len(), "uploading audio to AssemblyAI");

    // Step 1: Upload the audio bytes
    let upload_response = client
        .post(UPLOAD_URL)
        .header("authorization", api_key)
        .header("content-type", "application/octet-stream")
        .body(audio.to_vec())
        .send()
        .await
        .context("Failed to upload audio to AssemblyAI")?;

    let upload_status = upload_response.status();
    if !upload_status.is_success() {
        let error_body = upload_response.text().await.unwrap_or_default();
        bail!("AssemblyAI upload error ({}): {}", upload_status, error_body);
    }

    let upload: UploadResponse = upload_response
        .json()
        .await
        .context("Failed to parse AssemblyAI upload response")?;

    // Step 2: Create the transcription request.
    // disfluencies keeps the um/uh tokens the filler scan looks for instead
    // of having the recognizer clean them away.
    let transcript_request = json!({
        "audio_url": upload.upload_url,
        "language_code": "en",
        "punctuate": true,
        "format_text": true,
        "disfluencies": true,
    });

    let create_response = client
        .post(TRANSCRIPT_URL)
        .header("authorization", api_key)
        .header("content-type", "application/json")
        .json(&transcript_request)
        .send()
        .await
        .context("Failed to create AssemblyAI transcription")?;

    let create_status = create_response.status();
    if !create_status.is_success() {
        let error_body = create_response.text().await.unwrap_or_default();
        bail!("AssemblyAI transcription request error ({}): {}", create_status, error_body);
    }

    let transcript: TranscriptResponse = create_response
        .json()
        .await
        .context("Failed to parse AssemblyAI transcription response")?;

    let transcript_id = transcript.id;
    tracing::debug!(id = %transcript_id, "AssemblyAI transcription queued, polling");

    // Step 3: Poll for completion
    let poll_start = Instant::now();
    let result = loop {
        if poll_start.elapsed().as_secs() > MAX_POLL_DURATION_SECS {
            bail!("AssemblyAI transcription timed out after {}s", MAX_POLL_DURATION_SECS);
        }

        tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

        let poll_response = client
            .get(format!("{}/{}", TRANSCRIPT_URL, transcript_id))
            .header("authorization", api_key)
            .send()
            .await
            .context("Failed to poll AssemblyAI transcription")?;

        let poll_status = poll_response.status();
        if !poll_status.is_success() {
            let error_body = poll_response.text().await.unwrap_or_default();
            bail!("AssemblyAI poll error ({}): {}", poll_status, error_body);
        }

        let result: TranscriptResponse = poll_response
            .json()
            .await
            .context("Failed to parse AssemblyAI poll response")?;

        match result.status.as_str() {
            "completed" => break result,
            "error" => {
                let message = result.error.unwrap_or_else(|| "Unknown error".to_string());
                bail!("AssemblyAI transcription failed: {}", message);
            }
            status => {
                tracing::debug!(status, elapsed_secs = poll_start.elapsed().as_secs(), "AssemblyAI still processing");
            }
        }
    };

    // Step 4: Convert to the shared transcription shape. Timestamps are in
    // milliseconds; offsets can arrive slightly out of order, so sort to
    // keep the sequence chronological.
    let mut words: Vec<TranscriptWord> = result
        .words
        .unwrap_or_default()
        .into_iter()
        .map(|w| TranscriptWord {
            text: w.text.trim().to_string(),
            start: w.start as f64 / 1000.0,
            end: w.end as f64 / 1000.0,
            confidence: w.confidence,
        })
        .filter(|w| !w.text.is_empty())
        .collect();

    words.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let text = result.text.unwrap_or_default();

    tracing::debug!(words = words.len(), "AssemblyAI transcription complete");

    Ok(Transcription { text, words })
}
