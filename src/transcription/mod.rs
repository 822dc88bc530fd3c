mod assemblyai;
mod google;

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A single recognized word with timing offsets (seconds from the start of
/// the recording) and the recognizer's confidence in it, 0.0 to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub words: Vec<TranscriptWord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SttProvider {
    Google,
    AssemblyAI,
}

impl SttProvider {
    pub fn from_str(s: &str) -> Self {
        match s {
            "assemblyai" => SttProvider::AssemblyAI,
            _ => SttProvider::Google,
        }
    }

    pub fn api_key_name(&self) -> &'static str {
        match self {
            SttProvider::Google => "GOOGLE_SPEECH_API_KEY",
            SttProvider::AssemblyAI => "ASSEMBLYAI_API_KEY",
        }
    }
}

/// Recognition parameters derived from the uploaded file's MIME type.
/// Browser recordings arrive as WebM/Opus, which is also the fallback for
/// anything unrecognized.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    pub encoding: &'static str,
    pub sample_rate_hertz: u32,
    pub channels: Option<u32>,
}

impl AudioFormat {
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("webm") {
            AudioFormat { encoding: "WEBM_OPUS", sample_rate_hertz: 48000, channels: Some(1) }
        } else if mime.contains("ogg") {
            AudioFormat { encoding: "OGG_OPUS", sample_rate_hertz: 48000, channels: None }
        } else if mime.contains("mp4") {
            AudioFormat { encoding: "MP3", sample_rate_hertz: 48000, channels: None }
        } else {
            AudioFormat { encoding: "WEBM_OPUS", sample_rate_hertz: 48000, channels: Some(1) }
        }
    }
}

/// Client for the configured speech-to-text provider. One instance is built
/// at startup and shared by every request.
pub struct Transcriber {
    client: reqwest::Client,
    provider: SttProvider,
    api_key: String,
}

impl Transcriber {
    pub fn new(provider: SttProvider, api_key: String) -> Result<Self> {
        // AssemblyAI jobs are polled to completion, which can take minutes
        // for long recordings.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Transcriber { client, provider, api_key })
    }

    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<Transcription> {
        match self.provider {
            SttProvider::Google => {
                google::transcribe(&self.client, &self.api_key, audio, AudioFormat::from_mime(mime_type)).await
            }
            SttProvider::AssemblyAI => assemblyai::transcribe(&self.client, &self.api_key, audio).await,
        }
    }
}
