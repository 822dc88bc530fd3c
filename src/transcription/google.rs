use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use super::{AudioFormat, Transcription, TranscriptWord};

const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    words: Vec<WordInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordInfo {
    word: String,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    confidence: f64,
}

pub async fn transcribe(
    client: &reqwest::Client,
    api_key: &str,
    audio: &[u8],
    format: AudioFormat,
) -> Result<Transcription> {
    let mut config = json!({
        "encoding": format.encoding,
        "sampleRateHertz": format.sample_rate_hertz,
        "languageCode": "en-US",
        "enableWordTimeOffsets": true,
        "enableWordConfidence": true,
        "enableAutomaticPunctuation": true,
    });
    if let Some(channels) = format.channels {
        config["audioChannelCount"] = json!(channels);
    }

    let request = json!({
        "config": config,
        "audio": { "content": BASE64.encode(audio) },
    });

    tracing::debug!(bytes = audio.len(), encoding = format.encoding, "sending audio to Google Speech-to-Text");

    let response = client
        .post(RECOGNIZE_URL)
        .query(&[("key", api_key)])
        .json(&request)
        .send()
        .await
        .context("Failed to send request to Google Speech-to-Text")?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        bail!("Google Speech-to-Text error ({}): {}", status, error_body);
    }

    let recognized: RecognizeResponse = response
        .json()
        .await
        .context("Failed to parse Google Speech-to-Text response")?;

    into_transcription(recognized)
}

/// Extract the best alternative of the first result. No result or no
/// alternative means the recognizer produced nothing usable.
fn into_transcription(recognized: RecognizeResponse) -> Result<Transcription> {
    let Some(alternative) = recognized
        .results
        .into_iter()
        .next()
        .and_then(|r| r.alternatives.into_iter().next())
    else {
        bail!("Google Speech-to-Text returned no transcription alternatives");
    };

    let words: Vec<TranscriptWord> = alternative
        .words
        .into_iter()
        .map(|w| TranscriptWord {
            text: w.word.trim().to_string(),
            start: parse_duration_secs(w.start_time.as_deref()),
            end: parse_duration_secs(w.end_time.as_deref()),
            confidence: w.confidence,
        })
        .filter(|w| !w.text.is_empty())
        .collect();

    tracing::debug!(words = words.len(), "Google Speech-to-Text transcription complete");

    Ok(Transcription { text: alternative.transcript, words })
}

/// Offsets arrive as JSON duration strings like "1.200s".
fn parse_duration_secs(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim_end_matches('s').parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_strings() {
        assert_eq!(parse_duration_secs(Some("1.200s")), 1.2);
        assert_eq!(parse_duration_secs(Some("0s")), 0.0);
        assert_eq!(parse_duration_secs(Some("12.5s")), 12.5);
        assert_eq!(parse_duration_secs(Some("garbage")), 0.0);
        assert_eq!(parse_duration_secs(None), 0.0);
    }

    #[test]
    fn maps_first_alternative_to_transcription() {
        let raw = serde_json::json!({
            "results": [{
                "alternatives": [{
                    "transcript": "hello world",
                    "confidence": 0.95,
                    "words": [
                        { "word": "hello", "startTime": "0s", "endTime": "0.400s", "confidence": 0.9 },
                        { "word": " world ", "startTime": "0.500s", "endTime": "1.000s", "confidence": 0.8 },
                        { "word": "  ", "startTime": "1.000s", "endTime": "1.100s", "confidence": 0.1 }
                    ]
                }]
            }]
        });
        let recognized: RecognizeResponse = serde_json::from_value(raw).unwrap();
        let transcription = into_transcription(recognized).unwrap();

        assert_eq!(transcription.text, "hello world");
        // Whitespace-only entries are dropped, word text is trimmed.
        assert_eq!(transcription.words.len(), 2);
        assert_eq!(transcription.words[1].text, "world");
        assert_eq!(transcription.words[1].start, 0.5);
        assert_eq!(transcription.words[1].end, 1.0);
        assert_eq!(transcription.words[1].confidence, 0.8);
    }

    #[test]
    fn empty_results_are_an_error() {
        let recognized: RecognizeResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(into_transcription(recognized).is_err());

        let recognized: RecognizeResponse =
            serde_json::from_value(serde_json::json!({ "results": [{ "alternatives": [] }] })).unwrap();
        assert!(into_transcription(recognized).is_err());
    }
}
