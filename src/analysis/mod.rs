pub mod feedback;
pub mod fillers;
pub mod scoring;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::transcription::TranscriptWord;

/// Words-per-minute classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaceStatus {
    #[serde(rename = "Too Fast")]
    TooFast,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Too Slow")]
    TooSlow,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl std::fmt::Display for PaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PaceStatus::TooFast => "Too Fast",
            PaceStatus::Good => "Good",
            PaceStatus::TooSlow => "Too Slow",
            PaceStatus::NotAvailable => "N/A",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceResult {
    pub words_per_minute: u32,
    pub status: PaceStatus,
}

/// The five delivery sub-scores, each 0..=100. `confidence` is a composite
/// of the other three delivery scores, not an independent measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub clarity: u32,
    pub fluency: u32,
    pub pace: u32,
    pub confidence: u32,
    pub tone: u32,
}

/// Everything the scorers derive from one transcription result.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechMetrics {
    pub filler_words: BTreeMap<String, u32>,
    pub filler_total: u32,
    pub pace: PaceResult,
    pub metrics: MetricsBundle,
    pub overall_score: u32,
}

/// Run the full scoring pipeline over one transcription result.
pub fn analyze_transcript(transcript: &str, words: &[TranscriptWord]) -> SpeechMetrics {
    let filler_words = fillers::count_filler_words(transcript);
    let filler_total = fillers::total_fillers(&filler_words);

    let pace = scoring::calculate_pace(words);
    let clarity = scoring::calculate_clarity(words);
    let fluency = scoring::calculate_fluency(words, filler_total);
    let pace_score = scoring::score_pace(pace.words_per_minute);
    let confidence = scoring::calculate_confidence(clarity, fluency, pace_score);

    let metrics = MetricsBundle {
        clarity,
        fluency,
        pace: pace_score,
        confidence,
        tone: scoring::TONE_PLACEHOLDER,
    };
    let overall_score = scoring::overall_score(&metrics);

    SpeechMetrics { filler_words, filler_total, pace, metrics, overall_score }
}
