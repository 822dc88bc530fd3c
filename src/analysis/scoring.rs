use crate::transcription::TranscriptWord;

use super::{MetricsBundle, PaceResult, PaceStatus};

/// Pace classification band in words per minute.
const WPM_GOOD_MIN: u32 = 130;
const WPM_GOOD_MAX: u32 = 170;

/// Center and tolerance of the pace sub-score band.
const WPM_IDEAL: f64 = 150.0;
const WPM_TOLERANCE: f64 = 20.0;
/// Sub-score points lost per wpm of deviation beyond the tolerance band.
const WPM_PENALTY_PER_POINT: f64 = 1.5;

/// An inter-word gap longer than this counts as a long pause.
const LONG_PAUSE_SECS: f64 = 1.5;
const FILLER_PENALTY: u32 = 2;
const LONG_PAUSE_PENALTY: u32 = 4;

/// Tone needs audio features (pitch, intensity) that are not captured yet;
/// reports carry this fixed placeholder until they are.
pub const TONE_PLACEHOLDER: u32 = 75;

pub fn calculate_pace(words: &[TranscriptWord]) -> PaceResult {
    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return PaceResult { words_per_minute: 0, status: PaceStatus::NotAvailable };
    };

    let duration_minutes = (last.end - first.start) / 60.0;
    if duration_minutes <= 0.0 {
        return PaceResult { words_per_minute: 0, status: PaceStatus::NotAvailable };
    }

    let wpm = (words.len() as f64 / duration_minutes).round() as u32;
    let status = if wpm > WPM_GOOD_MAX {
        PaceStatus::TooFast
    } else if wpm >= WPM_GOOD_MIN {
        PaceStatus::Good
    } else {
        PaceStatus::TooSlow
    };

    PaceResult { words_per_minute: wpm, status }
}

/// 100 inside the ideal band, then a linear penalty per wpm of additional
/// deviation, floored at zero.
pub fn score_pace(wpm: u32) -> u32 {
    let deviation = (wpm as f64 - WPM_IDEAL).abs();
    if deviation <= WPM_TOLERANCE {
        return 100;
    }
    let penalty = (deviation - WPM_TOLERANCE) * WPM_PENALTY_PER_POINT;
    (100.0 - penalty).max(0.0).round() as u32
}

/// Mean word-recognition confidence scaled to 0..=100.
pub fn calculate_clarity(words: &[TranscriptWord]) -> u32 {
    if words.is_empty() {
        return 0;
    }
    let total: f64 = words.iter().map(|w| w.confidence).sum();
    ((total / words.len() as f64) * 100.0).round() as u32
}

/// Penalizes filler words and long inter-word pauses against a baseline of
/// 100. A single word carries no gap information, so short inputs score 100.
pub fn calculate_fluency(words: &[TranscriptWord], filler_count: u32) -> u32 {
    if words.len() < 2 {
        return 100;
    }
    let long_pauses = words
        .windows(2)
        .filter(|pair| pair[1].start - pair[0].end > LONG_PAUSE_SECS)
        .count() as u32;
    let penalty = filler_count * FILLER_PENALTY + long_pauses * LONG_PAUSE_PENALTY;
    100u32.saturating_sub(penalty)
}

pub fn calculate_confidence(clarity: u32, fluency: u32, pace_score: u32) -> u32 {
    (0.4 * clarity as f64 + 0.4 * fluency as f64 + 0.2 * pace_score as f64).round() as u32
}

/// Weighted aggregate of the delivery scores. Tone is deliberately excluded;
/// clarity and fluency also reach this sum through the confidence composite,
/// which effectively double-weights them relative to pace.
pub fn overall_score(metrics: &MetricsBundle) -> u32 {
    (0.3 * metrics.clarity as f64
        + 0.3 * metrics.fluency as f64
        + 0.2 * metrics.pace as f64
        + 0.2 * metrics.confidence as f64)
        .round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64, confidence: f64) -> TranscriptWord {
        TranscriptWord { text: "w".to_string(), start, end, confidence }
    }

    fn words_at_wpm(count: usize, wpm: f64) -> Vec<TranscriptWord> {
        let spacing = 60.0 / wpm;
        (0..count)
            .map(|i| word(i as f64 * spacing, i as f64 * spacing + spacing, 1.0))
            .collect()
    }

    #[test]
    fn pace_of_empty_sequence_is_not_available() {
        let result = calculate_pace(&[]);
        assert_eq!(result.words_per_minute, 0);
        assert_eq!(result.status, PaceStatus::NotAvailable);
    }

    #[test]
    fn pace_of_zero_duration_is_not_available() {
        // A single word whose start equals its end spans no time at all.
        let result = calculate_pace(&[word(2.0, 2.0, 0.9)]);
        assert_eq!(result.words_per_minute, 0);
        assert_eq!(result.status, PaceStatus::NotAvailable);
    }

    #[test]
    fn pace_classification_thresholds() {
        assert_eq!(calculate_pace(&words_at_wpm(20, 171.5)).status, PaceStatus::TooFast);
        assert_eq!(calculate_pace(&words_at_wpm(20, 170.0)).status, PaceStatus::Good);
        assert_eq!(calculate_pace(&words_at_wpm(20, 130.0)).status, PaceStatus::Good);
        assert_eq!(calculate_pace(&words_at_wpm(20, 129.0)).status, PaceStatus::TooSlow);
        assert_eq!(calculate_pace(&words_at_wpm(20, 80.0)).status, PaceStatus::TooSlow);
    }

    #[test]
    fn pace_sub_score_band_and_penalty() {
        assert_eq!(score_pace(150), 100);
        assert_eq!(score_pace(130), 100);
        assert_eq!(score_pace(170), 100);
        // 10 wpm past the band edge costs 15 points.
        assert_eq!(score_pace(180), 85);
        assert_eq!(score_pace(120), 85);
        // Far outside the band the penalty floors at zero.
        assert_eq!(score_pace(300), 0);
        assert_eq!(score_pace(0), 0);
    }

    #[test]
    fn clarity_is_scaled_mean_confidence() {
        assert_eq!(calculate_clarity(&[]), 0);
        assert_eq!(calculate_clarity(&[word(0.0, 0.5, 1.0)]), 100);
        let words = [word(0.0, 0.5, 0.8), word(0.5, 1.0, 0.9)];
        assert_eq!(calculate_clarity(&words), 85);
    }

    #[test]
    fn fluency_with_one_word_is_fixed() {
        assert_eq!(calculate_fluency(&[], 7), 100);
        assert_eq!(calculate_fluency(&[word(0.0, 1.0, 0.5)], 7), 100);
    }

    #[test]
    fn fluency_penalizes_fillers_and_long_pauses() {
        // Gap of 2.0s between the words counts as one long pause.
        let words = [word(0.0, 0.5, 1.0), word(2.5, 3.0, 1.0)];
        assert_eq!(calculate_fluency(&words, 0), 96);
        assert_eq!(calculate_fluency(&words, 3), 90);

        // A 1.5s gap is exactly at the threshold and does not count.
        let words = [word(0.0, 0.5, 1.0), word(2.0, 2.5, 1.0)];
        assert_eq!(calculate_fluency(&words, 0), 100);
    }

    #[test]
    fn fluency_floors_at_zero() {
        let words = [word(0.0, 0.5, 1.0), word(0.6, 1.0, 1.0)];
        assert_eq!(calculate_fluency(&words, 60), 0);
    }

    #[test]
    fn confidence_composite_weights() {
        assert_eq!(calculate_confidence(100, 100, 100), 100);
        assert_eq!(calculate_confidence(80, 90, 70), 82);
        assert_eq!(calculate_confidence(0, 0, 0), 0);
    }

    #[test]
    fn overall_score_weights() {
        let metrics = MetricsBundle { clarity: 100, fluency: 100, pace: 100, confidence: 100, tone: 75 };
        assert_eq!(overall_score(&metrics), 100);

        let metrics = MetricsBundle { clarity: 80, fluency: 60, pace: 40, confidence: 64, tone: 75 };
        // 0.3*80 + 0.3*60 + 0.2*40 + 0.2*64 = 62.8 -> 63
        assert_eq!(overall_score(&metrics), 63);
    }
}
