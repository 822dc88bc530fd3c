use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{MetricsBundle, PaceResult, PaceStatus};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-2.0-flash";

pub const MAX_STRENGTHS: usize = 4;
pub const MAX_IMPROVEMENTS: usize = 4;
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Context tag supplied by the caller. Changes the prompt wording only,
/// never the numeric scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Interview,
    Presentation,
    Viva,
}

impl EvaluationMode {
    pub fn from_str(s: &str) -> Self {
        match s {
            "presentation" => EvaluationMode::Presentation,
            "viva" => EvaluationMode::Viva,
            _ => EvaluationMode::Interview,
        }
    }

    fn prompt_instruction(&self) -> &'static str {
        match self {
            EvaluationMode::Interview => {
                "This was a job-interview answer: weigh composure, concise structure, and credibility most heavily."
            }
            EvaluationMode::Presentation => {
                "This was a prepared presentation: weigh audience engagement, pacing, and vocal variety most heavily."
            }
            EvaluationMode::Viva => {
                "This was an oral examination answer: weigh precision, clarity, and composure under questioning most heavily."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBundle {
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub recommendations: Vec<String>,
}

/// How a report's feedback was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Generated,
    RuleBased,
}

/// All inputs the composer needs for one analysis.
pub struct FeedbackContext<'a> {
    pub transcript: &'a str,
    pub metrics: &'a MetricsBundle,
    pub pace: &'a PaceResult,
    pub filler_words: &'a BTreeMap<String, u32>,
    pub overall_score: u32,
    pub mode: EvaluationMode,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// Composes coaching feedback for one analysis: a generative path through
/// the Gemini API when a key is configured, and a deterministic rule table
/// otherwise or whenever the generative path fails.
pub struct FeedbackComposer {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl FeedbackComposer {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(FeedbackComposer { client, api_key })
    }

    /// Compose feedback for one analysis. Any failure on the generative
    /// path degrades to the rule table; the caller only sees which path
    /// produced the result, never an error.
    pub async fn compose(&self, ctx: &FeedbackContext<'_>) -> (FeedbackBundle, FeedbackSource) {
        if let Some(api_key) = &self.api_key {
            match self.generate(api_key, ctx).await {
                Ok(bundle) => return (bundle, FeedbackSource::Generated),
                Err(err) => {
                    tracing::warn!("AI feedback generation failed, using rule-based feedback: {:#}", err);
                }
            }
        } else {
            tracing::debug!("no Gemini API key configured, using rule-based feedback");
        }
        (rule_based_feedback(ctx), FeedbackSource::RuleBased)
    }

    async fn generate(&self, api_key: &str, ctx: &FeedbackContext<'_>) -> Result<FeedbackBundle> {
        let prompt = build_prompt(ctx);
        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, GEMINI_MODEL);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .context("Failed to send request to the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, error_body);
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .context("Gemini reply contained no text part")?;

        parse_model_reply(&text)
    }
}

fn build_prompt(ctx: &FeedbackContext<'_>) -> String {
    let filler_total: u32 = ctx.filler_words.values().sum();
    let filler_summary = if filler_total > 0 {
        let details = ctx
            .filler_words
            .iter()
            .map(|(word, count)| format!("\"{}\": {} times", word, count))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Total: {} filler words ({})", filler_total, details)
    } else {
        "No filler words detected".to_string()
    };

    format!(
        r#"You are an expert speech coach analyzing a speech performance. Provide constructive, personalized feedback based on the following data:

**Speech Transcript:**
"{transcript}"

**Performance Metrics:**
- Overall Score: {overall}/100
- Clarity Score: {clarity}/100 (based on word recognition confidence)
- Fluency Score: {fluency}/100 (affected by pauses and filler words)
- Pace Score: {pace_score}/100
- Confidence Score: {confidence}/100
- Tone Score: {tone}/100

**Speaking Pace:**
- Words Per Minute: {wpm} WPM
- Status: {pace_status}
- Ideal Range: 130-170 WPM

**Filler Words Detected:**
{filler_summary}

**Context:**
{mode_instruction}

**Instructions:**
Respond with a single JSON object in exactly this shape:

{{
  "strengths": ["2-4 specific strengths based on the metrics"],
  "areasForImprovement": ["2-4 areas that need improvement"],
  "recommendations": ["3-5 actionable recommendations"]
}}

Reference actual metric values, keep every item constructive and actionable, and return ONLY the JSON object with no additional text."#,
        transcript = ctx.transcript,
        overall = ctx.overall_score,
        clarity = ctx.metrics.clarity,
        fluency = ctx.metrics.fluency,
        pace_score = ctx.metrics.pace,
        confidence = ctx.metrics.confidence,
        tone = ctx.metrics.tone,
        wpm = ctx.pace.words_per_minute,
        pace_status = ctx.pace.status,
        filler_summary = filler_summary,
        mode_instruction = ctx.mode.prompt_instruction(),
    )
}

/// Parse the model's reply into a feedback bundle. The model is instructed
/// to return bare JSON but routinely wraps it in Markdown fences; strip
/// those, then require all three keys. A bare string is accepted in place
/// of a one-element array, and each array is truncated to its maximum.
pub fn parse_model_reply(text: &str) -> Result<FeedbackBundle> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let value: serde_json::Value =
        serde_json::from_str(cleaned).context("Model reply is not valid JSON")?;

    Ok(FeedbackBundle {
        strengths: string_list(&value, "strengths", MAX_STRENGTHS)?,
        areas_for_improvement: string_list(&value, "areasForImprovement", MAX_IMPROVEMENTS)?,
        recommendations: string_list(&value, "recommendations", MAX_RECOMMENDATIONS)?,
    })
}

fn string_list(value: &serde_json::Value, key: &str, max_len: usize) -> Result<Vec<String>> {
    let Some(field) = value.get(key) else {
        bail!("Model reply is missing the '{}' field", key);
    };
    let mut items: Vec<String> = match field {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        serde_json::Value::String(s) => vec![s.clone()],
        _ => bail!("Model reply field '{}' is neither an array nor a string", key),
    };
    items.truncate(max_len);
    Ok(items)
}

/// Deterministic feedback from a fixed threshold table. Pure function: the
/// same metrics always produce the same bundle, and every array is
/// guaranteed at least one entry.
pub fn rule_based_feedback(ctx: &FeedbackContext<'_>) -> FeedbackBundle {
    let metrics = ctx.metrics;
    let pace = ctx.pace;
    let filler_total: u32 = ctx.filler_words.values().sum();

    let mut strengths = Vec::new();
    let mut areas_for_improvement = Vec::new();
    let mut recommendations = Vec::new();

    if pace.status == PaceStatus::Good {
        strengths.push(
            "Your speaking pace was excellent and engaging, maintaining an ideal rhythm throughout."
                .to_string(),
        );
    }
    if metrics.clarity > 90 {
        strengths.push(
            "Exceptional clarity - your words were very easy to understand with excellent pronunciation."
                .to_string(),
        );
    } else if metrics.clarity > 80 {
        strengths.push("Good clarity in your speech, with clear pronunciation on most words.".to_string());
    }
    if filler_total == 0 {
        strengths.push(
            "Fantastic job avoiding filler words - your speech was clean and professional.".to_string(),
        );
    } else if filler_total < 3 {
        strengths.push("Minimal use of filler words, showing good speaking discipline.".to_string());
    }
    if metrics.fluency > 85 {
        strengths.push("Excellent fluency with smooth transitions and natural flow.".to_string());
    }
    if metrics.confidence > 80 {
        strengths.push("Strong confidence in delivery, projecting authority and credibility.".to_string());
    }

    match pace.status {
        PaceStatus::TooFast => {
            areas_for_improvement.push(format!(
                "Speaking pace was too fast at {} WPM (ideal: 130-170 WPM).",
                pace.words_per_minute
            ));
            recommendations.push(
                "Try to build in deliberate pauses after key sentences to control your speed and allow your audience to digest information."
                    .to_string(),
            );
            recommendations.push(
                "Practice with a metronome or timer to develop a consistent, measured pace.".to_string(),
            );
        }
        PaceStatus::TooSlow => {
            areas_for_improvement.push(format!(
                "Speaking pace was too slow at {} WPM (ideal: 130-170 WPM).",
                pace.words_per_minute
            ));
            recommendations.push(
                "Work on increasing your energy and enthusiasm to naturally speed up your delivery."
                    .to_string(),
            );
            recommendations
                .push("Practice condensing your points and removing unnecessary pauses.".to_string());
        }
        PaceStatus::Good | PaceStatus::NotAvailable => {}
    }

    if metrics.fluency < 70 {
        areas_for_improvement.push(
            "Speech fluency could be improved - detected hesitations and interruptions in flow.".to_string(),
        );
        recommendations.push(
            "Practice your speech multiple times to become more comfortable with the content.".to_string(),
        );
        recommendations.push(
            "When you catch yourself using a filler word, try to replace it with a silent pause.".to_string(),
        );
    }

    if filler_total > 5 {
        let mut by_count: Vec<(&String, &u32)> = ctx.filler_words.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1));
        let top = by_count
            .iter()
            .take(2)
            .map(|(word, count)| format!("\"{}\" ({}x)", word, count))
            .collect::<Vec<_>>()
            .join(" and ");
        areas_for_improvement.push(format!(
            "High usage of filler words: {} total, especially {}.",
            filler_total, top
        ));
        recommendations.push(
            "Record yourself and identify your most common filler words to build awareness.".to_string(),
        );
    }

    if metrics.clarity < 80 {
        areas_for_improvement
            .push("Clarity could be improved - some words were difficult to understand.".to_string());
        recommendations
            .push("Focus on enunciation by exaggerating mouth movements during practice.".to_string());
        recommendations
            .push("Speak slightly slower and emphasize consonants for better clarity.".to_string());
    }

    if metrics.confidence < 70 {
        areas_for_improvement.push("Confidence level could be strengthened in your delivery.".to_string());
        recommendations
            .push("Practice power poses before speaking to boost confidence naturally.".to_string());
        recommendations
            .push("Make eye contact with your audience and use purposeful gestures.".to_string());
    }

    if strengths.is_empty() {
        strengths.push("You completed the speech and provided content for analysis.".to_string());
    }
    if areas_for_improvement.is_empty() {
        areas_for_improvement
            .push("Continue to refine your speaking skills with regular practice.".to_string());
    }
    if recommendations.is_empty() {
        recommendations
            .push("Keep practicing regularly to maintain and improve your speaking abilities.".to_string());
    }

    FeedbackBundle { strengths, areas_for_improvement, recommendations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        metrics: &'a MetricsBundle,
        pace: &'a PaceResult,
        filler_words: &'a BTreeMap<String, u32>,
    ) -> FeedbackContext<'a> {
        FeedbackContext {
            transcript: "hello there",
            metrics,
            pace,
            filler_words,
            overall_score: 80,
            mode: EvaluationMode::Interview,
        }
    }

    #[test]
    fn parse_accepts_fenced_json() {
        let reply = "```json\n{\"strengths\": [\"a\"], \"areasForImprovement\": [\"b\"], \"recommendations\": [\"c\"]}\n```";
        let bundle = parse_model_reply(reply).unwrap();
        assert_eq!(bundle.strengths, vec!["a"]);
        assert_eq!(bundle.areas_for_improvement, vec!["b"]);
        assert_eq!(bundle.recommendations, vec!["c"]);
    }

    #[test]
    fn parse_truncates_overlong_arrays() {
        let reply = serde_json::json!({
            "strengths": ["1", "2", "3", "4", "5", "6"],
            "areasForImprovement": ["1", "2", "3", "4", "5"],
            "recommendations": ["1", "2", "3", "4", "5", "6", "7"],
        })
        .to_string();
        let bundle = parse_model_reply(&reply).unwrap();
        assert_eq!(bundle.strengths.len(), MAX_STRENGTHS);
        assert_eq!(bundle.areas_for_improvement.len(), MAX_IMPROVEMENTS);
        assert_eq!(bundle.recommendations.len(), MAX_RECOMMENDATIONS);
    }

    #[test]
    fn parse_wraps_bare_strings() {
        let reply = serde_json::json!({
            "strengths": "only one",
            "areasForImprovement": ["b"],
            "recommendations": ["c"],
        })
        .to_string();
        let bundle = parse_model_reply(&reply).unwrap();
        assert_eq!(bundle.strengths, vec!["only one"]);
    }

    #[test]
    fn parse_rejects_missing_keys_and_non_json() {
        assert!(parse_model_reply("I could not produce feedback, sorry.").is_err());
        assert!(parse_model_reply("{\"strengths\": [\"a\"]}").is_err());
    }

    #[test]
    fn rule_based_is_deterministic() {
        let metrics = MetricsBundle { clarity: 85, fluency: 60, pace: 85, confidence: 65, tone: 75 };
        let pace = PaceResult { words_per_minute: 180, status: PaceStatus::TooFast };
        let mut fillers = BTreeMap::new();
        fillers.insert("um".to_string(), 5);
        fillers.insert("uh".to_string(), 2);

        let first = rule_based_feedback(&ctx(&metrics, &pace, &fillers));
        let second = rule_based_feedback(&ctx(&metrics, &pace, &fillers));
        assert_eq!(first, second);
    }

    #[test]
    fn rule_based_never_returns_empty_arrays() {
        // Metrics chosen so no threshold rule fires in any category.
        let metrics = MetricsBundle { clarity: 80, fluency: 80, pace: 100, confidence: 75, tone: 75 };
        let pace = PaceResult { words_per_minute: 0, status: PaceStatus::NotAvailable };
        let fillers = BTreeMap::from([("so".to_string(), 4u32)]);

        let bundle = rule_based_feedback(&ctx(&metrics, &pace, &fillers));
        assert!(!bundle.strengths.is_empty());
        assert!(!bundle.areas_for_improvement.is_empty());
        assert!(!bundle.recommendations.is_empty());
    }

    #[test]
    fn rule_based_flags_heavy_filler_usage() {
        let metrics = MetricsBundle { clarity: 95, fluency: 75, pace: 100, confidence: 90, tone: 75 };
        let pace = PaceResult { words_per_minute: 150, status: PaceStatus::Good };
        let fillers = BTreeMap::from([("um".to_string(), 6u32), ("like".to_string(), 1u32)]);

        let bundle = rule_based_feedback(&ctx(&metrics, &pace, &fillers));
        let flagged = bundle
            .areas_for_improvement
            .iter()
            .any(|item| item.contains("7 total") && item.contains("\"um\" (6x)"));
        assert!(flagged, "expected filler usage called out: {:?}", bundle.areas_for_improvement);
    }

    #[test]
    fn mode_changes_prompt_wording_only() {
        let metrics = MetricsBundle { clarity: 90, fluency: 90, pace: 100, confidence: 90, tone: 75 };
        let pace = PaceResult { words_per_minute: 150, status: PaceStatus::Good };
        let fillers = BTreeMap::new();

        let mut interview = ctx(&metrics, &pace, &fillers);
        interview.mode = EvaluationMode::Interview;
        let mut viva = ctx(&metrics, &pace, &fillers);
        viva.mode = EvaluationMode::Viva;

        assert_ne!(build_prompt(&interview), build_prompt(&viva));
        assert_eq!(rule_based_feedback(&interview), rule_based_feedback(&viva));
    }
}
