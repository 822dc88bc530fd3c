use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::feedback::{EvaluationMode, FeedbackSource};
use crate::analysis::{MetricsBundle, PaceResult};

/// One completed analysis, written once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Owning user; None for guest analyses (which are never persisted).
    pub user: Option<String>,
    pub transcript: String,
    pub overall_score: u32,
    pub metrics: MetricsBundle,
    pub pace: PaceResult,
    pub filler_words: BTreeMap<String, u32>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub recommendations: Vec<String>,
    pub evaluation_mode: EvaluationMode,
    pub feedback_source: FeedbackSource,
    /// End offset of the last recognized word, in seconds.
    pub duration: f64,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Report persistence: one JSON document per report under a data directory.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
        Ok(ReportStore { dir })
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("speakwise")
            .join("reports")
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Persist one report. Written to a temp file then renamed so a reader
    /// never observes a partial document.
    pub fn save(&self, report: &AnalysisReport) -> Result<()> {
        let body = serde_json::to_vec_pretty(report).context("Failed to serialize analysis report")?;
        let final_path = self.path_for(report.id);
        let tmp_path = final_path.with_extension("json.tmp");
        fs::write(&tmp_path, &body)
            .with_context(|| format!("Failed to write report {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("Failed to move report into place at {}", final_path.display()))?;
        Ok(())
    }

    pub fn load(&self, id: Uuid) -> Result<AnalysisReport> {
        let path = self.path_for(id);
        let body =
            fs::read(&path).with_context(|| format!("Failed to read report {}", path.display()))?;
        serde_json::from_slice(&body).context("Failed to parse stored analysis report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PaceStatus;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            id: Uuid::new_v4(),
            user: Some("user-1".to_string()),
            transcript: "um hello everyone".to_string(),
            overall_score: 88,
            metrics: MetricsBundle { clarity: 92, fluency: 98, pace: 100, confidence: 96, tone: 75 },
            pace: PaceResult { words_per_minute: 142, status: PaceStatus::Good },
            filler_words: BTreeMap::from([("um".to_string(), 1u32)]),
            strengths: vec!["Good clarity in your speech, with clear pronunciation on most words.".to_string()],
            areas_for_improvement: vec!["Continue to refine your speaking skills with regular practice.".to_string()],
            recommendations: vec!["Keep practicing regularly to maintain and improve your speaking abilities.".to_string()],
            evaluation_mode: EvaluationMode::Interview,
            feedback_source: FeedbackSource::RuleBased,
            duration: 7.2,
            word_count: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().to_path_buf()).unwrap();

        let report = sample_report();
        store.save(&report).unwrap();

        let loaded = store.load(report.id).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.transcript, report.transcript);
        assert_eq!(loaded.overall_score, report.overall_score);
        assert_eq!(loaded.metrics, report.metrics);
        assert_eq!(loaded.filler_words, report.filler_words);
    }

    #[test]
    fn wire_names_match_the_original_document() {
        let report = sample_report();
        let value = serde_json::to_value(&report).unwrap();

        assert!(value.get("_id").is_some());
        assert!(value.get("overallScore").is_some());
        assert!(value.get("fillerWords").is_some());
        assert!(value.get("areasForImprovement").is_some());
        assert!(value.get("wordCount").is_some());
        assert_eq!(value["pace"]["status"], "Good");
        assert!(value["pace"].get("wordsPerMinute").is_some());
    }

    #[test]
    fn load_of_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().to_path_buf()).unwrap();
        assert!(store.load(Uuid::new_v4()).is_err());
    }
}
