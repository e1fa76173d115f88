//! Interchange document codec.
//!
//! A snapshot is one pretty-printed JSON object:
//!
//! ```json
//! {
//!   "skills": [...],
//!   "resources": [...],
//!   "skill_resources": [...],
//!   "questions": [...],
//!   "learning_content_other": [...],
//!   "quiz_attempts": [...],
//!   "export_metadata": { "timestamp": "...", "source": "...", "total_skills": 3, ... }
//! }
//! ```
//!
//! Absent collections read as empty and unknown keys are ignored, so older
//! documents without `learning_content_other` or `quiz_attempts` still load.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::core::model::{LearningContent, QuizAttempt, Resource, Skill, SkillResourceLink};
use crate::core::value::parse_timestamp;
use crate::error::{MigrateError, Result};

/// Entity collections of one snapshot, each ordered by source id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub skills: Vec<Skill>,

    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default)]
    pub skill_resources: Vec<SkillResourceLink>,

    /// Learning content of type `questions`.
    #[serde(default)]
    pub questions: Vec<LearningContent>,

    /// Learning content of every other type.
    #[serde(default)]
    pub learning_content_other: Vec<LearningContent>,

    #[serde(default)]
    pub quiz_attempts: Vec<QuizAttempt>,
}

impl Collections {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.resources.is_empty()
            && self.skill_resources.is_empty()
            && self.questions.is_empty()
            && self.learning_content_other.is_empty()
            && self.quiz_attempts.is_empty()
    }
}

/// Migration envelope (`export_metadata`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    #[serde(default = "Utc::now", deserialize_with = "envelope_timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub total_skills: usize,

    #[serde(default)]
    pub total_resources: usize,

    #[serde(default)]
    pub total_mappings: usize,

    #[serde(default)]
    pub total_questions: usize,

    #[serde(default)]
    pub total_other_content: usize,

    #[serde(default)]
    pub total_quiz_attempts: usize,
}

impl ExportMetadata {
    /// Envelope describing `collections`, stamped now.
    pub fn describe(collections: &Collections, source: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            target: None,
            total_skills: collections.skills.len(),
            total_resources: collections.resources.len(),
            total_mappings: collections.skill_resources.len(),
            total_questions: collections.questions.len(),
            total_other_content: collections.learning_content_other.len(),
            total_quiz_attempts: collections.quiz_attempts.len(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Older exports wrote naive local timestamps; read those as UTC.
fn envelope_timestamp<'de, D>(d: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid export timestamp '{}'", raw)))
}

/// A complete interchange document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub collections: Collections,

    pub export_metadata: ExportMetadata,
}

/// Serialize a snapshot to document text.
pub fn serialize(collections: &Collections, envelope: &ExportMetadata) -> Result<String> {
    #[derive(Serialize)]
    struct DocumentRef<'a> {
        #[serde(flatten)]
        collections: &'a Collections,
        export_metadata: &'a ExportMetadata,
    }

    Ok(serde_json::to_string_pretty(&DocumentRef {
        collections,
        export_metadata: envelope,
    })?)
}

/// Parse document text back into a snapshot.
pub fn deserialize(document: &str) -> Result<(Collections, ExportMetadata)> {
    let doc: Document = serde_json::from_str(document)?;
    Ok((doc.collections, doc.export_metadata))
}

/// Serialize and write a snapshot to `path`.
pub fn write_document(
    path: impl AsRef<Path>,
    collections: &Collections,
    envelope: &ExportMetadata,
) -> Result<()> {
    let path = path.as_ref();
    let text = serialize(collections, envelope)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!(
        "Wrote interchange document {} ({} skills, {} resources, {} links, {} questions)",
        path.display(),
        envelope.total_skills,
        envelope.total_resources,
        envelope.total_mappings,
        envelope.total_questions
    );
    Ok(())
}

/// Read and parse a snapshot from `path`. A missing file is a configuration error.
pub fn read_document(path: impl AsRef<Path>) -> Result<(Collections, ExportMetadata)> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MigrateError::Config(format!(
            "interchange document {} not found; run export first",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    deserialize(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ContentKind, DemandTrend, ResourceRole};
    use chrono::TimeZone;

    fn sample() -> Collections {
        let created = Utc.with_ymd_and_hms(2025, 7, 6, 21, 56, 3).unwrap();
        Collections {
            skills: vec![Skill {
                id: Some(1),
                name: "Zero Trust Architecture".into(),
                keywords: vec!["zero trust".into(), "identity".into()],
                related_skills: vec![],
                demand_trend: Some(DemandTrend::Rising),
                job_market_data: Some(r#"{"postings": 120}"#.into()),
                urgency_score: Some(8.5),
                created_at: Some(created),
                ..Default::default()
            }],
            resources: vec![Resource {
                id: Some(10),
                title: "Intro to ZTA".into(),
                url: "https://example.com/zta".into(),
                tags: vec!["nist".into()],
                quality_score: Some(0.8),
                prerequisites: Some("[]".into()),
                ..Default::default()
            }],
            skill_resources: vec![SkillResourceLink {
                id: Some(5),
                skill_id: Some(1),
                resource_id: Some(10),
                relevance_score: Some(0.9),
                resource_type_for_skill: Some(ResourceRole::Practical),
                auto_discovered: Some(true),
                discovery_date: Some(created),
            }],
            questions: vec![LearningContent {
                id: Some(3),
                resource_id: Some(10),
                content_type: ContentKind::Questions,
                content_data: Some(r#"{"questions":[{"question":"What is ZTA?"}]}"#.into()),
                admin_approved: Some(false),
                ..Default::default()
            }],
            learning_content_other: vec![LearningContent {
                id: Some(4),
                resource_id: Some(10),
                content_type: ContentKind::Other("exercises".into()),
                content_data: Some("[]".into()),
                ..Default::default()
            }],
            quiz_attempts: vec![QuizAttempt {
                id: Some(1),
                resource_id: Some(10),
                answers: Some(r#"["a","b"]"#.into()),
                score_percentage: Some(50.0),
                created_at: Some(created),
            }],
        }
    }

    #[test]
    fn test_round_trip_preserves_collections() {
        let collections = sample();
        let envelope = ExportMetadata::describe(&collections, "local_database");
        let text = serialize(&collections, &envelope).unwrap();
        let (back, meta) = deserialize(&text).unwrap();
        assert_eq!(back, collections);
        assert_eq!(meta, envelope);
        assert_eq!(meta.total_questions, 1);
        assert_eq!(meta.total_other_content, 1);
    }

    #[test]
    fn test_document_shape() {
        let collections = sample();
        let envelope = ExportMetadata::describe(&collections, "local_database");
        let value: serde_json::Value =
            serde_json::from_str(&serialize(&collections, &envelope).unwrap()).unwrap();

        for key in ["skills", "resources", "skill_resources", "questions", "export_metadata"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["skills"][0]["skill_name"], "Zero Trust Architecture");
        assert!(value["skills"][0]["keywords"].is_array());
        assert!(value["skills"][0]["job_market_data"].is_string());
        assert!(value["export_metadata"].get("target").is_none());
    }

    #[test]
    fn test_reads_legacy_document_without_extra_collections() {
        let text = r#"{
            "skills": [{"id": 1, "skill_name": "Prompt Engineering"}],
            "resources": [],
            "skill_resources": [],
            "questions": [],
            "export_metadata": {
                "timestamp": "2025-07-06T21:56:03",
                "source": "local_sqlite",
                "total_skills": 1,
                "total_resources": 0,
                "total_mappings": 0,
                "total_questions": 0
            },
            "unrelated": true
        }"#;
        let (collections, meta) = deserialize(text).unwrap();
        assert_eq!(collections.skills.len(), 1);
        assert!(collections.quiz_attempts.is_empty());
        assert_eq!(meta.total_skills, 1);
        assert_eq!(meta.total_quiz_attempts, 0);
    }

    #[test]
    fn test_read_missing_document_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_write_then_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("export.json");
        let collections = sample();
        let envelope = ExportMetadata::describe(&collections, "local_database").with_target("prod");
        write_document(&path, &collections, &envelope).unwrap();
        let (back, meta) = read_document(&path).unwrap();
        assert_eq!(back, collections);
        assert_eq!(meta.target.as_deref(), Some("prod"));
    }
}
