//! Default values for absent optional attributes, and the mapping of each
//! entity onto target columns.
//!
//! | attribute                 | default      |
//! |---------------------------|--------------|
//! | `cost_type`               | `"unknown"`  |
//! | `difficulty_level`        | `"unknown"`  |
//! | `relevance_score`         | `1.0`        |
//! | `quality_score`           | `0.0`        |
//! | `ai_analysis_score`       | `0.0`        |
//! | `urgency_score`           | `0.0`        |
//! | `demand_trend`            | `"stable"`   |
//! | `status`                  | `"active"`   |
//! | `resource_type_for_skill` | `"practical"`|
//! | `sequence_order`          | `0`          |
//! | `related_skills`, lists   | `[]`         |
//! | `prerequisites`           | `"[]"`       |
//! | `learning_objectives`     | `"[]"`       |
//! | `job_market_data`         | `"{}"`       |
//! | `usage_count`             | `0`          |
//! | creation timestamps       | load time    |
//! | other text                | `""`         |
//!
//! `ai_analysis_date` stays NULL when absent: it records when an analysis
//! ran, and no analysis ran at load time.

use chrono::{DateTime, Utc};

use crate::core::model::{
    DemandTrend, LearningContent, QuizAttempt, Resource, ResourceRole, Skill, SkillResourceLink,
    SkillStatus,
};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

pub const COST_TYPE: &str = "unknown";
pub const DIFFICULTY_LEVEL: &str = "unknown";
pub const RELEVANCE_SCORE: f64 = 1.0;
pub const QUALITY_SCORE: f64 = 0.0;
pub const AI_ANALYSIS_SCORE: f64 = 0.0;
pub const URGENCY_SCORE: f64 = 0.0;
pub const DEMAND_TREND: DemandTrend = DemandTrend::Stable;
pub const SKILL_STATUS: SkillStatus = SkillStatus::Active;
pub const RESOURCE_ROLE: ResourceRole = ResourceRole::Practical;
pub const SEQUENCE_ORDER: i64 = 0;
pub const PREREQUISITES: &str = "[]";
pub const LEARNING_OBJECTIVES: &str = "[]";
pub const JOB_MARKET_DATA: &str = "{}";
pub const USAGE_COUNT: i64 = 0;

/// Column/value pairs for one insert.
pub type Fields = Vec<(&'static str, SqlValue)>;

fn text_or(value: &Option<String>, default: &str) -> SqlValue {
    SqlValue::Text(value.clone().unwrap_or_else(|| default.to_string()))
}

/// Stored label text; only an absent label takes the default.
fn label_or(value: Option<&str>, default: &str) -> SqlValue {
    SqlValue::Text(value.unwrap_or(default).to_string())
}

fn list(values: &[String]) -> SqlValue {
    SqlValue::Text(serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string()))
}

fn required<'a>(value: &'a str, collection: &str, field: &str, record: String) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(MigrateError::required(collection, field, record))
    } else {
        Ok(value)
    }
}

pub fn skill_fields(skill: &Skill, now: DateTime<Utc>) -> Result<Fields> {
    let name = required(&skill.name, "skills", "skill_name", skill.label())?;

    Ok(vec![
        ("skill_name", name.into()),
        ("category", text_or(&skill.category, "")),
        (
            "urgency_score",
            SqlValue::Float(skill.urgency_score.unwrap_or(URGENCY_SCORE)),
        ),
        (
            "demand_trend",
            label_or(
                skill.demand_trend.as_ref().map(DemandTrend::as_str),
                DEMAND_TREND.as_str(),
            ),
        ),
        ("source_analysis", text_or(&skill.source_analysis, "")),
        ("description", text_or(&skill.description, "")),
        ("keywords", list(&skill.keywords)),
        ("related_skills", list(&skill.related_skills)),
        ("job_market_data", text_or(&skill.job_market_data, JOB_MARKET_DATA)),
        (
            "status",
            label_or(
                skill.status.as_ref().map(SkillStatus::as_str),
                SKILL_STATUS.as_str(),
            ),
        ),
        ("created_at", skill.created_at.unwrap_or(now).into()),
        ("updated_at", skill.updated_at.unwrap_or(now).into()),
    ])
}

pub fn resource_fields(resource: &Resource, now: DateTime<Utc>) -> Result<Fields> {
    let title = required(&resource.title, "resources", "title", resource.label())?;
    let url = required(&resource.url, "resources", "url", resource.label())?;

    Ok(vec![
        ("title", title.into()),
        ("url", url.into()),
        ("resource_type", text_or(&resource.resource_type, "")),
        ("cost_type", text_or(&resource.cost_type, COST_TYPE)),
        (
            "difficulty_level",
            text_or(&resource.difficulty_level, DIFFICULTY_LEVEL),
        ),
        ("estimated_duration", text_or(&resource.estimated_duration, "")),
        ("description", text_or(&resource.description, "")),
        ("author", text_or(&resource.author, "")),
        ("tags", list(&resource.tags)),
        ("skill_category", text_or(&resource.skill_category, "")),
        (
            "quality_score",
            SqlValue::Float(resource.quality_score.unwrap_or(QUALITY_SCORE)),
        ),
        ("discovery_method", text_or(&resource.discovery_method, "")),
        (
            "ai_analysis_score",
            SqlValue::Float(resource.ai_analysis_score.unwrap_or(AI_ANALYSIS_SCORE)),
        ),
        (
            "ai_analysis_details",
            text_or(&resource.ai_analysis_details, ""),
        ),
        (
            "ai_analysis_date",
            SqlValue::opt_timestamp(resource.ai_analysis_date),
        ),
        ("learning_level", text_or(&resource.learning_level, "")),
        (
            "sequence_order",
            SqlValue::Int(resource.sequence_order.unwrap_or(SEQUENCE_ORDER)),
        ),
        ("prerequisites", text_or(&resource.prerequisites, PREREQUISITES)),
        (
            "learning_objectives",
            text_or(&resource.learning_objectives, LEARNING_OBJECTIVES),
        ),
        ("created_at", resource.created_at.unwrap_or(now).into()),
    ])
}

/// Fields for a link whose ids are already translated to target ids.
pub fn link_fields(
    link: &SkillResourceLink,
    skill_id: i64,
    resource_id: i64,
    now: DateTime<Utc>,
) -> Fields {
    vec![
        ("skill_id", SqlValue::Int(skill_id)),
        ("resource_id", SqlValue::Int(resource_id)),
        (
            "relevance_score",
            SqlValue::Float(link.relevance_score.unwrap_or(RELEVANCE_SCORE)),
        ),
        (
            "resource_type_for_skill",
            label_or(
                link.resource_type_for_skill.as_ref().map(ResourceRole::as_str),
                RESOURCE_ROLE.as_str(),
            ),
        ),
        ("auto_discovered", SqlValue::Bool(link.auto_discovered.unwrap_or(false))),
        ("discovery_date", link.discovery_date.unwrap_or(now).into()),
    ]
}

/// Fields for learning content with translated ids.
pub fn content_fields(
    content: &LearningContent,
    resource_id: i64,
    skill_id: Option<i64>,
    now: DateTime<Utc>,
) -> Fields {
    vec![
        ("resource_id", SqlValue::Int(resource_id)),
        ("skill_id", SqlValue::opt_int(skill_id)),
        ("content_type", content.content_type.as_str().into()),
        ("content_data", text_or(&content.content_data, "")),
        ("ai_model_used", text_or(&content.ai_model_used, "")),
        (
            "ai_generated_date",
            content.ai_generated_date.unwrap_or(now).into(),
        ),
        (
            "admin_approved",
            SqlValue::Bool(content.admin_approved.unwrap_or(false)),
        ),
        (
            "admin_modified",
            SqlValue::Bool(content.admin_modified.unwrap_or(false)),
        ),
        (
            "quality_score",
            SqlValue::Float(content.quality_score.unwrap_or(QUALITY_SCORE)),
        ),
        (
            "usage_count",
            SqlValue::Int(content.usage_count.unwrap_or(USAGE_COUNT)),
        ),
        ("feedback_rating", SqlValue::opt_float(content.feedback_rating)),
        ("created_at", content.created_at.unwrap_or(now).into()),
    ]
}

/// Fields for a quiz attempt with a translated resource id.
pub fn attempt_fields(attempt: &QuizAttempt, resource_id: i64, now: DateTime<Utc>) -> Fields {
    vec![
        ("resource_id", SqlValue::Int(resource_id)),
        ("answers", text_or(&attempt.answers, "")),
        ("score_percentage", SqlValue::opt_float(attempt.score_percentage)),
        ("created_at", attempt.created_at.unwrap_or(now).into()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(fields: &'a Fields, column: &str) -> &'a SqlValue {
        &fields.iter().find(|(c, _)| *c == column).unwrap().1
    }

    #[test]
    fn test_resource_defaults() {
        let now = Utc::now();
        let resource = Resource {
            id: Some(7),
            title: "Intro".into(),
            url: "https://example.com".into(),
            ..Default::default()
        };
        let fields = resource_fields(&resource, now).unwrap();
        assert_eq!(value(&fields, "cost_type"), &SqlValue::Text("unknown".into()));
        assert_eq!(value(&fields, "difficulty_level"), &SqlValue::Text("unknown".into()));
        assert_eq!(value(&fields, "quality_score"), &SqlValue::Float(0.0));
        assert_eq!(value(&fields, "prerequisites"), &SqlValue::Text("[]".into()));
        assert_eq!(value(&fields, "sequence_order"), &SqlValue::Int(0));
        assert_eq!(value(&fields, "created_at"), &SqlValue::Timestamp(now));
        assert!(value(&fields, "ai_analysis_date").is_null());
    }

    #[test]
    fn test_skill_defaults() {
        let skill = Skill {
            name: "Prompt Engineering".into(),
            ..Default::default()
        };
        let fields = skill_fields(&skill, Utc::now()).unwrap();
        assert_eq!(value(&fields, "demand_trend"), &SqlValue::Text("stable".into()));
        assert_eq!(value(&fields, "status"), &SqlValue::Text("active".into()));
        assert_eq!(value(&fields, "related_skills"), &SqlValue::Text("[]".into()));
        assert_eq!(value(&fields, "job_market_data"), &SqlValue::Text("{}".into()));
        assert_eq!(value(&fields, "urgency_score"), &SqlValue::Float(0.0));
    }

    #[test]
    fn test_present_labels_are_written_unchanged() {
        let skill = Skill {
            name: "Vibe Coding".into(),
            demand_trend: DemandTrend::parse("emerging"),
            status: SkillStatus::parse("in_progress"),
            ..Default::default()
        };
        let fields = skill_fields(&skill, Utc::now()).unwrap();
        assert_eq!(value(&fields, "demand_trend"), &SqlValue::Text("emerging".into()));
        assert_eq!(value(&fields, "status"), &SqlValue::Text("in_progress".into()));
    }

    #[test]
    fn test_missing_identity_fields() {
        let err = skill_fields(&Skill::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, MigrateError::RequiredFieldMissing { ref field, .. } if field == "skill_name"));

        let resource = Resource {
            title: "No URL".into(),
            ..Default::default()
        };
        let err = resource_fields(&resource, Utc::now()).unwrap_err();
        assert!(matches!(err, MigrateError::RequiredFieldMissing { ref field, .. } if field == "url"));
    }

    #[test]
    fn test_link_defaults() {
        let fields = link_fields(&SkillResourceLink::default(), 1, 2, Utc::now());
        assert_eq!(value(&fields, "relevance_score"), &SqlValue::Float(1.0));
        assert_eq!(
            value(&fields, "resource_type_for_skill"),
            &SqlValue::Text("practical".into())
        );
    }
}
