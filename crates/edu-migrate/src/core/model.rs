//! Entity types moved between stores.
//!
//! Field names follow the store columns so that a record serialized into the
//! interchange document reads the same as the row it came from. Identity
//! fields that the target requires (`skill_name`, `title`, `url`) default to an
//! empty string when absent so the Loader can report them as missing instead
//! of the document failing to parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::Row;

/// Declares a label enum whose known values parse case-insensitively and
/// whose unknown values are kept verbatim in `Other`.
macro_rules! open_label {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(s) => s.as_str(),
                }
            }

            /// `None` for a blank label.
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                Some(match s.to_lowercase().as_str() {
                    $($label => $name::$variant,)+
                    _ => $name::Other(s.to_string()),
                })
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::parse(&s).unwrap_or($name::Other(s))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(s) => s,
                    known => known.as_str().to_string(),
                }
            }
        }
    };
}

open_label! {
    /// Market demand direction recorded for a skill.
    DemandTrend {
        Rising => "rising",
        Stable => "stable",
        Declining => "declining",
        Critical => "critical",
        Emerging => "emerging",
    }
}

open_label! {
    /// Lifecycle status of a skill.
    SkillStatus {
        Pending => "pending",
        Active => "active",
        Archived => "archived",
    }
}

open_label! {
    /// How a resource serves a skill (`resource_type_for_skill`).
    ResourceRole {
        Foundation => "foundation",
        Practical => "practical",
        Advanced => "advanced",
        Certification => "certification",
    }
}

/// Kind of generated learning content. Only `questions` is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentKind {
    Questions,
    Other(String),
}

impl ContentKind {
    pub const QUESTIONS: &'static str = "questions";

    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Questions => Self::QUESTIONS,
            ContentKind::Other(s) => s.as_str(),
        }
    }

    pub fn is_questions(&self) -> bool {
        matches!(self, ContentKind::Questions)
    }
}

impl Default for ContentKind {
    fn default() -> Self {
        ContentKind::Questions
    }
}

impl From<String> for ContentKind {
    fn from(s: String) -> Self {
        if s == Self::QUESTIONS {
            ContentKind::Questions
        } else {
            ContentKind::Other(s)
        }
    }
}

impl From<ContentKind> for String {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Questions => ContentKind::QUESTIONS.to_string(),
            ContentKind::Other(s) => s,
        }
    }
}

/// A named competency (`emerging_skills`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(rename = "skill_name", default)]
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub urgency_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::demand_trend")]
    pub demand_trend: Option<DemandTrend>,

    #[serde(default)]
    pub source_analysis: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub keywords: Vec<String>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub related_skills: Vec<String>,

    /// Opaque JSON text, never interpreted.
    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub job_market_data: Option<String>,

    #[serde(default, deserialize_with = "lenient::skill_status")]
    pub status: Option<SkillStatus>,

    #[serde(
        default,
        alias = "identified_date",
        alias = "created_date",
        deserialize_with = "lenient::timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        alias = "last_updated",
        deserialize_with = "lenient::timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Skill {
    /// Short label for log lines.
    pub fn label(&self) -> String {
        record_label(self.id, &self.name)
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.int("id"),
            name: row.text("skill_name").unwrap_or_default(),
            category: row.text("category"),
            urgency_score: row.float("urgency_score"),
            demand_trend: row.text("demand_trend").as_deref().and_then(DemandTrend::parse),
            source_analysis: row.text("source_analysis"),
            description: row.text("description"),
            keywords: row.text("keywords").map(|s| split_list(&s)).unwrap_or_default(),
            related_skills: row
                .text("related_skills")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            job_market_data: row.text("job_market_data"),
            status: row
                .text("status")
                .or_else(|| row.text("discovery_status"))
                .as_deref()
                .and_then(SkillStatus::parse),
            created_at: first_timestamp(row, &["created_at", "created_date", "identified_date"]),
            updated_at: first_timestamp(row, &["updated_at", "updated_date", "last_updated"]),
        }
    }
}

/// A piece of educational content (`educational_resources`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub cost_type: Option<String>,

    #[serde(default)]
    pub difficulty_level: Option<String>,

    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub estimated_duration: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub tags: Vec<String>,

    /// Free-text bucket used by the Linker.
    #[serde(default)]
    pub skill_category: Option<String>,

    #[serde(default)]
    pub quality_score: Option<f64>,

    #[serde(default)]
    pub discovery_method: Option<String>,

    #[serde(default)]
    pub ai_analysis_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub ai_analysis_details: Option<String>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub ai_analysis_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub learning_level: Option<String>,

    #[serde(default)]
    pub sequence_order: Option<i64>,

    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub prerequisites: Option<String>,

    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub learning_objectives: Option<String>,

    #[serde(
        default,
        alias = "created_date",
        deserialize_with = "lenient::timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn label(&self) -> String {
        record_label(self.id, &self.title)
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.int("id"),
            title: row.text("title").unwrap_or_default(),
            url: row.text("url").unwrap_or_default(),
            resource_type: row.text("resource_type"),
            cost_type: row.text("cost_type"),
            difficulty_level: row.text("difficulty_level"),
            estimated_duration: row.text("estimated_duration"),
            description: row.text("description"),
            author: row.text("author"),
            tags: row.text("tags").map(|s| split_list(&s)).unwrap_or_default(),
            skill_category: row.text("skill_category"),
            quality_score: row.float("quality_score"),
            discovery_method: row.text("discovery_method"),
            ai_analysis_score: row.float("ai_analysis_score"),
            ai_analysis_details: row.text("ai_analysis_details"),
            ai_analysis_date: row.timestamp("ai_analysis_date"),
            learning_level: row.text("learning_level"),
            sequence_order: row.int("sequence_order"),
            prerequisites: row.text("prerequisites"),
            learning_objectives: row.text("learning_objectives"),
            created_at: first_timestamp(row, &["created_at", "created_date"]),
        }
    }
}

/// A scored skill↔resource association (`skill_resources`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillResourceLink {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub skill_id: Option<i64>,

    #[serde(default)]
    pub resource_id: Option<i64>,

    #[serde(default)]
    pub relevance_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::resource_role")]
    pub resource_type_for_skill: Option<ResourceRole>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub auto_discovered: Option<bool>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub discovery_date: Option<DateTime<Utc>>,
}

impl SkillResourceLink {
    pub fn label(&self) -> String {
        format!(
            "skill={} resource={}",
            opt_id(self.skill_id),
            opt_id(self.resource_id)
        )
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.int("id"),
            skill_id: row.int("skill_id"),
            resource_id: row.int("resource_id"),
            relevance_score: row.float("relevance_score"),
            resource_type_for_skill: row
                .text("resource_type_for_skill")
                .as_deref()
                .and_then(ResourceRole::parse),
            auto_discovered: row.bool("auto_discovered"),
            discovery_date: row.timestamp("discovery_date"),
        }
    }
}

/// Generated learning content (`learning_content`), quizzes and others.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningContent {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub resource_id: Option<i64>,

    #[serde(default)]
    pub skill_id: Option<i64>,

    #[serde(default)]
    pub content_type: ContentKind,

    /// Serialized question list, carried as opaque text.
    #[serde(
        default,
        alias = "questions_data",
        deserialize_with = "lenient::opaque_text"
    )]
    pub content_data: Option<String>,

    #[serde(default)]
    pub ai_model_used: Option<String>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub ai_generated_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub admin_approved: Option<bool>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub admin_modified: Option<bool>,

    #[serde(default)]
    pub quality_score: Option<f64>,

    #[serde(default)]
    pub usage_count: Option<i64>,

    #[serde(default)]
    pub feedback_rating: Option<f64>,

    #[serde(
        default,
        alias = "created_date",
        deserialize_with = "lenient::timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl LearningContent {
    pub fn label(&self) -> String {
        format!(
            "id={} resource={} type={}",
            opt_id(self.id),
            opt_id(self.resource_id),
            self.content_type.as_str()
        )
    }

    /// Number of questions in `content_data`, if it parses as a quiz.
    pub fn question_count(&self) -> Option<usize> {
        question_count(self.content_data.as_deref()?)
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.int("id"),
            resource_id: row.int("resource_id"),
            skill_id: row.int("skill_id"),
            content_type: row
                .text("content_type")
                .map(ContentKind::from)
                .unwrap_or_default(),
            content_data: row.text("content_data"),
            ai_model_used: row.text("ai_model_used"),
            ai_generated_date: row.timestamp("ai_generated_date"),
            admin_approved: row.bool("admin_approved"),
            admin_modified: row.bool("admin_modified"),
            quality_score: row.float("quality_score"),
            usage_count: row.int("usage_count"),
            feedback_rating: row.float("feedback_rating"),
            created_at: row.timestamp("created_at"),
        }
    }
}

/// One graded quiz submission (`quiz_attempts`). Append-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub resource_id: Option<i64>,

    #[serde(default, deserialize_with = "lenient::opaque_text")]
    pub answers: Option<String>,

    #[serde(default)]
    pub score_percentage: Option<f64>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn label(&self) -> String {
        format!("id={} resource={}", opt_id(self.id), opt_id(self.resource_id))
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.int("id"),
            resource_id: row.int("resource_id"),
            answers: row.text("answers"),
            score_percentage: row.float("score_percentage"),
            created_at: first_timestamp(row, &["created_at", "attempt_date"]),
        }
    }
}

/// Count the questions in a serialized quiz.
///
/// Quizzes are stored either as a bare list of question objects or as an
/// object with a `questions` list.
pub fn question_count(content_data: &str) -> Option<usize> {
    match serde_json::from_str::<serde_json::Value>(content_data).ok()? {
        serde_json::Value::Array(items) => Some(items.len()),
        serde_json::Value::Object(map) => map
            .get("questions")
            .and_then(|q| q.as_array())
            .map(|q| q.len()),
        _ => None,
    }
}

/// Split a stored list column: a JSON array, or comma-separated text.
pub fn split_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            return items.into_iter().filter_map(lenient::list_item).collect();
        }
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First present timestamp among legacy column spellings.
fn first_timestamp(row: &Row, columns: &[&str]) -> Option<DateTime<Utc>> {
    columns.iter().find_map(|c| row.timestamp(c))
}

fn opt_id(id: Option<i64>) -> String {
    id.map(|i| i.to_string()).unwrap_or_else(|| "?".into())
}

fn record_label(id: Option<i64>, name: &str) -> String {
    format!("id={} ({})", opt_id(id), name)
}

/// Deserializers that accept the looser shapes older exports used.
mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{split_list, DemandTrend, ResourceRole, SkillStatus};
    use crate::core::value::parse_timestamp;

    pub(super) fn list_item(item: Value) -> Option<String> {
        match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn string_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.into_iter().filter_map(list_item).collect(),
            Some(Value::String(s)) => split_list(&s),
            Some(other) => vec![other.to_string()],
        })
    }

    pub fn opaque_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn flag<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "1" | "t" | "true" | "yes" => Some(true),
                "0" | "f" | "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => parse_timestamp(&s),
            _ => None,
        })
    }

    fn label<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn demand_trend<'de, D>(d: D) -> Result<Option<DemandTrend>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(label(d)?.as_deref().and_then(DemandTrend::parse))
    }

    pub fn skill_status<'de, D>(d: D) -> Result<Option<SkillStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(label(d)?.as_deref().and_then(SkillStatus::parse))
    }

    pub fn resource_role<'de, D>(d: D) -> Result<Option<ResourceRole>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(label(d)?.as_deref().and_then(ResourceRole::parse))
    }
}
