//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::link::{rules, LinkRule, TitleHash};

/// Root configuration structure. Every section has defaults, so an empty
/// file (or no file) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local SQLite store.
    #[serde(default)]
    pub source: SourceConfig,

    /// Hosted PostgreSQL store.
    #[serde(default)]
    pub target: TargetConfig,

    /// Interchange document.
    #[serde(default)]
    pub export: ExportConfig,

    /// Relevance Linker.
    #[serde(default)]
    pub linker: LinkerConfig,

    /// Readiness Prober.
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Source store (SQLite) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database file path (default: "data/aih_edu.db").
    #[serde(default = "default_source_path")]
    pub path: PathBuf,

    /// Label recorded in the migration envelope.
    #[serde(default = "default_source_label")]
    pub label: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            label: default_source_label(),
        }
    }
}

/// Target store (PostgreSQL) configuration.
///
/// The connection string itself never lives in the file; it is read from the
/// environment variable named by `url_env`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Environment variable holding the connection string (default: "DATABASE_URL").
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// SSL mode: disable, require, verify-ca or verify-full (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Label recorded in the migration envelope.
    #[serde(default = "default_target_label")]
    pub label: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            ssl_mode: default_require(),
            label: default_target_label(),
        }
    }
}

/// Interchange document configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Document path (default: "migration_export.json").
    #[serde(default = "default_export_path")]
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
        }
    }
}

/// Relevance Linker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Hash used for the cybersecurity fallback pick (default: fnv1a32).
    #[serde(default)]
    pub hash: TitleHash,

    /// Skill-name fragment picked when nothing else matches.
    #[serde(default = "default_fallback_skill")]
    pub fallback_skill: String,

    /// Category rules, evaluated in order.
    #[serde(default = "rules::default_rules")]
    pub rules: Vec<LinkRule>,

    /// Category terms routing a resource to the cybersecurity subset.
    #[serde(default = "rules::default_broad_terms")]
    pub broad_terms: Vec<String>,

    /// Skill-name terms defining the cybersecurity subset.
    #[serde(default = "rules::default_cyber_skill_terms")]
    pub cyber_skill_terms: Vec<String>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            hash: TitleHash::default(),
            fallback_skill: default_fallback_skill(),
            rules: rules::default_rules(),
            broad_terms: rules::default_broad_terms(),
            cyber_skill_terms: rules::default_cyber_skill_terms(),
        }
    }
}

/// Readiness Prober configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Service base URL (default: "http://127.0.0.1:9000").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-check timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the quiz-grading check in seconds (default: 15).
    #[serde(default = "default_quiz_timeout_secs")]
    pub quiz_timeout_secs: u64,

    /// Pages that must answer 200.
    #[serde(default = "default_pages")]
    pub pages: Vec<String>,

    /// Answers submitted by the quiz-grading check.
    #[serde(default = "default_sample_answers")]
    pub sample_answers: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            quiz_timeout_secs: default_quiz_timeout_secs(),
            pages: default_pages(),
            sample_answers: default_sample_answers(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("data/aih_edu.db")
}

fn default_source_label() -> String {
    "local_database".to_string()
}

fn default_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_require() -> String {
    "require".to_string()
}

fn default_target_label() -> String {
    "production".to_string()
}

fn default_export_path() -> PathBuf {
    PathBuf::from("migration_export.json")
}

fn default_fallback_skill() -> String {
    rules::DEFAULT_FALLBACK_SKILL.to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_quiz_timeout_secs() -> u64 {
    15
}

fn default_pages() -> Vec<String> {
    [
        "/",
        "/skills",
        "/skill/ai-enhanced-siem",
        "/skill/vibe-coding",
        "/admin",
        "/database",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sample_answers() -> Vec<String> {
    vec![
        "Sample answer for testing".to_string(),
        "Another test answer".to_string(),
    ]
}
