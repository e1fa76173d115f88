//! Check and report types for the Readiness Prober.

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// What a check does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    /// GET `path`, expect 200 and a JSON object holding every required key.
    JsonShape {
        path: String,
        required_keys: Vec<String>,
    },
    /// GET `path`, expect 200.
    Endpoint { path: String },
    /// POST sample answers to the grading endpoint of the first listed resource.
    QuizGrade,
}

/// A named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    #[serde(flatten)]
    pub kind: CheckKind,
}

impl Check {
    pub fn json(name: &str, path: &str, required_keys: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: CheckKind::JsonShape {
                path: path.to_string(),
                required_keys: required_keys.iter().map(|k| k.to_string()).collect(),
            },
        }
    }

    pub fn endpoint(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CheckKind::Endpoint { path: path.into() },
        }
    }

    pub fn quiz() -> Self {
        Self {
            name: "Quiz Grading".to_string(),
            kind: CheckKind::QuizGrade,
        }
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(String),
    /// The check could not run because an earlier response it needs is missing.
    DependencyMissing(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed(_) => "FAILED",
            Outcome::DependencyMissing(_) => "BLOCKED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed_ms: u64,
}

impl CheckResult {
    /// One verdict line, e.g. `Resources API ... FAILED (status 500)`.
    pub fn verdict_line(&self) -> String {
        match &self.outcome {
            Outcome::Passed => format!("{} ... {}", self.name, self.outcome.label()),
            Outcome::Failed(detail) | Outcome::DependencyMissing(detail) => {
                format!("{} ... {} ({})", self.name, self.outcome.label(), detail)
            }
        }
    }
}

/// All results of one probe run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub base_url: String,
    pub results: Vec<CheckResult>,
}

impl ProbeReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn blocked(&self) -> usize {
        self.count(|o| matches!(o, Outcome::DependencyMissing(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Ready only when every check passed.
    pub fn is_ready(&self) -> bool {
        self.failed() == 0 && self.blocked() == 0
    }

    /// `Ok` when ready, [`MigrateError::ProbeFailed`] otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.is_ready() {
            Ok(self)
        } else {
            Err(MigrateError::ProbeFailed {
                failed: self.failed(),
                blocked: self.blocked(),
                total: self.results.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: Outcome) -> CheckResult {
        CheckResult {
            name: name.into(),
            outcome,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_blocked_check_is_not_ready() {
        let report = ProbeReport {
            base_url: "http://localhost".into(),
            results: vec![
                result("Skills API", Outcome::Passed),
                result("Quiz Grading", Outcome::DependencyMissing("no resources".into())),
            ],
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.blocked(), 1);
        assert!(!report.is_ready());
        assert!(matches!(
            report.into_result(),
            Err(MigrateError::ProbeFailed { failed: 0, blocked: 1, total: 2 })
        ));
    }

    #[test]
    fn test_verdict_line() {
        let line = result("Resources API", Outcome::Failed("status 500".into())).verdict_line();
        assert_eq!(line, "Resources API ... FAILED (status 500)");
        assert_eq!(result("Admin Panel", Outcome::Passed).verdict_line(), "Admin Panel ... PASSED");
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(Outcome::Failed("timeout".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "detail": "timeout"}));
    }
}
