//! Readiness Prober: sequential HTTP checks against a deployed service.
//!
//! Checks run in order with a per-request timeout and no retry. JSON bodies
//! from successful shape checks are kept for the rest of the run; the quiz
//! check takes its resource id from the recorded `/api/resources` body
//! instead of fetching it again. When that body was never recorded the quiz
//! check is reported as blocked and no grading request is sent.

pub mod types;

pub use types::{Check, CheckKind, CheckResult, Outcome, ProbeReport};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{info, warn, Instrument};

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::orchestrator::RunContext;

/// Resource listing the quiz check depends on.
pub const RESOURCES_PATH: &str = "/api/resources";

/// The release checklist: API shape checks, configured pages, quiz grading.
pub fn default_checks(config: &ProbeConfig) -> Vec<Check> {
    let mut checks = vec![
        Check::json(
            "Database Stats",
            "/api/database/stats",
            &["total_resources", "by_category"],
        ),
        Check::json("Resources API", RESOURCES_PATH, &["resources", "total_count"]),
        Check::json("Skills API", "/api/skills/emerging", &[]),
    ];
    checks.extend(
        config
            .pages
            .iter()
            .map(|page| Check::endpoint(format!("Page {}", page), page.clone())),
    );
    checks.push(Check::quiz());
    checks
}

/// Runs checks against one base URL.
pub struct Prober {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    quiz_timeout: Duration,
    sample_answers: Vec<String>,
    checks: Vec<Check>,
}

impl Prober {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            quiz_timeout: Duration::from_secs(config.quiz_timeout_secs),
            sample_answers: config.sample_answers.clone(),
            checks: default_checks(config),
        })
    }

    /// Replace the check list.
    pub fn with_checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run every check in order, calling `on_result` after each one.
    pub async fn run<F>(&self, ctx: &RunContext, on_result: F) -> ProbeReport
    where
        F: FnMut(&CheckResult),
    {
        self.run_checks(on_result)
            .instrument(ctx.span("probe"))
            .await
    }

    async fn run_checks<F>(&self, mut on_result: F) -> ProbeReport
    where
        F: FnMut(&CheckResult),
    {
        info!("Probing {} ({} checks)", self.base_url, self.checks.len());

        let mut bodies: HashMap<String, Value> = HashMap::new();
        let mut report = ProbeReport {
            base_url: self.base_url.clone(),
            results: Vec::with_capacity(self.checks.len()),
        };

        for check in &self.checks {
            let started = Instant::now();
            let outcome = match &check.kind {
                CheckKind::JsonShape {
                    path,
                    required_keys,
                } => self.json_shape(path, required_keys, &mut bodies).await,
                CheckKind::Endpoint { path } => self.endpoint(path).await,
                CheckKind::QuizGrade => self.quiz_grade(&bodies).await,
            };

            let result = CheckResult {
                name: check.name.clone(),
                outcome,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };

            match result.outcome {
                Outcome::Passed => info!("{}", result.verdict_line()),
                _ => warn!("{}", result.verdict_line()),
            }
            on_result(&result);
            report.results.push(result);
        }

        info!(
            "Probe finished: {} passed, {} failed, {} blocked",
            report.passed(),
            report.failed(),
            report.blocked()
        );
        report
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn json_shape(
        &self,
        path: &str,
        required_keys: &[String],
        bodies: &mut HashMap<String, Value>,
    ) -> Outcome {
        let response = match self.client.get(self.url(path)).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Failed(describe(&e, self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            return Outcome::Failed(format!("status {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(_) => return Outcome::Failed("invalid JSON".to_string()),
        };

        let missing = required_keys
            .iter()
            .find(|key| body.get(key.as_str()).is_none())
            .cloned();
        bodies.insert(path.to_string(), body);

        match missing {
            Some(key) => Outcome::Failed(format!("missing key: {}", key)),
            None => Outcome::Passed,
        }
    }

    async fn endpoint(&self, path: &str) -> Outcome {
        match self.client.get(self.url(path)).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => Outcome::Passed,
            Ok(response) => Outcome::Failed(format!("status {}", response.status().as_u16())),
            Err(e) => Outcome::Failed(describe(&e, self.timeout)),
        }
    }

    async fn quiz_grade(&self, bodies: &HashMap<String, Value>) -> Outcome {
        let Some(listing) = bodies.get(RESOURCES_PATH) else {
            return Outcome::DependencyMissing(format!("no {} response recorded", RESOURCES_PATH));
        };

        let Some(first) = listing
            .get("resources")
            .and_then(Value::as_array)
            .and_then(|resources| resources.first())
        else {
            return Outcome::Failed("no resources found".to_string());
        };

        let resource_id = match first.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Outcome::Failed("first resource has no id".to_string()),
        };

        let url = self.url(&format!("/api/quiz/{}/grade", resource_id));
        let body = json!({ "answers": self.sample_answers });

        match self
            .client
            .post(url)
            .json(&body)
            .timeout(self.quiz_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().as_u16() == 200 => Outcome::Passed,
            Ok(response) => Outcome::Failed(format!("status {}", response.status().as_u16())),
            Err(e) => Outcome::Failed(describe(&e, self.quiz_timeout)),
        }
    }
}

fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("timed out after {}s", timeout.as_secs())
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
