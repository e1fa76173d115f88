//! Readiness Prober tests against a mock HTTP service.

use std::time::Duration;

use edu_migrate::probe::{Check, Outcome, Prober};
use edu_migrate::{MigrateError, ProbeConfig, RunContext};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, pages: &[&str]) -> ProbeConfig {
    ProbeConfig {
        base_url: server.uri(),
        pages: pages.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

async fn mount_get(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_api(server: &MockServer) {
    mount_get(
        server,
        "/api/database/stats",
        ResponseTemplate::new(200).set_body_json(json!({
            "total_resources": 2,
            "by_category": {"cybersecurity": 2}
        })),
    )
    .await;
    mount_get(
        server,
        "/api/skills/emerging",
        ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "skill_name": "Vibe Coding"}])),
    )
    .await;
}

#[tokio::test]
async fn test_resources_failure_blocks_quiz_check() {
    let server = MockServer::start().await;
    mount_api(&server).await;
    mount_get(&server, "/api/resources", ResponseTemplate::new(500)).await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/quiz/.*/grade$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let prober = Prober::new(&config(&server, &[])).unwrap();
    let report = prober.run(&RunContext::new(), |_| {}).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.blocked(), 1);
    assert!(!report.is_ready());

    let resources = report
        .results
        .iter()
        .find(|r| r.name == "Resources API")
        .unwrap();
    assert_eq!(resources.outcome, Outcome::Failed("status 500".into()));

    let quiz = report.results.last().unwrap();
    assert_eq!(quiz.name, "Quiz Grading");
    assert!(matches!(quiz.outcome, Outcome::DependencyMissing(_)));

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, MigrateError::ProbeFailed { failed: 1, blocked: 1, .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_all_checks_pass() {
    let server = MockServer::start().await;
    mount_api(&server).await;
    mount_get(
        &server,
        "/api/resources",
        ResponseTemplate::new(200).set_body_json(json!({
            "resources": [{"id": 7, "title": "Intro to PQC"}],
            "total_count": 1
        })),
    )
    .await;
    mount_get(&server, "/", ResponseTemplate::new(200)).await;
    mount_get(&server, "/admin", ResponseTemplate::new(200)).await;
    Mock::given(method("POST"))
        .and(path("/api/quiz/7/grade"))
        .and(body_json(json!({
            "answers": ["Sample answer for testing", "Another test answer"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 50})))
        .expect(1)
        .mount(&server)
        .await;

    let prober = Prober::new(&config(&server, &["/", "/admin"])).unwrap();
    let mut seen = Vec::new();
    let report = prober
        .run(&RunContext::new(), |result| seen.push(result.name.clone()))
        .await;

    assert_eq!(
        seen,
        vec![
            "Database Stats",
            "Resources API",
            "Skills API",
            "Page /",
            "Page /admin",
            "Quiz Grading"
        ]
    );
    assert_eq!(report.passed(), 6);
    assert!(report.is_ready());
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_missing_key_and_missing_page_fail() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/database/stats",
        ResponseTemplate::new(200).set_body_json(json!({"total_resources": 2})),
    )
    .await;

    let prober = Prober::new(&config(&server, &[]))
        .unwrap()
        .with_checks(vec![
            Check::json(
                "Database Stats",
                "/api/database/stats",
                &["total_resources", "by_category"],
            ),
            Check::endpoint("Database Browser", "/database"),
        ]);
    let report = prober.run(&RunContext::new(), |_| {}).await;

    assert_eq!(
        report.results[0].outcome,
        Outcome::Failed("missing key: by_category".into())
    );
    assert_eq!(report.results[1].outcome, Outcome::Failed("status 404".into()));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;

    let config = ProbeConfig {
        timeout_secs: 1,
        ..config(&server, &[])
    };
    let prober = Prober::new(&config)
        .unwrap()
        .with_checks(vec![Check::endpoint("Slow Page", "/slow")]);
    let report = prober.run(&RunContext::new(), |_| {}).await;

    assert_eq!(
        report.results[0].outcome,
        Outcome::Failed("timed out after 1s".into())
    );
}
