//! End-to-end tests of extract → document → clear/load/verify and the linker,
//! run against in-memory SQLite stores.

use edu_migrate::core::model::{LearningContent, QuizAttempt, Resource, Skill, SkillResourceLink};
use edu_migrate::core::schema;
use edu_migrate::interchange::{self, Collections, ExportMetadata};
use edu_migrate::orchestrator::{export_to, import_into};
use edu_migrate::{extract, link, load, verify};
use edu_migrate::{LinkerConfig, MigrateError, RunContext, SqlValue, SqliteStore, Store};

/// Route library logs to the test harness output.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

async fn seeded_source() -> SqliteStore {
    init_logging();
    let store = SqliteStore::in_memory("local_database").await.unwrap();
    schema::ensure_schema(&store).await.unwrap();

    let statements = [
        "INSERT INTO emerging_skills (id, skill_name, category, keywords, demand_trend) \
         VALUES (1, 'AI-Enhanced SIEM', 'cybersecurity', '[\"siem\", \"soc\"]', 'rising')",
        "INSERT INTO emerging_skills (id, skill_name) VALUES (2, 'Quantum-Safe Cryptography')",
        "INSERT INTO educational_resources (id, title, url, skill_category) \
         VALUES (10, 'Intro to PQC', 'https://example.com/pqc', 'quantum-cryptography')",
        "INSERT INTO educational_resources (id, title, url, skill_category, cost_type) \
         VALUES (11, 'Basic Networking', 'https://example.com/net', 'unmatched-category', 'free')",
        "INSERT INTO skill_resources (skill_id, resource_id, relevance_score) VALUES (2, 10, 0.95)",
        "INSERT INTO learning_content (resource_id, skill_id, content_type, content_data) \
         VALUES (10, 2, 'questions', '[{\"question\": \"What is PQC?\"}]')",
        "INSERT INTO learning_content (resource_id, content_type, content_data) \
         VALUES (11, 'summary', 'Layers one to seven')",
        "INSERT INTO quiz_attempts (resource_id, answers, score_percentage) \
         VALUES (10, '[\"a\"]', 50.0)",
    ];
    for sql in statements {
        store.execute(sql, &[]).await.unwrap();
    }
    store
}

async fn count(store: &SqliteStore, table: &str) -> i64 {
    let rows = store
        .query(&format!("SELECT COUNT(*) AS n FROM {}", table), &[])
        .await
        .unwrap();
    rows[0].int("n").unwrap()
}

#[tokio::test]
async fn test_export_import_preserves_counts_and_links() {
    let ctx = RunContext::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migration_export.json");

    let source = seeded_source().await;
    let (envelope, warnings) = export_to(&source, &path, &ctx).await.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(envelope.source, "local_database");
    assert_eq!(envelope.total_skills, 2);
    assert_eq!(envelope.total_resources, 2);
    assert_eq!(envelope.total_mappings, 1);
    assert_eq!(envelope.total_questions, 1);
    assert_eq!(envelope.total_other_content, 1);
    assert_eq!(envelope.total_quiz_attempts, 1);

    let (collections, read_envelope) = interchange::read_document(&path).unwrap();
    assert_eq!(read_envelope.total_skills, 2);
    assert_eq!(collections.skills[0].keywords, vec!["siem", "soc"]);

    let target = SqliteStore::in_memory("production").await.unwrap();
    let outcome = import_into(&target, &collections, &envelope, &ctx).await.unwrap();

    assert_eq!(outcome.load.skills.inserted, 2);
    assert_eq!(outcome.load.resources.inserted, 2);
    assert_eq!(outcome.load.skill_resources.inserted, 1);
    assert_eq!(outcome.load.questions.inserted, 1);
    assert_eq!(outcome.load.learning_content_other.inserted, 1);
    assert_eq!(outcome.load.quiz_attempts.inserted, 1);
    assert_eq!(outcome.load.total_failed(), 0);
    assert!(outcome.verify.is_consistent());

    let rows = target
        .query(
            "SELECT s.skill_name, r.title FROM skill_resources sr \
             JOIN emerging_skills s ON s.id = sr.skill_id \
             JOIN educational_resources r ON r.id = sr.resource_id",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("skill_name").as_deref(), Some("Quantum-Safe Cryptography"));
    assert_eq!(rows[0].text("title").as_deref(), Some("Intro to PQC"));

    let rows = target
        .query(
            "SELECT cost_type, difficulty_level, prerequisites FROM educational_resources \
             ORDER BY id",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].text("cost_type").as_deref(), Some("unknown"));
    assert_eq!(rows[0].text("difficulty_level").as_deref(), Some("unknown"));
    assert_eq!(rows[0].text("prerequisites").as_deref(), Some("[]"));
    assert_eq!(rows[1].text("cost_type").as_deref(), Some("free"));

    let coverage = &outcome.verify.coverage;
    assert_eq!(coverage.len(), 2);
    assert_eq!(coverage[0].skill_name, "Quantum-Safe Cryptography");
    assert_eq!(coverage[0].resource_count, 1);
    assert_eq!(coverage[1].resource_count, 0);
}

#[tokio::test]
async fn test_source_labels_survive_document_and_load() {
    let ctx = RunContext::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migration_export.json");

    let source = seeded_source().await;
    let updates = [
        "UPDATE emerging_skills SET demand_trend = 'emerging', status = 'in_progress' WHERE id = 2",
        "UPDATE skill_resources SET resource_type_for_skill = 'capstone' WHERE skill_id = 2",
    ];
    for sql in updates {
        source.execute(sql, &[]).await.unwrap();
    }

    let (envelope, _) = export_to(&source, &path, &ctx).await.unwrap();
    let (collections, _) = interchange::read_document(&path).unwrap();
    let target = SqliteStore::in_memory("production").await.unwrap();
    import_into(&target, &collections, &envelope, &ctx).await.unwrap();

    let rows = target
        .query(
            "SELECT demand_trend, status FROM emerging_skills WHERE skill_name = ?1",
            &[SqlValue::from("Quantum-Safe Cryptography")],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].text("demand_trend").as_deref(), Some("emerging"));
    assert_eq!(rows[0].text("status").as_deref(), Some("in_progress"));

    let rows = target
        .query("SELECT resource_type_for_skill FROM skill_resources", &[])
        .await
        .unwrap();
    assert_eq!(rows[0].text("resource_type_for_skill").as_deref(), Some("capstone"));

    // Absent labels still take their defaults.
    let rows = target
        .query(
            "SELECT demand_trend, status FROM emerging_skills WHERE skill_name = ?1",
            &[SqlValue::from("AI-Enhanced SIEM")],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].text("demand_trend").as_deref(), Some("rising"));
    assert_eq!(rows[0].text("status").as_deref(), Some("active"));
}

#[tokio::test]
async fn test_import_twice_yields_same_counts() {
    let ctx = RunContext::new();
    let source = seeded_source().await;
    let extraction = extract::extract(&source, &ctx).await.unwrap();
    let envelope = ExportMetadata::describe(&extraction.collections, source.label());

    let target = SqliteStore::in_memory("production").await.unwrap();
    import_into(&target, &extraction.collections, &envelope, &ctx)
        .await
        .unwrap();
    let mut first = Vec::new();
    for def in schema::CORE_TABLES {
        first.push(count(&target, def.name).await);
    }

    let outcome = import_into(&target, &extraction.collections, &envelope, &ctx)
        .await
        .unwrap();
    let mut second = Vec::new();
    for def in schema::CORE_TABLES {
        second.push(count(&target, def.name).await);
    }

    assert_eq!(first, second);
    assert_eq!(first, vec![2, 2, 1, 2, 1]);
    assert!(outcome.verify.is_consistent());
}

#[tokio::test]
async fn test_load_skips_bad_records_and_translates_references() {
    let ctx = RunContext::new();
    let target = SqliteStore::in_memory("production").await.unwrap();

    let collections = Collections {
        skills: vec![
            Skill {
                id: Some(1),
                name: "Zero Trust Architecture".into(),
                ..Default::default()
            },
            Skill {
                id: Some(2),
                name: "Zero Trust Architecture".into(),
                ..Default::default()
            },
        ],
        resources: vec![
            Resource {
                id: Some(10),
                title: "Zero Trust in Practice".into(),
                url: "https://example.com/zt".into(),
                ..Default::default()
            },
            Resource {
                id: Some(11),
                title: "No URL".into(),
                ..Default::default()
            },
        ],
        skill_resources: vec![
            SkillResourceLink {
                skill_id: Some(2),
                resource_id: Some(10),
                ..Default::default()
            },
            SkillResourceLink {
                skill_id: Some(1),
                resource_id: Some(10),
                ..Default::default()
            },
            SkillResourceLink {
                skill_id: Some(99),
                resource_id: Some(10),
                ..Default::default()
            },
        ],
        questions: vec![
            LearningContent {
                id: Some(1),
                resource_id: Some(10),
                skill_id: Some(99),
                content_data: Some("[]".into()),
                ..Default::default()
            },
            LearningContent {
                id: Some(2),
                resource_id: Some(10),
                content_data: Some("[]".into()),
                ..Default::default()
            },
        ],
        learning_content_other: vec![],
        quiz_attempts: vec![QuizAttempt {
            resource_id: Some(77),
            ..Default::default()
        }],
    };

    let report = load::load(&target, &collections, &ctx).await.unwrap();

    assert_eq!(report.skills.inserted, 1);
    assert_eq!(report.skills.duplicates, 1);
    assert_eq!(report.resources.inserted, 1);
    assert_eq!(report.resources.skipped, 1);
    assert_eq!(report.skill_resources.inserted, 1);
    assert_eq!(report.skill_resources.duplicates, 1);
    assert_eq!(report.skill_resources.skipped, 1);
    assert_eq!(report.questions.inserted, 1);
    assert_eq!(report.questions.duplicates, 1);
    assert_eq!(report.quiz_attempts.skipped, 1);
    assert_eq!(report.total_failed(), 0);

    let rows = target
        .query("SELECT skill_id, content_type FROM learning_content", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("skill_id").unwrap().is_null());
    assert_eq!(rows[0].text("content_type").as_deref(), Some("questions"));
}

#[tokio::test]
async fn test_clear_rejects_target_missing_columns() {
    let ctx = RunContext::new();
    let target = SqliteStore::in_memory("production").await.unwrap();
    target
        .execute(
            "CREATE TABLE emerging_skills (id INTEGER PRIMARY KEY, skill_name TEXT)",
            &[],
        )
        .await
        .unwrap();
    target
        .execute(
            "INSERT INTO emerging_skills (skill_name) VALUES (?1)",
            &[SqlValue::from("Vibe Coding")],
        )
        .await
        .unwrap();

    let err = load::clear(&target, &ctx).await.unwrap_err();
    assert!(matches!(err, MigrateError::SchemaMismatch { ref table, .. } if table == "emerging_skills"));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(count(&target, "emerging_skills").await, 1);
}

#[tokio::test]
async fn test_clear_skips_absent_tables() {
    let ctx = RunContext::new();
    let target = SqliteStore::in_memory("production").await.unwrap();
    target
        .execute(
            "CREATE TABLE learning_sessions (id INTEGER PRIMARY KEY, session_id TEXT)",
            &[],
        )
        .await
        .unwrap();

    let cleared = load::clear(&target, &ctx).await.unwrap();
    assert_eq!(cleared, vec!["learning_sessions"]);
}

#[tokio::test]
async fn test_clear_empties_auxiliary_tables_holding_foreign_keys() {
    let ctx = RunContext::new();
    let target = SqliteStore::in_memory("production").await.unwrap();
    let ddl = [
        "CREATE TABLE skill_learning_paths (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, \
            skill_id INTEGER NOT NULL, \
            path_name TEXT NOT NULL, \
            resource_sequence TEXT NOT NULL, \
            created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP, \
            FOREIGN KEY (skill_id) REFERENCES emerging_skills (id))",
        "CREATE TABLE learning_sessions (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, \
            session_id TEXT NOT NULL, \
            skill_id INTEGER REFERENCES emerging_skills(id), \
            learning_path_id INTEGER REFERENCES skill_learning_paths(id), \
            current_resource_id INTEGER REFERENCES educational_resources(id), \
            progress_percentage REAL DEFAULT 0.0)",
        "CREATE TABLE content_analysis_queue (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, \
            resource_id INTEGER REFERENCES educational_resources(id), \
            analysis_type TEXT DEFAULT 'full', \
            status TEXT DEFAULT 'pending')",
    ];
    for sql in ddl {
        target.execute(sql, &[]).await.unwrap();
    }
    schema::ensure_schema(&target).await.unwrap();

    let rows = [
        "INSERT INTO emerging_skills (id, skill_name) VALUES (1, 'Vibe Coding')",
        "INSERT INTO educational_resources (id, title, url) \
         VALUES (10, 'Prompting Basics', 'https://example.com/prompting')",
        "INSERT INTO skill_learning_paths (id, skill_id, path_name, resource_sequence) \
         VALUES (1, 1, 'Vibe Coding Path', '[10]')",
        "INSERT INTO learning_sessions (session_id, skill_id, learning_path_id, current_resource_id) \
         VALUES ('s-1', 1, 1, 10)",
        "INSERT INTO content_analysis_queue (resource_id) VALUES (10)",
    ];
    for sql in rows {
        target.execute(sql, &[]).await.unwrap();
    }

    // Foreign keys are enforced: a parent row cannot go while a session points at it.
    assert!(target
        .execute("DELETE FROM skill_learning_paths", &[])
        .await
        .is_err());

    let cleared = load::clear(&target, &ctx).await.unwrap();
    assert_eq!(
        cleared,
        schema::CLEAR_ORDER.iter().map(|t| t.name).collect::<Vec<_>>()
    );
    for table in cleared {
        assert_eq!(count(&target, table).await, 0, "{} not cleared", table);
    }
}

#[tokio::test]
async fn test_extract_degrades_on_missing_tables() {
    let ctx = RunContext::new();
    let source = SqliteStore::in_memory("local_database").await.unwrap();
    source
        .execute(
            "CREATE TABLE emerging_skills (id INTEGER PRIMARY KEY, skill_name TEXT)",
            &[],
        )
        .await
        .unwrap();
    source
        .execute("INSERT INTO emerging_skills (skill_name) VALUES ('Vibe Coding')", &[])
        .await
        .unwrap();

    let extraction = extract::extract(&source, &ctx).await.unwrap();
    assert_eq!(extraction.collections.skills.len(), 1);
    assert!(extraction.collections.resources.is_empty());
    assert_eq!(extraction.warnings.len(), 4);
}

#[tokio::test]
async fn test_linker_is_idempotent() {
    let ctx = RunContext::new();
    let store = seeded_source().await;
    let config = LinkerConfig::default();

    let first = link::run(&store, &config, &ctx).await.unwrap();
    assert_eq!(first.inserted, 1);
    assert_eq!(first.by_fallback, 1);
    assert_eq!(first.already_linked, 1);

    let second = link::run(&store, &config, &ctx).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_linked, 2);
    assert_eq!(count(&store, "skill_resources").await, 2);

    let rows = store
        .query(
            "SELECT skill_id, relevance_score, resource_type_for_skill, auto_discovered \
             FROM skill_resources WHERE resource_id = 11",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].int("skill_id"), Some(1));
    assert_eq!(rows[0].float("relevance_score"), Some(0.7));
    assert_eq!(rows[0].text("resource_type_for_skill").as_deref(), Some("foundation"));
    assert_eq!(rows[0].bool("auto_discovered"), Some(true));

    assert!(second.coverage.iter().all(|c| c.resource_count == 1));
}

#[tokio::test]
async fn test_verify_reports_mismatch_without_failing() {
    let ctx = RunContext::new();
    let store = seeded_source().await;
    let extraction = extract::extract(&store, &ctx).await.unwrap();
    let mut envelope = ExportMetadata::describe(&extraction.collections, store.label());

    let report = verify::verify(&store, &envelope, &ctx).await.unwrap();
    assert!(report.is_consistent());

    envelope.total_skills = 5;
    let report = verify::verify(&store, &envelope, &ctx).await.unwrap();
    let mismatches: Vec<_> = report.mismatches().collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].collection, "skills");
    assert_eq!(mismatches[0].expected, 5);
    assert_eq!(mismatches[0].actual, 2);
}
