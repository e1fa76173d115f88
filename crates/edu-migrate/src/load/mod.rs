//! Loader: clears the target and inserts a document's collections.
//!
//! Every collection commits as one batch. Each record runs inside its own
//! savepoint, so a record the target rejects is logged and skipped without
//! losing the rest of its batch. Source ids never reach the target: the
//! target assigns fresh ids and foreign keys are translated through the id
//! maps built while loading skills and resources.

pub mod defaults;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};

use crate::core::model::{ContentKind, LearningContent};
use crate::core::schema::{self, TableDef};
use crate::core::traits::{Statement, Store};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::interchange::Collections;
use crate::orchestrator::RunContext;

use self::defaults::Fields;

/// Per-collection load counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Rows written to the target.
    pub inserted: usize,
    /// Records dropped before insert (missing field, unresolved reference).
    pub skipped: usize,
    /// Records already present in the target or earlier in the batch.
    pub duplicates: usize,
    /// Records the target rejected.
    pub failed: usize,
}

/// Outcome of one [`load`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub skills: CollectionStats,
    pub resources: CollectionStats,
    pub skill_resources: CollectionStats,
    pub questions: CollectionStats,
    pub learning_content_other: CollectionStats,
    pub quiz_attempts: CollectionStats,
}

impl LoadReport {
    /// Collections in insert order with their document key.
    pub fn collections(&self) -> [(&'static str, &CollectionStats); 6] {
        [
            ("skills", &self.skills),
            ("resources", &self.resources),
            ("skill_resources", &self.skill_resources),
            ("questions", &self.questions),
            ("learning_content_other", &self.learning_content_other),
            ("quiz_attempts", &self.quiz_attempts),
        ]
    }

    pub fn total_inserted(&self) -> usize {
        self.collections().iter().map(|(_, s)| s.inserted).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.collections().iter().map(|(_, s)| s.failed).sum()
    }
}

/// Empty every known table of `target` in one transaction.
///
/// The core tables are checked first: a missing or bounded column fails with
/// [`MigrateError::SchemaMismatch`] before anything is deleted. Tables the
/// target does not have are skipped. Returns the tables that were cleared.
pub async fn clear(target: &dyn Store, ctx: &RunContext) -> Result<Vec<&'static str>> {
    clear_tables(target).instrument(ctx.span("clear")).await
}

async fn clear_tables(target: &dyn Store) -> Result<Vec<&'static str>> {
    schema::check_schema(target, &schema::CORE_TABLES).await?;

    let dialect = target.dialect();
    let mut cleared = Vec::new();
    let mut statements = Vec::new();

    for def in schema::CLEAR_ORDER {
        if target.table_exists(def.name).await? {
            statements.push(format!("DELETE FROM {}", dialect.quote_ident(def.name)));
            cleared.push(def.name);
        } else {
            debug!("Clear: {} absent in {}, skipping", def.name, target.label());
        }
    }

    target.execute_atomic(&statements).await?;
    info!("Cleared {} tables in {}", cleared.len(), target.label());

    Ok(cleared)
}

/// Insert `collections` into `target`.
///
/// Missing tables are created first. Record-level problems are counted in the
/// report and logged; only store failures outside a record are returned.
pub async fn load(
    target: &dyn Store,
    collections: &Collections,
    ctx: &RunContext,
) -> Result<LoadReport> {
    async {
        let created = schema::ensure_schema(target).await?;
        if !created.is_empty() {
            info!("Created missing tables: {}", created.join(", "));
        }

        let mut loader = Loader::new(target, Utc::now());
        loader.load_all(collections).await?;
        Ok(loader.report)
    }
    .instrument(ctx.span("load"))
    .await
}

/// Statements waiting for one `insert_batch`, with the index of the record
/// each one came from.
#[derive(Default)]
struct Batch {
    records: Vec<(usize, String)>,
    statements: Vec<Statement>,
}

impl Batch {
    fn push(&mut self, index: usize, label: String, statement: Statement) {
        self.records.push((index, label));
        self.statements.push(statement);
    }
}

struct Loader<'a> {
    target: &'a dyn Store,
    now: DateTime<Utc>,
    skill_ids: HashMap<i64, i64>,
    resource_ids: HashMap<i64, i64>,
    report: LoadReport,
}

impl<'a> Loader<'a> {
    fn new(target: &'a dyn Store, now: DateTime<Utc>) -> Self {
        Self {
            target,
            now,
            skill_ids: HashMap::new(),
            resource_ids: HashMap::new(),
            report: LoadReport::default(),
        }
    }

    async fn load_all(&mut self, c: &Collections) -> Result<()> {
        self.report.skills = self.load_skills(c).await?;
        self.report.resources = self.load_resources(c).await?;
        self.report.skill_resources = self.load_links(c).await?;
        self.report.questions = self.load_content("questions", &c.questions).await?;
        self.report.learning_content_other = self
            .load_content("learning_content_other", &c.learning_content_other)
            .await?;
        self.report.quiz_attempts = self.load_attempts(c).await?;

        for (name, stats) in self.report.collections() {
            info!(
                "Loaded {}: {} inserted, {} skipped, {} duplicates, {} failed",
                name, stats.inserted, stats.skipped, stats.duplicates, stats.failed
            );
        }
        Ok(())
    }

    fn statement(&self, def: &TableDef, fields: Fields) -> Statement {
        self.target.dialect().insert_returning_id(def.name, fields)
    }

    /// Run `batch` and return `(record index, target id)` for every row written.
    async fn insert(
        &self,
        collection: &str,
        batch: Batch,
        stats: &mut CollectionStats,
    ) -> Result<Vec<(usize, i64)>> {
        if batch.statements.is_empty() {
            return Ok(Vec::new());
        }

        let outcomes = self.target.insert_batch(&batch.statements).await?;
        let mut written = Vec::new();

        for ((index, label), outcome) in batch.records.into_iter().zip(outcomes) {
            match outcome {
                Ok(id) => {
                    stats.inserted += 1;
                    if let Some(id) = id {
                        written.push((index, id));
                    }
                }
                Err(message) => {
                    stats.failed += 1;
                    let err = MigrateError::RecordInsert {
                        collection: collection.to_string(),
                        record: label,
                        message,
                    };
                    warn!("{}", err);
                }
            }
        }

        Ok(written)
    }

    async fn load_skills(&mut self, c: &Collections) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut names = self.existing_skill_names().await?;
        let mut queued = HashSet::new();
        let mut aliases = Vec::new();
        let mut batch = Batch::default();

        for (index, skill) in c.skills.iter().enumerate() {
            let fields = match defaults::skill_fields(skill, self.now) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("{}", e);
                    stats.skipped += 1;
                    continue;
                }
            };

            if let Some(&existing) = names.get(&skill.name) {
                debug!("Skill {} already in target as id {}", skill.label(), existing);
                if let Some(source_id) = skill.id {
                    self.skill_ids.insert(source_id, existing);
                }
                stats.duplicates += 1;
                continue;
            }

            // Later records with the same name resolve to the first one.
            if !queued.insert(skill.name.clone()) {
                warn!("Duplicate skill name in document: {}", skill.label());
                if let Some(source_id) = skill.id {
                    aliases.push((source_id, skill.name.clone()));
                }
                stats.duplicates += 1;
                continue;
            }

            batch.push(index, skill.label(), self.statement(&schema::SKILLS, fields));
        }

        for (index, target_id) in self.insert("skills", batch, &mut stats).await? {
            let skill = &c.skills[index];
            names.insert(skill.name.clone(), target_id);
            if let Some(source_id) = skill.id {
                self.skill_ids.insert(source_id, target_id);
            }
        }

        for (source_id, name) in aliases {
            if let Some(&target_id) = names.get(&name) {
                self.skill_ids.insert(source_id, target_id);
            }
        }

        Ok(stats)
    }

    async fn load_resources(&mut self, c: &Collections) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut batch = Batch::default();

        for (index, resource) in c.resources.iter().enumerate() {
            match defaults::resource_fields(resource, self.now) {
                Ok(fields) => {
                    batch.push(index, resource.label(), self.statement(&schema::RESOURCES, fields))
                }
                Err(e) => {
                    warn!("{}", e);
                    stats.skipped += 1;
                }
            }
        }

        for (index, target_id) in self.insert("resources", batch, &mut stats).await? {
            if let Some(source_id) = c.resources[index].id {
                self.resource_ids.insert(source_id, target_id);
            }
        }

        Ok(stats)
    }

    async fn load_links(&mut self, c: &Collections) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut pairs = self.existing_link_pairs().await?;
        let mut batch = Batch::default();

        for (index, link) in c.skill_resources.iter().enumerate() {
            let skill_id = link.skill_id.and_then(|id| self.skill_ids.get(&id).copied());
            let resource_id = link
                .resource_id
                .and_then(|id| self.resource_ids.get(&id).copied());

            let (Some(skill_id), Some(resource_id)) = (skill_id, resource_id) else {
                warn!("Skipping link {}: skill or resource was not loaded", link.label());
                stats.skipped += 1;
                continue;
            };

            if !pairs.insert((skill_id, resource_id)) {
                debug!("Link {} already present", link.label());
                stats.duplicates += 1;
                continue;
            }

            let fields = defaults::link_fields(link, skill_id, resource_id, self.now);
            batch.push(index, link.label(), self.statement(&schema::SKILL_RESOURCES, fields));
        }

        self.insert("skill_resources", batch, &mut stats).await?;
        Ok(stats)
    }

    async fn load_content(
        &mut self,
        collection: &str,
        records: &[LearningContent],
    ) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut quizzed = self.resources_with_questions().await?;
        let mut batch = Batch::default();

        for (index, content) in records.iter().enumerate() {
            let Some(resource_id) = content
                .resource_id
                .and_then(|id| self.resource_ids.get(&id).copied())
            else {
                warn!(
                    "Skipping {} record {}: resource was not loaded",
                    collection,
                    content.label()
                );
                stats.skipped += 1;
                continue;
            };

            let skill_id = match content.skill_id {
                Some(id) => {
                    let mapped = self.skill_ids.get(&id).copied();
                    if mapped.is_none() {
                        debug!("{}: skill {} not loaded, storing NULL", content.label(), id);
                    }
                    mapped
                }
                None => None,
            };

            // One question set per resource.
            if content.content_type.is_questions() && !quizzed.insert(resource_id) {
                debug!("Questions for resource {} already present", resource_id);
                stats.duplicates += 1;
                continue;
            }

            let fields = defaults::content_fields(content, resource_id, skill_id, self.now);
            batch.push(
                index,
                content.label(),
                self.statement(&schema::LEARNING_CONTENT, fields),
            );
        }

        self.insert(collection, batch, &mut stats).await?;
        Ok(stats)
    }

    async fn load_attempts(&mut self, c: &Collections) -> Result<CollectionStats> {
        let mut stats = CollectionStats::default();
        let mut batch = Batch::default();

        for (index, attempt) in c.quiz_attempts.iter().enumerate() {
            let Some(resource_id) = attempt
                .resource_id
                .and_then(|id| self.resource_ids.get(&id).copied())
            else {
                warn!("Skipping quiz attempt {}: resource was not loaded", attempt.label());
                stats.skipped += 1;
                continue;
            };

            let fields = defaults::attempt_fields(attempt, resource_id, self.now);
            batch.push(index, attempt.label(), self.statement(&schema::QUIZ_ATTEMPTS, fields));
        }

        self.insert("quiz_attempts", batch, &mut stats).await?;
        Ok(stats)
    }

    async fn existing_skill_names(&self) -> Result<HashMap<String, i64>> {
        let dialect = self.target.dialect();
        let sql = format!(
            "SELECT {}, {} FROM {}",
            dialect.quote_ident("id"),
            dialect.quote_ident("skill_name"),
            dialect.quote_ident(schema::SKILLS.name)
        );
        let rows = self.target.query(&sql, &[]).await?;

        Ok(rows
            .iter()
            .filter_map(|row| Some((row.text("skill_name")?, row.int("id")?)))
            .collect())
    }

    async fn existing_link_pairs(&self) -> Result<HashSet<(i64, i64)>> {
        let dialect = self.target.dialect();
        let sql = format!(
            "SELECT {}, {} FROM {}",
            dialect.quote_ident("skill_id"),
            dialect.quote_ident("resource_id"),
            dialect.quote_ident(schema::SKILL_RESOURCES.name)
        );
        let rows = self.target.query(&sql, &[]).await?;

        Ok(rows
            .iter()
            .filter_map(|row| Some((row.int("skill_id")?, row.int("resource_id")?)))
            .collect())
    }

    async fn resources_with_questions(&self) -> Result<HashSet<i64>> {
        let dialect = self.target.dialect();
        let kind = SqlValue::from(ContentKind::QUESTIONS);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            dialect.quote_ident("resource_id"),
            dialect.quote_ident(schema::LEARNING_CONTENT.name),
            dialect.quote_ident("content_type"),
            dialect.placeholder(1, &kind)
        );
        let rows = self.target.query(&sql, &[kind]).await?;

        Ok(rows.iter().filter_map(|row| row.int("resource_id")).collect())
    }
}
