//! Reconciliation of a loaded target against the migration envelope.
//!
//! Count mismatches are reported as warnings and returned in the report; they
//! never fail the run. The per-skill coverage summary is shared with the
//! Linker, which prints the same table after creating links.

pub mod types;

pub use types::{CountCheck, SkillCoverage, VerifyReport};

use tracing::{info, warn, Instrument};

use crate::core::model::ContentKind;
use crate::core::schema::{self, TableDef};
use crate::core::traits::Store;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::interchange::ExportMetadata;
use crate::orchestrator::RunContext;

const SKILL_COVERAGE_SQL: &str = "SELECT s.skill_name, COUNT(sr.resource_id) AS resource_count \
     FROM emerging_skills s \
     LEFT JOIN skill_resources sr ON s.id = sr.skill_id \
     GROUP BY s.id, s.skill_name \
     ORDER BY resource_count DESC, s.skill_name";

/// How a collection is counted in the target.
enum Filter {
    All,
    Questions,
    OtherContent,
}

/// Compare target row counts with `envelope` and summarize link coverage.
pub async fn verify(
    target: &dyn Store,
    envelope: &ExportMetadata,
    ctx: &RunContext,
) -> Result<VerifyReport> {
    verify_counts(target, envelope)
        .instrument(ctx.span("verify"))
        .await
}

async fn verify_counts(target: &dyn Store, envelope: &ExportMetadata) -> Result<VerifyReport> {
    let plan = [
        ("skills", &schema::SKILLS, Filter::All, envelope.total_skills),
        ("resources", &schema::RESOURCES, Filter::All, envelope.total_resources),
        (
            "skill_resources",
            &schema::SKILL_RESOURCES,
            Filter::All,
            envelope.total_mappings,
        ),
        (
            "questions",
            &schema::LEARNING_CONTENT,
            Filter::Questions,
            envelope.total_questions,
        ),
        (
            "learning_content_other",
            &schema::LEARNING_CONTENT,
            Filter::OtherContent,
            envelope.total_other_content,
        ),
        (
            "quiz_attempts",
            &schema::QUIZ_ATTEMPTS,
            Filter::All,
            envelope.total_quiz_attempts,
        ),
    ];

    let mut counts = Vec::with_capacity(plan.len());
    for (collection, def, filter, expected) in plan {
        let actual = count_rows(target, def, filter).await?;
        let check = CountCheck {
            collection: collection.to_string(),
            expected,
            actual,
        };

        if check.matches() {
            info!("{}: {} rows", collection, actual);
        } else {
            warn!(
                "{}: expected {} rows, found {} in {}",
                collection,
                expected,
                actual,
                target.label()
            );
        }
        counts.push(check);
    }

    let coverage = skill_coverage(target).await?;
    let report = VerifyReport { counts, coverage };

    let mismatched = report.mismatches().count();
    if mismatched == 0 {
        info!("Verification passed: all collection counts match");
    } else {
        warn!("Verification found {} count mismatches", mismatched);
    }

    Ok(report)
}

async fn count_rows(target: &dyn Store, def: &TableDef, filter: Filter) -> Result<usize> {
    if !target.table_exists(def.name).await? {
        return Ok(0);
    }

    let dialect = target.dialect();
    let table = dialect.quote_ident(def.name);
    let kind = SqlValue::from(ContentKind::QUESTIONS);
    let content_type = dialect.quote_ident("content_type");

    let (sql, params) = match filter {
        Filter::All => (format!("SELECT COUNT(*) AS n FROM {}", table), vec![]),
        Filter::Questions => (
            format!(
                "SELECT COUNT(*) AS n FROM {} WHERE {} = {}",
                table,
                content_type,
                dialect.placeholder(1, &kind)
            ),
            vec![kind],
        ),
        Filter::OtherContent => (
            format!(
                "SELECT COUNT(*) AS n FROM {} WHERE {} <> {}",
                table,
                content_type,
                dialect.placeholder(1, &kind)
            ),
            vec![kind],
        ),
    };

    let rows = target.query(&sql, &params).await?;
    Ok(rows
        .first()
        .and_then(|row| row.int("n"))
        .map(|n| n.max(0) as usize)
        .unwrap_or(0))
}

/// Resources linked to each skill, most-linked first.
///
/// Skills without links are included with a count of zero.
pub async fn skill_coverage(store: &dyn Store) -> Result<Vec<SkillCoverage>> {
    if !store.table_exists(schema::SKILLS.name).await?
        || !store.table_exists(schema::SKILL_RESOURCES.name).await?
    {
        return Ok(Vec::new());
    }

    let rows = store.query(SKILL_COVERAGE_SQL, &[]).await?;
    let coverage: Vec<SkillCoverage> = rows
        .iter()
        .map(|row| SkillCoverage {
            skill_name: row.text("skill_name").unwrap_or_default(),
            resource_count: row.int("resource_count").unwrap_or(0).max(0) as usize,
        })
        .collect();

    for entry in &coverage {
        info!("  {}: {} resources", entry.skill_name, entry.resource_count);
    }

    Ok(coverage)
}
