//! Extractor: reads complete, id-ordered entity collections from a store.

use tracing::{info, warn, Instrument};

use crate::core::model::{LearningContent, QuizAttempt, Resource, Skill, SkillResourceLink};
use crate::core::schema::{self, TableDef};
use crate::core::traits::Store;
use crate::core::value::Row;
use crate::error::Result;
use crate::interchange::Collections;
use crate::orchestrator::RunContext;

/// Result of one extraction.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub collections: Collections,
    /// Degradations encountered, such as missing tables.
    pub warnings: Vec<String>,
}

/// Read every collection from `source`.
///
/// A missing table yields an empty collection and a warning; any other store
/// failure is returned.
pub async fn extract(source: &dyn Store, ctx: &RunContext) -> Result<Extraction> {
    extract_collections(source)
        .instrument(ctx.span("extract"))
        .await
}

async fn extract_collections(source: &dyn Store) -> Result<Extraction> {
    let mut warnings = Vec::new();

    let skills: Vec<Skill> = read_rows(source, &schema::SKILLS, &mut warnings)
        .await?
        .iter()
        .map(Skill::from_row)
        .collect();

    let resources: Vec<Resource> = read_rows(source, &schema::RESOURCES, &mut warnings)
        .await?
        .iter()
        .map(Resource::from_row)
        .collect();

    let skill_resources: Vec<SkillResourceLink> =
        read_rows(source, &schema::SKILL_RESOURCES, &mut warnings)
            .await?
            .iter()
            .map(SkillResourceLink::from_row)
            .collect();

    let (questions, learning_content_other): (Vec<LearningContent>, Vec<LearningContent>) =
        read_rows(source, &schema::LEARNING_CONTENT, &mut warnings)
            .await?
            .iter()
            .map(LearningContent::from_row)
            .partition(|c| c.content_type.is_questions());

    let quiz_attempts: Vec<QuizAttempt> = read_rows(source, &schema::QUIZ_ATTEMPTS, &mut warnings)
        .await?
        .iter()
        .map(QuizAttempt::from_row)
        .collect();

    let collections = Collections {
        skills,
        resources,
        skill_resources,
        questions,
        learning_content_other,
        quiz_attempts,
    };

    info!(
        "Extracted from {}: {} skills, {} resources, {} links, {} questions, {} other content, {} quiz attempts",
        source.label(),
        collections.skills.len(),
        collections.resources.len(),
        collections.skill_resources.len(),
        collections.questions.len(),
        collections.learning_content_other.len(),
        collections.quiz_attempts.len()
    );

    Ok(Extraction {
        collections,
        warnings,
    })
}

async fn read_rows(source: &dyn Store, table: &TableDef, warnings: &mut Vec<String>) -> Result<Vec<Row>> {
    if !source.table_exists(table.name).await? {
        let message = format!(
            "table {} not found in {}; exported as empty",
            table.name,
            source.label()
        );
        warn!("{}", message);
        warnings.push(message);
        return Ok(Vec::new());
    }

    source
        .query(&source.dialect().select_all(table.name), &[])
        .await
}
