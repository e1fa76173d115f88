//! Table definitions shared by both stores.
//!
//! The same definitions drive `CREATE TABLE IF NOT EXISTS` bootstrapping of an
//! empty store and the pre-load check of an existing target. Existing tables
//! are never altered: a missing column or a bounded text column is reported as
//! [`MigrateError::SchemaMismatch`] for an operator to fix.

use tracing::{debug, info};

use crate::error::{MigrateError, Result};

use super::traits::Store;

/// Logical column type, rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Surrogate key generated by the store.
    Id,
    /// Unbounded text.
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
}

/// Column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub not_null: bool,
    pub unique: bool,
    /// Referenced table for a foreign key on `id`.
    pub references: Option<&'static str>,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        not_null: false,
        unique: false,
        references: None,
    }
}

const fn text(name: &'static str) -> ColumnDef {
    col(name, ColumnKind::Text)
}

impl ColumnDef {
    const fn required(self) -> Self {
        ColumnDef {
            not_null: true,
            ..self
        }
    }

    const fn unique(self) -> Self {
        ColumnDef {
            unique: true,
            ..self
        }
    }

    const fn references(self, table: &'static str) -> Self {
        ColumnDef {
            references: Some(table),
            ..self
        }
    }
}

/// Table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Columns forming a composite unique key.
    pub unique_together: &'static [&'static str],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub const SKILLS: TableDef = TableDef {
    name: "emerging_skills",
    columns: &[
        col("id", ColumnKind::Id),
        text("skill_name").required().unique(),
        text("category"),
        col("urgency_score", ColumnKind::Float),
        text("demand_trend"),
        text("source_analysis"),
        text("description"),
        text("keywords"),
        text("related_skills"),
        text("job_market_data"),
        text("status"),
        col("created_at", ColumnKind::Timestamp),
        col("updated_at", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

pub const RESOURCES: TableDef = TableDef {
    name: "educational_resources",
    columns: &[
        col("id", ColumnKind::Id),
        text("title").required(),
        text("url").required(),
        text("resource_type"),
        text("cost_type"),
        text("difficulty_level"),
        text("estimated_duration"),
        text("description"),
        text("author"),
        text("tags"),
        text("skill_category"),
        col("quality_score", ColumnKind::Float),
        text("discovery_method"),
        col("ai_analysis_score", ColumnKind::Float),
        text("ai_analysis_details"),
        col("ai_analysis_date", ColumnKind::Timestamp),
        text("learning_level"),
        col("sequence_order", ColumnKind::Integer),
        text("prerequisites"),
        text("learning_objectives"),
        col("created_at", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

pub const SKILL_RESOURCES: TableDef = TableDef {
    name: "skill_resources",
    columns: &[
        col("id", ColumnKind::Id),
        col("skill_id", ColumnKind::Integer)
            .required()
            .references(SKILLS.name),
        col("resource_id", ColumnKind::Integer)
            .required()
            .references(RESOURCES.name),
        col("relevance_score", ColumnKind::Float),
        text("resource_type_for_skill"),
        col("auto_discovered", ColumnKind::Bool),
        col("discovery_date", ColumnKind::Timestamp),
    ],
    unique_together: &["skill_id", "resource_id"],
};

pub const LEARNING_CONTENT: TableDef = TableDef {
    name: "learning_content",
    columns: &[
        col("id", ColumnKind::Id),
        col("resource_id", ColumnKind::Integer).references(RESOURCES.name),
        col("skill_id", ColumnKind::Integer).references(SKILLS.name),
        text("content_type").required(),
        text("content_data"),
        text("ai_model_used"),
        col("ai_generated_date", ColumnKind::Timestamp),
        col("admin_approved", ColumnKind::Bool),
        col("admin_modified", ColumnKind::Bool),
        col("quality_score", ColumnKind::Float),
        col("usage_count", ColumnKind::Integer),
        col("feedback_rating", ColumnKind::Float),
        col("created_at", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

pub const QUIZ_ATTEMPTS: TableDef = TableDef {
    name: "quiz_attempts",
    columns: &[
        col("id", ColumnKind::Id),
        col("resource_id", ColumnKind::Integer).references(RESOURCES.name),
        text("answers"),
        col("score_percentage", ColumnKind::Float),
        col("created_at", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

// Auxiliary tables are cleared with the core tables but never loaded.

pub const CONTENT_ANALYSIS_QUEUE: TableDef = TableDef {
    name: "content_analysis_queue",
    columns: &[
        col("id", ColumnKind::Id),
        col("resource_id", ColumnKind::Integer).references(RESOURCES.name),
        text("analysis_type"),
        col("priority", ColumnKind::Integer),
        text("status"),
        col("retry_count", ColumnKind::Integer),
        text("error_message"),
        col("queued_date", ColumnKind::Timestamp),
        col("started_date", ColumnKind::Timestamp),
        col("completed_date", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

pub const SKILL_LEARNING_PATHS: TableDef = TableDef {
    name: "skill_learning_paths",
    columns: &[
        col("id", ColumnKind::Id),
        col("skill_id", ColumnKind::Integer).references(SKILLS.name),
        text("path_name").required(),
        text("path_description"),
        text("resource_sequence"),
        col("estimated_duration", ColumnKind::Integer),
        text("difficulty_progression"),
        text("prerequisites"),
        text("learning_milestones"),
        col("created_at", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

pub const LEARNING_SESSIONS: TableDef = TableDef {
    name: "learning_sessions",
    columns: &[
        col("id", ColumnKind::Id),
        text("session_id").required(),
        col("skill_id", ColumnKind::Integer).references(SKILLS.name),
        col("learning_path_id", ColumnKind::Integer).references(SKILL_LEARNING_PATHS.name),
        col("current_resource_id", ColumnKind::Integer).references(RESOURCES.name),
        col("progress_percentage", ColumnKind::Float),
        col("time_spent_minutes", ColumnKind::Integer),
        col("last_activity", ColumnKind::Timestamp),
    ],
    unique_together: &[],
};

/// Loaded tables in insert (dependency) order.
pub const CORE_TABLES: [&TableDef; 5] = [
    &SKILLS,
    &RESOURCES,
    &SKILL_RESOURCES,
    &LEARNING_CONTENT,
    &QUIZ_ATTEMPTS,
];

pub const AUXILIARY_TABLES: [&TableDef; 3] = [
    &CONTENT_ANALYSIS_QUEUE,
    &SKILL_LEARNING_PATHS,
    &LEARNING_SESSIONS,
];

/// Order in which the Loader clears the target. Dependents go before the
/// tables they reference, so the auxiliary tables referencing skills and
/// resources are emptied first.
pub const CLEAR_ORDER: [&TableDef; 8] = [
    &LEARNING_SESSIONS,
    &CONTENT_ANALYSIS_QUEUE,
    &SKILL_LEARNING_PATHS,
    &LEARNING_CONTENT,
    &QUIZ_ATTEMPTS,
    &SKILL_RESOURCES,
    &RESOURCES,
    &SKILLS,
];

/// Look up a table definition by name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    CORE_TABLES
        .iter()
        .chain(AUXILIARY_TABLES.iter())
        .copied()
        .find(|t| t.name == name)
}

/// Create every known table that does not exist yet.
///
/// Returns the names of the tables that were created.
pub async fn ensure_schema(store: &dyn Store) -> Result<Vec<&'static str>> {
    let dialect = store.dialect();
    let mut created = Vec::new();

    for def in CORE_TABLES.iter().chain(AUXILIARY_TABLES.iter()) {
        if store.table_exists(def.name).await? {
            continue;
        }
        store.execute(&dialect.create_table(def), &[]).await?;
        info!("Created table {} in {}", def.name, store.label());
        created.push(def.name);
    }

    Ok(created)
}

/// Check that existing target tables can hold every loaded field.
///
/// Absent tables are skipped. A missing column, or a text column declared
/// with a length bound, fails with [`MigrateError::SchemaMismatch`].
pub async fn check_schema(store: &dyn Store, tables: &[&TableDef]) -> Result<()> {
    for def in tables {
        let actual = store.columns(def.name).await?;
        if actual.is_empty() {
            debug!("Schema check: {} absent in {}", def.name, store.label());
            continue;
        }

        for expected in def.columns {
            let found = actual
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(expected.name));

            match found {
                None => {
                    return Err(MigrateError::schema(
                        def.name,
                        format!("column {} is missing", expected.name),
                    ));
                }
                Some(column) if expected.kind == ColumnKind::Text && column.is_bounded() => {
                    return Err(MigrateError::schema(
                        def.name,
                        format!(
                            "column {} is {}({}); widen it to TEXT before loading",
                            column.name,
                            column.data_type,
                            column.max_length.unwrap_or_default()
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}
