//! Core types shared by every component.
//!
//! - [`model`]: entity types moved between stores
//! - [`schema`]: table definitions, bootstrapping and the pre-load check
//! - [`traits`]: the [`Store`] abstraction over SQLite and PostgreSQL
//! - [`value`]: SQL values and decoded rows

pub mod model;
pub mod schema;
pub mod traits;
pub mod value;

pub use model::{
    ContentKind, DemandTrend, LearningContent, QuizAttempt, Resource, ResourceRole, Skill,
    SkillResourceLink, SkillStatus,
};
pub use schema::{ColumnDef, ColumnKind, TableDef};
pub use traits::{ColumnInfo, RecordOutcome, Statement, Store};
pub use value::{Row, SqlNullType, SqlValue};
