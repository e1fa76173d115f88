//! # edu-migrate
//!
//! Moves an educational-content catalog (skills, resources, skill↔resource
//! links, generated quizzes and quiz attempts) from a local SQLite store to a
//! hosted PostgreSQL store through a portable JSON snapshot.
//!
//! The library provides:
//!
//! - **Extraction** of id-ordered entity collections from either store
//! - **Interchange** encoding of a snapshot with its migration envelope
//! - **Loading** with per-record savepoints, defaults and foreign-key translation
//! - **Verification** of loaded counts against the envelope
//! - **Relevance linking** of unlinked resources to skills by category rules
//! - **Readiness probing** of a deployed instance over HTTP
//!
//! ## Example
//!
//! ```rust,no_run
//! use edu_migrate::{Config, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> edu_migrate::Result<()> {
//!     let config = Config::resolve(None)?;
//!     let orchestrator = Orchestrator::new(config);
//!     let result = orchestrator.migrate().await?;
//!     println!("{}", result.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod extract;
pub mod interchange;
pub mod link;
pub mod load;
pub mod orchestrator;
pub mod probe;
pub mod verify;

// Re-exports for convenient access
pub use config::{Config, LinkerConfig, ProbeConfig, SourceConfig, TargetConfig};
pub use crate::core::{Row, SqlValue, Store};
pub use dialect::Dialect;
pub use drivers::{PostgresStore, SqliteStore, SslMode};
pub use error::{MigrateError, Result};
pub use interchange::{Collections, Document, ExportMetadata};
pub use link::{LinkReport, TitleHash};
pub use load::{CollectionStats, LoadReport};
pub use orchestrator::{
    HealthCheckResult, ImportOutcome, MigrationResult, Orchestrator, RunContext, StoreSide,
};
pub use probe::{Outcome, ProbeReport, Prober};
pub use verify::VerifyReport;
