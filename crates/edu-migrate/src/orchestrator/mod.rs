//! Run coordinator: opens the stores named by configuration and drives the
//! Extractor, Loader, Verifier, Linker and Prober.
//!
//! A migration is not a cross-store transaction. Each collection commits on
//! its own, so a failure part-way through an import can leave the target
//! partially loaded; re-running the import clears and reloads it. The target
//! connection is held for clear, load and verify, and closed at the end of the
//! run whether or not records failed.

mod context;

pub use context::RunContext;

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::core::traits::Store;
use crate::drivers::{PostgresStore, SqliteStore};
use crate::error::{MigrateError, Result};
use crate::extract;
use crate::interchange::{self, Collections, ExportMetadata};
use crate::link::{self, LinkReport};
use crate::load::{self, LoadReport};
use crate::probe::{CheckResult, ProbeReport, Prober};
use crate::verify::{self, VerifyReport};

/// Which configured store a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreSide {
    Source,
    #[default]
    Target,
}

impl std::str::FromStr for StoreSide {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "source" => Ok(StoreSide::Source),
            "target" => Ok(StoreSide::Target),
            other => Err(MigrateError::Config(format!(
                "unknown store '{}', expected source or target",
                other
            ))),
        }
    }
}

/// Result of an export, import or migrate run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Interchange document written or read.
    pub document: String,

    /// Envelope of the document.
    pub envelope: ExportMetadata,

    /// Degradations met while extracting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Present when the run loaded a target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadReport>,

    /// Present when the run loaded a target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyReport>,
}

impl MigrationResult {
    fn new(ctx: &RunContext, started_at: DateTime<Utc>, document: &Path, envelope: ExportMetadata) -> Self {
        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        Self {
            run_id: ctx.run_id().to_string(),
            status: "completed".to_string(),
            duration_seconds,
            started_at,
            completed_at,
            document: document.display().to_string(),
            envelope,
            warnings: Vec::new(),
            load: None,
            verify: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of clear + load + verify against one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub cleared: Vec<String>,
    pub load: LoadReport,
    pub verify: VerifyReport,
}

/// Connectivity of the configured stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

/// Extract `source` and write the interchange document to `path`.
pub async fn export_to(
    source: &dyn Store,
    path: &Path,
    ctx: &RunContext,
) -> Result<(ExportMetadata, Vec<String>)> {
    let extraction = extract::extract(source, ctx).await?;
    for warning in &extraction.warnings {
        warn!("{}", warning);
    }

    let envelope = ExportMetadata::describe(&extraction.collections, source.label());
    interchange::write_document(path, &extraction.collections, &envelope)?;
    info!("Wrote {}", path.display());

    Ok((envelope, extraction.warnings))
}

/// Clear `target`, load `collections` and verify against `envelope`.
pub async fn import_into(
    target: &dyn Store,
    collections: &Collections,
    envelope: &ExportMetadata,
    ctx: &RunContext,
) -> Result<ImportOutcome> {
    let cleared = load::clear(target, ctx).await?;
    let load = load::load(target, collections, ctx).await?;
    let verify = verify::verify(target, envelope, ctx).await?;

    Ok(ImportOutcome {
        cleared: cleared.into_iter().map(str::to_string).collect(),
        load,
        verify,
    })
}

/// Drives runs for one configuration.
pub struct Orchestrator {
    config: Config,
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ctx: RunContext::new(),
        }
    }

    pub fn with_context(mut self, ctx: RunContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Open the configured SQLite source.
    pub async fn open_source(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.config.source.path, &self.config.source.label).await
    }

    /// Connect to the configured PostgreSQL target.
    ///
    /// A missing connection string fails with a config error before any
    /// network access.
    pub async fn connect_target(&self) -> Result<PostgresStore> {
        let url = self.config.target.resolve_url()?;
        let ssl_mode = self.config.target.ssl()?;
        PostgresStore::connect(&url, ssl_mode, &self.config.target.label).await
    }

    /// Extractor + Codec write.
    pub async fn export(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let path = &self.config.export.path;

        let source = self.open_source().await?;
        let exported = export_to(&source, path, &self.ctx).await;
        source.close().await;
        let (envelope, warnings) = exported?;

        let mut result = MigrationResult::new(&self.ctx, started_at, path, envelope);
        result.warnings = warnings;
        Ok(result)
    }

    /// Codec read + clear + load + verify against the target.
    pub async fn import(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let path = &self.config.export.path;

        let (collections, envelope) = interchange::read_document(path)?;
        info!(
            "Importing {} exported at {} from {}",
            path.display(),
            envelope.timestamp.to_rfc3339(),
            envelope.source
        );

        let target = self.connect_target().await?;
        let imported = import_into(&target, &collections, &envelope, &self.ctx).await;
        target.close().await;
        let outcome = imported?;

        let envelope = envelope.with_target(&self.config.target.label);
        let mut result = MigrationResult::new(&self.ctx, started_at, path, envelope);
        if !outcome.verify.is_consistent() {
            result.status = "completed_with_mismatches".to_string();
        }
        result.load = Some(outcome.load);
        result.verify = Some(outcome.verify);
        Ok(result)
    }

    /// Export then import in one run.
    pub async fn migrate(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        // Resolve the target first so a missing connection string fails
        // before the document is overwritten.
        self.config.target.resolve_url()?;

        let exported = self.export().await?;
        let mut result = self.import().await?;

        result.started_at = started_at;
        result.duration_seconds = start.elapsed().as_secs_f64();
        result.warnings = exported.warnings;

        info!(
            "Migration {} finished in {:.2}s: {} rows loaded",
            result.status,
            result.duration_seconds,
            result.load.as_ref().map(|l| l.total_inserted()).unwrap_or(0)
        );
        Ok(result)
    }

    /// Relevance Linker against either store.
    pub async fn link(&self, side: StoreSide) -> Result<LinkReport> {
        match side {
            StoreSide::Source => {
                let store = self.open_source().await?;
                let report = link::run(&store, &self.config.linker, &self.ctx).await;
                store.close().await;
                report
            }
            StoreSide::Target => {
                let store = self.connect_target().await?;
                let report = link::run(&store, &self.config.linker, &self.ctx).await;
                store.close().await;
                report
            }
        }
    }

    /// Verifier against the target using the document's envelope.
    pub async fn verify(&self) -> Result<VerifyReport> {
        let (_, envelope) = interchange::read_document(&self.config.export.path)?;
        let target = self.connect_target().await?;
        let report = verify::verify(&target, &envelope, &self.ctx).await;
        target.close().await;
        report
    }

    /// Readiness Prober against the configured base URL.
    pub async fn probe<F>(&self, on_result: F) -> Result<ProbeReport>
    where
        F: FnMut(&CheckResult),
    {
        let prober = Prober::new(&self.config.probe)?;
        Ok(prober.run(&self.ctx, on_result).await)
    }

    /// Connectivity of source and target.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let start = Instant::now();
        let source = match self.open_source().await {
            Ok(store) => {
                let pinged = store.ping().await;
                store.close().await;
                pinged
            }
            Err(e) => Err(e),
        };
        let source_latency_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let target = match self.connect_target().await {
            Ok(store) => {
                let pinged = store.ping().await;
                store.close().await;
                pinged
            }
            Err(e) => Err(e),
        };
        let target_latency_ms = start.elapsed().as_millis() as u64;

        let result = HealthCheckResult {
            source_connected: source.is_ok(),
            source_latency_ms,
            source_error: source.err().map(|e| e.to_string()),
            target_connected: target.is_ok(),
            target_latency_ms,
            target_error: target.err().map(|e| e.to_string()),
            healthy: false,
        };

        Ok(HealthCheckResult {
            healthy: result.source_connected && result.target_connected,
            ..result
        })
    }
}
