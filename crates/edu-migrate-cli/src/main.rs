//! edu-migrate CLI - snapshot migration, relevance linking and release probing.

use clap::{Parser, Subcommand, ValueEnum};
use edu_migrate::probe::CheckResult;
use edu_migrate::{
    Config, LinkReport, MigrateError, MigrationResult, Orchestrator, StoreSide, VerifyReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "edu-migrate")]
#[command(about = "Move the learning-content catalog between SQLite and PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file [default: edu-migrate.yaml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkStore {
    Source,
    Target,
}

impl From<LinkStore> for StoreSide {
    fn from(store: LinkStore) -> Self {
        match store {
            LinkStore::Source => StoreSide::Source,
            LinkStore::Target => StoreSide::Target,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export the source store to the interchange document
    Export,

    /// Clear the target, load the interchange document and verify counts
    Import,

    /// Export then import in one run
    Migrate,

    /// Link unlinked resources to skills by category
    Link {
        /// Store to link
        #[arg(long, value_enum, default_value = "target")]
        store: LinkStore,
    },

    /// Compare target row counts with the document's export metadata
    Verify,

    /// Run the release readiness checks against a deployed instance
    Probe {
        /// Override the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Test store connections
    HealthCheck,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // A .env file may carry the target connection string.
    let dotenv = dotenvy::dotenv().ok();

    setup_logging(&cli.verbosity, &cli.log_format);
    if let Some(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let mut config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Export => {
            let result = Orchestrator::new(config).export().await?;
            print_migration(&result, cli.output_json)?;
        }

        Commands::Import => {
            let result = Orchestrator::new(config).import().await?;
            print_migration(&result, cli.output_json)?;
        }

        Commands::Migrate => {
            let result = Orchestrator::new(config).migrate().await?;
            print_migration(&result, cli.output_json)?;
        }

        Commands::Link { store } => {
            let report = Orchestrator::new(config).link(store.into()).await?;
            print_link(&report, cli.output_json)?;
        }

        Commands::Verify => {
            let report = Orchestrator::new(config).verify().await?;
            print_verify(&report, cli.output_json)?;
        }

        Commands::Probe { base_url } => {
            if let Some(url) = base_url {
                config.probe.base_url = url;
                config.validate()?;
            }

            let output_json = cli.output_json;
            let orchestrator = Orchestrator::new(config);
            let report = orchestrator
                .probe(|result: &CheckResult| {
                    if !output_json {
                        println!("{}", result.verdict_line());
                    }
                })
                .await?;

            if output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!();
                println!("Passed:  {}", report.passed());
                println!("Failed:  {}", report.failed());
                println!("Blocked: {}", report.blocked());
                println!(
                    "Verdict: {}",
                    if report.is_ready() { "READY" } else { "NOT READY" }
                );
            }

            report.into_result()?;
        }

        Commands::HealthCheck => {
            let result = Orchestrator::new(config).health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (SQLite): {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (PostgreSQL): {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.source_connected {
                return Err(MigrateError::source_unavailable(
                    result.source_error.unwrap_or_default(),
                    "health check",
                ));
            }
            if !result.target_connected {
                return Err(MigrateError::target_unavailable(
                    result.target_error.unwrap_or_default(),
                    "health check",
                ));
            }
        }
    }

    Ok(())
}

fn print_migration(result: &MigrationResult, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", result.to_json()?);
        return Ok(());
    }

    let envelope = &result.envelope;
    println!("Run {}: {}", result.run_id, result.status);
    println!("  Document: {}", result.document);
    println!("  Source: {}", envelope.source);
    if let Some(ref target) = envelope.target {
        println!("  Target: {}", target);
    }
    println!("  Skills: {}", envelope.total_skills);
    println!("  Resources: {}", envelope.total_resources);
    println!("  Skill-resource links: {}", envelope.total_mappings);
    println!("  Questions: {}", envelope.total_questions);
    println!("  Other learning content: {}", envelope.total_other_content);
    println!("  Quiz attempts: {}", envelope.total_quiz_attempts);
    for warning in &result.warnings {
        println!("  Warning: {}", warning);
    }

    if let Some(ref load) = result.load {
        println!("\nLoad Summary:");
        for (name, stats) in load.collections() {
            println!(
                "  {}: {} inserted, {} skipped, {} duplicates, {} failed",
                name, stats.inserted, stats.skipped, stats.duplicates, stats.failed
            );
        }
    }

    if let Some(ref verify) = result.verify {
        println!();
        print_verify(verify, false)?;
    }

    println!("\nDuration: {:.2}s", result.duration_seconds);
    Ok(())
}

fn print_verify(report: &VerifyReport, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Verification Summary:");
    for check in &report.counts {
        let marker = if check.matches() { "OK" } else { "MISMATCH" };
        println!(
            "  {}: expected {}, found {} [{}]",
            check.collection, check.expected, check.actual, marker
        );
    }
    print_coverage(&report.coverage);
    Ok(())
}

fn print_link(report: &LinkReport, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Linker Summary:");
    println!("  Created: {}", report.inserted);
    println!("    by category rule: {}", report.by_rule);
    println!("    by hash pick: {}", report.by_hash);
    println!("    by fallback skill: {}", report.by_fallback);
    println!("  Already linked: {}", report.already_linked);
    println!("  Duplicates skipped: {}", report.skipped_duplicates);
    println!("  Rejected: {}", report.failed);
    println!("  Unmatched: {}", report.unmatched.len());
    for label in &report.unmatched {
        println!("    {}", label);
    }
    print_coverage(&report.coverage);
    Ok(())
}

fn print_coverage(coverage: &[edu_migrate::verify::SkillCoverage]) {
    if coverage.is_empty() {
        return;
    }
    println!("\nSkill-resource counts:");
    for entry in coverage {
        println!("  {}: {} resources", entry.skill_name, entry.resource_count);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
