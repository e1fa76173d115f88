//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration, linking and probing operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing connection string, missing file, invalid YAML, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source store could not be opened
    #[error("Source store unavailable: {message}\n  Context: {context}")]
    SourceUnavailable { message: String, context: String },

    /// Target store could not be reached
    #[error("Target store unavailable: {message}\n  Context: {context}")]
    TargetUnavailable { message: String, context: String },

    /// Expected table or column absent (or too narrow) in a store
    #[error("Schema mismatch in {table}: {message}")]
    SchemaMismatch { table: String, message: String },

    /// Identity-required field absent from a record
    #[error("Required field {field} missing from {collection} record {record}")]
    RequiredFieldMissing {
        collection: String,
        field: String,
        record: String,
    },

    /// A single record could not be written
    #[error("Insert failed for {collection} record {record}: {message}")]
    RecordInsert {
        collection: String,
        record: String,
        message: String,
    },

    /// Query failed against an open store
    #[error("Query failed: {message}\n  Context: {context}")]
    Query { message: String, context: String },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Readiness verdict was not "ready"
    #[error("Readiness probe failed: {failed} failed, {blocked} blocked of {total} checks")]
    ProbeFailed {
        failed: usize,
        blocked: usize,
        total: usize,
    },

    /// Target PostgreSQL error
    #[error("Target database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// HTTP client error outside of an individual probe
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error with context about where it occurred
    pub fn query(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Query {
            message: message.to_string(),
            context: context.into(),
        }
    }

    pub fn source_unavailable(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::SourceUnavailable {
            message: message.to_string(),
            context: context.into(),
        }
    }

    pub fn target_unavailable(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::TargetUnavailable {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SchemaMismatch error
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::SchemaMismatch {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a RequiredFieldMissing error
    pub fn required(
        collection: impl Into<String>,
        field: impl Into<String>,
        record: impl Into<String>,
    ) -> Self {
        MigrateError::RequiredFieldMissing {
            collection: collection.into(),
            field: field.into(),
            record: record.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// Configuration problems exit with 2, unreachable stores with 3 and a
    /// target schema that needs widening with 4. Everything else exits 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::SourceUnavailable { .. } | MigrateError::TargetUnavailable { .. } => 3,
            MigrateError::SchemaMismatch { .. } => 4,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::source_unavailable("x", "y").exit_code(), 3);
        assert_eq!(MigrateError::target_unavailable("x", "y").exit_code(), 3);
        assert_eq!(MigrateError::schema("t", "m").exit_code(), 4);
        assert_eq!(MigrateError::query("x", "y").exit_code(), 1);
        assert_eq!(
            MigrateError::ProbeFailed {
                failed: 1,
                blocked: 0,
                total: 3
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::required("resources", "url", "id=7");
        let out = err.format_detailed();
        assert!(out.starts_with("Error: Required field url missing"));
        assert!(out.contains("id=7"));
    }
}
