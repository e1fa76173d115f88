//! Per-run logging context.

use tracing::{info_span, Span};
use uuid::Uuid;

/// Identifies one run in every log line it produces.
///
/// Components take a `&RunContext` and instrument their work with
/// [`RunContext::span`]. The library never installs a subscriber; the binary
/// decides where spans and events go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    run_id: String,
}

impl RunContext {
    /// Fresh context with a random run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Context with a caller-chosen run id.
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span for one pipeline stage.
    pub fn span(&self, stage: &'static str) -> Span {
        info_span!("stage", run_id = %self.run_id, stage)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
