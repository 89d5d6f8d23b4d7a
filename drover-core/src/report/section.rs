//! Section builder contract.

// Layer 1: Standard library
use std::path::PathBuf;
use std::sync::Arc;

// Layer 2: Third-party
use async_trait::async_trait;
use drover_store::LogHandle;

// Layer 3: Internal
use crate::error::EngineError;
use crate::workflow::Workflow;

/// What a section builder sees: the finished session in the database plus
/// the workflow the run executed.
#[derive(Clone)]
pub struct ReportContext {
    pub log: LogHandle,
    pub session_id: i64,
    pub workflow: Option<Arc<Workflow>>,
    pub workflow_path: Option<PathBuf>,
}

/// One report section.
///
/// Sections are rendered in ascending `order`; returning an empty string
/// suppresses the section entirely.
#[async_trait]
pub trait ReportSection: Send + Sync {
    /// Stable position in the report; lower renders first.
    fn order(&self) -> i32;

    /// Produce the section body.
    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError>;
}
