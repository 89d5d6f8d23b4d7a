//! Post-run reports composed from the log database.

mod basics;
mod check_results;
mod gpu_summary;
mod section;
mod transition_history;

pub use basics::{WorkflowDescriptionSection, WorkflowFileSection, WorkflowNameSection};
pub use check_results::CheckResultsSection;
pub use gpu_summary::GpuSummarySection;
pub use section::{ReportContext, ReportSection};
pub use transition_history::TransitionHistorySection;

// Layer 3: Internal
use crate::context::RuntimeContext;
use crate::error::EngineError;

/// Output source id reports are emitted under.
pub const REPORTER_SOURCE: &str = "workflow-reporter";

/// Ordered pipeline of section builders.
///
/// Sections generate independently from the database; empty output
/// suppresses a section. The assembled report is routed through the
/// multiplexer like any other output.
pub struct Reporter {
    sections: Vec<Box<dyn ReportSection>>,
}

impl Reporter {
    /// A reporter with no sections.
    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// The standard section set.
    pub fn standard() -> Self {
        let mut reporter = Self::empty();
        reporter.push(Box::new(WorkflowNameSection));
        reporter.push(Box::new(WorkflowFileSection));
        reporter.push(Box::new(WorkflowDescriptionSection));
        reporter.push(Box::new(CheckResultsSection::default()));
        reporter.push(Box::new(TransitionHistorySection::default()));
        reporter.push(Box::new(GpuSummarySection::default()));
        reporter
    }

    /// Attach a section.
    pub fn push(&mut self, section: Box<dyn ReportSection>) {
        self.sections.push(section);
    }

    /// Generate all sections, lowest order first, joined by blank lines.
    pub async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let mut ordered: Vec<&dyn ReportSection> =
            self.sections.iter().map(|section| section.as_ref()).collect();
        ordered.sort_by_key(|section| section.order());

        let mut parts = Vec::new();
        for section in ordered {
            let content = section.generate(ctx).await?;
            if !content.is_empty() {
                parts.push(content);
            }
        }
        Ok(parts.join("\n\n"))
    }

    /// Generate and route the report through the output multiplexer.
    pub async fn publish(
        &self,
        ctx: &ReportContext,
        runtime: &RuntimeContext,
    ) -> Result<(), EngineError> {
        let report = self.generate(ctx).await?;
        if !report.is_empty() {
            runtime.emit(REPORTER_SOURCE, "plugin-result", &report).await;
        }
        Ok(())
    }
}
