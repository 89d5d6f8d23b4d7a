//! The small leading sections: name, file, description.

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use super::section::{ReportContext, ReportSection};
use crate::error::EngineError;

/// Workflow name, or the file name when the document had none.
pub struct WorkflowNameSection;

#[async_trait]
impl ReportSection for WorkflowNameSection {
    fn order(&self) -> i32 {
        100
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        if let Some(workflow) = &ctx.workflow {
            return Ok(format!("Workflow: {}", workflow.name));
        }
        match &ctx.workflow_path {
            Some(path) => Ok(format!(
                "Workflow: {}",
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            )),
            None => Ok(String::new()),
        }
    }
}

/// Resolved absolute path of the workflow document.
pub struct WorkflowFileSection;

#[async_trait]
impl ReportSection for WorkflowFileSection {
    fn order(&self) -> i32 {
        105
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let Some(path) = &ctx.workflow_path else {
            return Ok(String::new());
        };
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        Ok(format!("File: {}", absolute.display()))
    }
}

/// The workflow's description, indented two spaces per line.
pub struct WorkflowDescriptionSection;

#[async_trait]
impl ReportSection for WorkflowDescriptionSection {
    fn order(&self) -> i32 {
        110
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let description = ctx
            .workflow
            .as_ref()
            .and_then(|workflow| workflow.description.as_deref())
            .unwrap_or_default();
        if description.is_empty() {
            return Ok(String::new());
        }
        Ok(description
            .lines()
            .map(|line| format!("  {line}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::workflow::Workflow;
    use drover_store::{LogHandle, LogStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn context(dir: &TempDir, workflow: Option<Workflow>) -> ReportContext {
        let store = LogStore::open(dir.path().join("log.db")).await.unwrap();
        ReportContext {
            log: LogHandle::Embedded(store),
            session_id: 1,
            workflow: workflow.map(Arc::new),
            workflow_path: Some(dir.path().join("deploy.yaml")),
        }
    }

    fn workflow() -> Workflow {
        Workflow {
            name: "deploy".to_string(),
            description: Some("line one\nline two".to_string()),
            initial_state: "end".to_string(),
            transitions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_name_prefers_workflow() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, Some(workflow())).await;
        assert_eq!(
            WorkflowNameSection.generate(&ctx).await.unwrap(),
            "Workflow: deploy"
        );
    }

    #[tokio::test]
    async fn test_name_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, None).await;
        assert_eq!(
            WorkflowNameSection.generate(&ctx).await.unwrap(),
            "Workflow: deploy.yaml"
        );
    }

    #[tokio::test]
    async fn test_description_is_indented() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, Some(workflow())).await;
        assert_eq!(
            WorkflowDescriptionSection.generate(&ctx).await.unwrap(),
            "  line one\n  line two"
        );
    }

    #[tokio::test]
    async fn test_missing_description_suppresses_section() {
        let dir = TempDir::new().unwrap();
        let mut wf = workflow();
        wf.description = None;
        let ctx = context(&dir, Some(wf)).await;
        assert!(WorkflowDescriptionSection
            .generate(&ctx)
            .await
            .unwrap()
            .is_empty());
    }
}
