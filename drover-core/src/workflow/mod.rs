//! Workflow documents: model, loading, validation.

mod loader;
mod model;

pub use loader::{list_workflows, load_workflow, workflow_format, WorkflowFormat};
pub use model::{ActionSpec, Guard, Transition, Workflow, TERMINAL_STATE};
