//! # drover-core - Workflow execution engine
//!
//! The heart of drover: given a parsed inventory and a workflow document
//! (a state machine with guarded transitions invoking named actions on
//! named actors), drive every target host through the state machine
//! concurrently, streaming multiplexed output and recording a durable,
//! queryable execution log.
//!
//! # The moving parts
//!
//! - [`workflow`] - the document model, loaders (YAML/JSON/XML), and
//!   structural validation
//! - [`interpreter`] - the guarded state-machine executor with bounded
//!   steps, hooks, and sub-workflow recursion
//! - [`actors`] - the distinguished actors every run registers:
//!   `outputMultiplexer`, `nodeGroup`, `subWorkflow`, `env`, `loader`,
//!   and one `node-<hostname>` actor per target
//! - [`output`] - the broadcast accumulator tree feeding console, file,
//!   and database sinks
//! - [`report`] - post-run report sections materialized from the log
//!   database
//! - [`launch`] - the end-to-end run pipeline the CLI calls into
//!
//! # Control flow of one run
//!
//! ```text
//! CLI -> ActorSystem -> nodeGroup.createNodeActors
//!                    -> nodeGroup.applyWorkflowToAllNodes(path)
//!                    -> nodeGroup.runUntilEnd(max_steps)
//!                         |  one Interpreter per node, in parallel
//!                         v
//!                    outputMultiplexer -> console / file / database
//!                    LogStore          -> Reporter -> final report
//! ```

pub mod actors;
pub mod context;
pub mod cow;
pub mod error;
pub mod interpreter;
pub mod inventory;
pub mod launch;
pub mod output;
pub mod render;
pub mod report;
pub mod workflow;

// Re-export commonly used types
pub use context::RuntimeContext;
pub use error::EngineError;
pub use interpreter::{
    Interpreter, LocalActions, StepOutcome, DEFAULT_MAX_STEPS, SUB_WORKFLOW_MAX_STEPS,
};
pub use inventory::Inventory;
pub use launch::{execute_run, RunOptions, RunOutcome};
pub use workflow::{list_workflows, load_workflow, Workflow};
