//! The guarded state-machine interpreter.

mod engine;
mod local;
mod outcome;

pub use engine::{
    Interpreter, DEFAULT_MAX_STEPS, SUB_WORKFLOW_ACTOR, SUB_WORKFLOW_MAX_STEPS,
    TRANSITION_EXCERPT_LINES,
};
pub use engine::TransitionHook;
pub use local::{share, LocalActions, SharedLocalActions};
pub use outcome::StepOutcome;
