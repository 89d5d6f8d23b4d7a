//! The workflow data model: a state machine with guarded transitions.

// Layer 1: Standard library
use std::collections::BTreeSet;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
use crate::error::EngineError;

/// Name of the terminal state, compared case-insensitively.
pub const TERMINAL_STATE: &str = "end";

/// A guard: an action whose result is compared against an expectation.
///
/// The guard holds iff the action reports `success = true` and, when
/// `expect` is present, the result string equals it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub actor: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

/// One side-effecting call `actor.method(arguments)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub actor: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl ActionSpec {
    /// `actor.method` form used in log records.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.actor, self.method)
    }
}

/// A directed edge of the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<Guard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Transition {
    /// Leading lines of this transition's YAML rendering, carried on log
    /// records so a report can show where an action came from.
    pub fn excerpt(&self, max_lines: usize) -> String {
        let rendered = serde_yaml::to_string(self).unwrap_or_default();
        rendered
            .lines()
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A parsed, validated workflow. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub initial_state: String,
    pub transitions: Vec<Transition>,
}

impl Workflow {
    /// Whether `state` is the terminal state.
    pub fn is_terminal(state: &str) -> bool {
        state.eq_ignore_ascii_case(TERMINAL_STATE)
    }

    /// The state set: the initial state plus every transition endpoint.
    pub fn states(&self) -> BTreeSet<&str> {
        let mut states = BTreeSet::new();
        states.insert(self.initial_state.as_str());
        for transition in &self.transitions {
            states.insert(transition.from.as_str());
            states.insert(transition.to.as_str());
        }
        states
    }

    /// Transitions leaving `state`, in declaration order.
    ///
    /// Declaration order is the tie-break rule for eligible transitions, so
    /// callers must not reorder.
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions
            .iter()
            .filter(move |transition| transition.from == state)
    }

    /// Structural validation applied after parse.
    ///
    /// Every state name must be non-empty, and every `from` must appear in
    /// the reachable state set (the initial state or some transition's
    /// `to`).
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.initial_state.is_empty() {
            return Err(EngineError::workflow_invalid(
                &self.name,
                "initial state is empty",
            ));
        }

        let mut reachable: BTreeSet<&str> = BTreeSet::new();
        reachable.insert(self.initial_state.as_str());
        for transition in &self.transitions {
            if transition.from.is_empty() || transition.to.is_empty() {
                return Err(EngineError::workflow_invalid(
                    &self.name,
                    "transition with empty state name",
                ));
            }
            reachable.insert(transition.to.as_str());
        }

        for transition in &self.transitions {
            if !reachable.contains(transition.from.as_str()) {
                return Err(EngineError::workflow_invalid(
                    &self.name,
                    format!(
                        "state '{}' is never reached (not the initial state or any transition target)",
                        transition.from
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transition(from: &str, to: &str) -> Transition {
        Transition {
            from: from.to_string(),
            to: to.to_string(),
            guards: Vec::new(),
            actions: Vec::new(),
            label: None,
            note: None,
        }
    }

    fn linear() -> Workflow {
        Workflow {
            name: "linear".to_string(),
            description: None,
            initial_state: "0".to_string(),
            transitions: vec![transition("0", "1"), transition("1", "end")],
        }
    }

    #[test]
    fn test_terminal_is_case_insensitive() {
        assert!(Workflow::is_terminal("end"));
        assert!(Workflow::is_terminal("End"));
        assert!(Workflow::is_terminal("END"));
        assert!(!Workflow::is_terminal("bend"));
    }

    #[test]
    fn test_states_collects_endpoints() {
        let workflow = linear();
        let states: Vec<&str> = workflow.states().into_iter().collect();
        assert_eq!(states, vec!["0", "1", "end"]);
    }

    #[test]
    fn test_transitions_from_keeps_declaration_order() {
        let mut workflow = linear();
        workflow.transitions.push(transition("0", "alt"));
        workflow.transitions.push(transition("alt", "end"));

        let tos: Vec<&str> = workflow
            .transitions_from("0")
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(tos, vec!["1", "alt"]);
    }

    #[test]
    fn test_validate_accepts_linear() {
        assert!(linear().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unreachable_from() {
        let mut workflow = linear();
        workflow.transitions.push(transition("orphan", "end"));
        let result = workflow.validate();
        assert!(matches!(result, Err(EngineError::WorkflowInvalid { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_state() {
        let mut workflow = linear();
        workflow.transitions[0].to = String::new();
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn test_excerpt_takes_leading_lines() {
        let transition = Transition {
            from: "0".to_string(),
            to: "1".to_string(),
            guards: Vec::new(),
            actions: vec![ActionSpec {
                actor: "subWorkflow".to_string(),
                method: "doNothing".to_string(),
                arguments: Vec::new(),
            }],
            label: Some("first".to_string()),
            note: None,
        };
        let excerpt = transition.excerpt(2);
        assert_eq!(excerpt.lines().count(), 2);
        assert!(excerpt.contains("from"));
    }

    #[test]
    fn test_qualified_name() {
        let action = ActionSpec {
            actor: "env".to_string(),
            method: "has".to_string(),
            arguments: vec!["PATH".to_string()],
        };
        assert_eq!(action.qualified_name(), "env.has");
    }
}
