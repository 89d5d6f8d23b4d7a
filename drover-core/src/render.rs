//! Graphviz rendering of a workflow's state machine.

// Layer 3: Internal
use crate::workflow::Workflow;

/// Render the workflow as a DOT digraph.
///
/// Edges carry the transition label when present; guarded transitions are
/// drawn dashed so conditional paths stand out.
pub fn workflow_to_dot(workflow: &Workflow) -> String {
    let mut out = String::new();
    out.push_str(&format!("digraph \"{}\" {{\n", escape(&workflow.name)));
    out.push_str("  rankdir=LR;\n");
    out.push_str(&format!(
        "  \"{}\" [shape=circle, style=bold];\n",
        escape(&workflow.initial_state)
    ));

    for state in workflow.states() {
        if Workflow::is_terminal(state) {
            out.push_str(&format!("  \"{}\" [shape=doublecircle];\n", escape(state)));
        }
    }

    for transition in &workflow.transitions {
        let mut attributes = Vec::new();
        if let Some(label) = &transition.label {
            attributes.push(format!("label=\"{}\"", escape(label)));
        }
        if !transition.guards.is_empty() {
            attributes.push("style=dashed".to_string());
        }
        let attribute_list = if attributes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", attributes.join(", "))
        };
        out.push_str(&format!(
            "  \"{}\" -> \"{}\"{};\n",
            escape(&transition.from),
            escape(&transition.to),
            attribute_list
        ));
    }

    out.push_str("}\n");
    out
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Guard, Transition};

    #[test]
    fn test_dot_shape() {
        let workflow = Workflow {
            name: "demo".to_string(),
            description: None,
            initial_state: "0".to_string(),
            transitions: vec![Transition {
                from: "0".to_string(),
                to: "end".to_string(),
                guards: vec![Guard {
                    actor: "env".to_string(),
                    method: "has".to_string(),
                    arguments: vec!["A".to_string()],
                    expect: Some("true".to_string()),
                }],
                actions: Vec::new(),
                label: Some("gated".to_string()),
                note: None,
            }],
        };

        let dot = workflow_to_dot(&workflow);
        assert!(dot.starts_with("digraph \"demo\""));
        assert!(dot.contains("\"0\" -> \"end\" [label=\"gated\", style=dashed];"));
        assert!(dot.contains("\"end\" [shape=doublecircle];"));
    }
}
