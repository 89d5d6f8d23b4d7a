//! Reading workflow documents from disk.
//!
//! YAML, JSON, and XML all deserialize into one raw document shape and are
//! then normalized: `steps` and `transitions` are aliases, a missing
//! `name` falls back to the file stem, and a missing `initial_state` falls
//! back to the first transition's `from`.

// Layer 1: Standard library
use std::path::{Path, PathBuf};

// Layer 2: Third-party
use serde::Deserialize;
use walkdir::WalkDir;

// Layer 3: Internal
use super::model::{ActionSpec, Guard, Transition, Workflow};
use crate::error::EngineError;

/// Recognized workflow document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowFormat {
    Yaml,
    Json,
    Xml,
}

/// Map a path's extension to its format.
pub fn workflow_format(path: &Path) -> Option<WorkflowFormat> {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("yaml") | Some("yml") => Some(WorkflowFormat::Yaml),
        Some("json") => Some(WorkflowFormat::Json),
        Some("xml") => Some(WorkflowFormat::Xml),
        _ => None,
    }
}

/// Raw document shape shared by all three formats.
#[derive(Debug, Deserialize)]
struct WorkflowDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    initial_state: Option<String>,
    #[serde(default, alias = "steps")]
    transitions: Vec<TransitionDoc>,
}

#[derive(Debug, Deserialize)]
struct TransitionDoc {
    // A two-element sequence [from, to]; XML repeats the element instead.
    states: Vec<String>,
    #[serde(default)]
    guards: Vec<GuardDoc>,
    #[serde(default)]
    actions: Vec<ActionDoc>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuardDoc {
    actor: String,
    method: String,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    expect: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionDoc {
    actor: String,
    method: String,
    #[serde(default)]
    arguments: Vec<String>,
}

/// Load and validate a workflow document.
pub fn load_workflow(path: &Path) -> Result<Workflow, EngineError> {
    let format = workflow_format(path).ok_or_else(|| {
        EngineError::UnsupportedFormat(path.display().to_string())
    })?;

    let text = std::fs::read_to_string(path)
        .map_err(|error| EngineError::workflow_read(path.display().to_string(), error.to_string()))?;

    let doc: WorkflowDoc = match format {
        WorkflowFormat::Yaml => serde_yaml::from_str(&text).map_err(|error| {
            EngineError::workflow_parse(path.display().to_string(), error.to_string())
        })?,
        WorkflowFormat::Json => serde_json::from_str(&text).map_err(|error| {
            EngineError::workflow_parse(path.display().to_string(), error.to_string())
        })?,
        WorkflowFormat::Xml => quick_xml::de::from_str(&text).map_err(|error| {
            EngineError::workflow_parse(path.display().to_string(), error.to_string())
        })?,
    };

    let workflow = normalize(doc, path)?;
    workflow.validate()?;
    Ok(workflow)
}

fn normalize(doc: WorkflowDoc, path: &Path) -> Result<Workflow, EngineError> {
    let name = doc.name.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workflow".to_string())
    });

    let mut transitions = Vec::with_capacity(doc.transitions.len());
    for (index, transition) in doc.transitions.into_iter().enumerate() {
        let [from, to] = transition.states.as_slice() else {
            return Err(EngineError::workflow_invalid(
                &name,
                format!(
                    "transition #{} needs states [from, to], got {} entries",
                    index + 1,
                    transition.states.len()
                ),
            ));
        };
        transitions.push(Transition {
            from: from.clone(),
            to: to.clone(),
            guards: transition
                .guards
                .into_iter()
                .map(|guard| Guard {
                    actor: guard.actor,
                    method: guard.method,
                    arguments: guard.arguments,
                    expect: guard.expect,
                })
                .collect(),
            actions: transition
                .actions
                .into_iter()
                .map(|action| ActionSpec {
                    actor: action.actor,
                    method: action.method,
                    arguments: action.arguments,
                })
                .collect(),
            label: transition.label,
            note: transition.note,
        });
    }

    let initial_state = match doc.initial_state {
        Some(state) if !state.is_empty() => state,
        _ => transitions
            .first()
            .map(|transition| transition.from.clone())
            .ok_or_else(|| {
                EngineError::workflow_invalid(&name, "no initial_state and no transitions")
            })?,
    };

    Ok(Workflow {
        name,
        description: doc.description,
        initial_state,
        transitions,
    })
}

/// Workflow documents under `dir`, sorted by path.
pub fn list_workflows(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if !dir.is_dir() {
        return Err(EngineError::workflow_read(
            dir.display().to_string(),
            "not a directory",
        ));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| workflow_format(path).is_some())
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LINEAR_YAML: &str = r#"
name: linear
description: two hops to the end
initial_state: "0"
transitions:
  - states: ["0", "1"]
    actions:
      - actor: subWorkflow
        method: doNothing
    label: first hop
  - states: ["1", "end"]
    actions:
      - actor: subWorkflow
        method: doNothing
"#;

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("linear.yaml");
        fs::write(&path, LINEAR_YAML).unwrap();

        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.name, "linear");
        assert_eq!(workflow.initial_state, "0");
        assert_eq!(workflow.transitions.len(), 2);
        assert_eq!(workflow.transitions[0].label.as_deref(), Some("first hop"));
    }

    #[test]
    fn test_steps_alias_and_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("implicit.yml");
        fs::write(
            &path,
            r#"
steps:
  - states: ["boot", "end"]
"#,
        )
        .unwrap();

        let workflow = load_workflow(&path).unwrap();
        // Name falls back to the file stem, initial state to the first from.
        assert_eq!(workflow.name, "implicit");
        assert_eq!(workflow.initial_state, "boot");
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.json");
        fs::write(
            &path,
            r#"{
  "name": "from-json",
  "transitions": [
    {"states": ["0", "end"], "actions": [{"actor": "env", "method": "get", "arguments": ["HOME"]}]}
  ]
}"#,
        )
        .unwrap();

        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.name, "from-json");
        assert_eq!(workflow.transitions[0].actions[0].qualified_name(), "env.get");
    }

    #[test]
    fn test_load_xml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.xml");
        fs::write(
            &path,
            r#"<workflow>
  <name>from-xml</name>
  <initial_state>0</initial_state>
  <transitions>
    <states>0</states>
    <states>end</states>
  </transitions>
</workflow>"#,
        )
        .unwrap();

        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.name, "from-xml");
        assert_eq!(workflow.transitions[0].to, "end");
    }

    #[test]
    fn test_bad_states_arity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "transitions:\n  - states: [\"only-one\"]\n").unwrap();
        assert!(matches!(
            load_workflow(&path),
            Err(EngineError::WorkflowInvalid { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.toml");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            load_workflow(&path),
            Err(EngineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_list_workflows_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.yaml"), LINEAR_YAML).unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.yml"), LINEAR_YAML).unwrap();

        let paths = list_workflows(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.yaml", "c.yml"]);
    }
}
