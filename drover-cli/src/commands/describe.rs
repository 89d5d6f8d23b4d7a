//! `drover describe` - inspect a workflow document.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use drover_core::load_workflow;

// Layer 3: Internal
use crate::error::Result;

#[derive(Args)]
pub struct DescribeArgs {
    /// Directory holding workflow documents
    #[arg(long)]
    dir: PathBuf,

    /// Workflow file, relative to --dir unless absolute
    #[arg(long)]
    workflow: String,

    /// Also print each transition with its label and note
    #[arg(long)]
    steps: bool,
}

pub async fn execute(args: DescribeArgs) -> Result<()> {
    let path = if PathBuf::from(&args.workflow).is_absolute() {
        PathBuf::from(&args.workflow)
    } else {
        args.dir.join(&args.workflow)
    };
    let workflow = load_workflow(&path)?;
    let absolute = std::fs::canonicalize(&path).unwrap_or(path);

    println!("name:  {}", workflow.name);
    println!("path:  {}", absolute.display());
    println!("start: {}", workflow.initial_state);
    if let Some(description) = &workflow.description {
        println!("description:");
        for line in description.lines() {
            println!("  {line}");
        }
    }

    if args.steps {
        println!("steps:");
        for (index, transition) in workflow.transitions.iter().enumerate() {
            let label = transition
                .label
                .as_deref()
                .map(|label| format!(" ({label})"))
                .unwrap_or_default();
            println!(
                "  {:>3}. {} -> {}{}",
                index + 1,
                transition.from,
                transition.to,
                label
            );
            if let Some(note) = &transition.note {
                println!("       note: {note}");
            }
            for guard in &transition.guards {
                println!(
                    "       guard: {}.{}({})",
                    guard.actor,
                    guard.method,
                    guard.arguments.join(", ")
                );
            }
            for action in &transition.actions {
                println!(
                    "       action: {}({})",
                    action.qualified_name(),
                    action.arguments.join(", ")
                );
            }
        }
    }
    Ok(())
}
