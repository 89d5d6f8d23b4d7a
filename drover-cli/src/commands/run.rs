//! `drover run` - execute a workflow.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use dialoguer::Password;
use drover_core::{execute_run, load_workflow, render, RunOptions};

// Layer 3: Internal
use crate::error::{CliError, Result};

#[derive(Args)]
pub struct RunArgs {
    /// Directory holding workflow documents
    #[arg(long)]
    dir: PathBuf,

    /// Workflow file, relative to --dir unless absolute
    #[arg(long)]
    workflow: String,

    /// Inventory file (default: <dir>/hosts.ini, else implicit localhost)
    #[arg(long)]
    inventory: Option<PathBuf>,

    /// Overlay name recorded on the session
    #[arg(long)]
    overlay: Option<String>,

    /// Worker pool width
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Step budget for the run
    #[arg(long, default_value_t = 10_000)]
    max_steps: u64,

    /// Append console output to this file
    #[arg(long, default_value = "drover-run.log")]
    file_log: PathBuf,

    /// Disable the file log
    #[arg(long)]
    no_file_log: bool,

    /// Log database path
    #[arg(long, default_value = "drover-logs.db")]
    log_db: PathBuf,

    /// Disable the log database
    #[arg(long)]
    no_log_db: bool,

    /// Prompt for an SSH password applied to hosts without one
    #[arg(long)]
    ask_pass: bool,

    /// Comma-separated host restriction
    #[arg(long)]
    limit: Option<String>,

    /// Suppress console output (entries are still counted)
    #[arg(long)]
    quiet: bool,

    /// Announce the run with a cowsay banner from this cow body file
    #[arg(long)]
    cowfile: Option<PathBuf>,

    /// Write a Graphviz rendering of the workflow and exit
    #[arg(long)]
    render_to: Option<PathBuf>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let mut options = RunOptions::new(&args.dir, &args.workflow);
    options.inventory = args.inventory;
    options.overlay = args.overlay;
    options.threads = args.threads;
    options.max_steps = args.max_steps;
    options.quiet = args.quiet;
    options.limit = args.limit;
    options.cowfile = args.cowfile;
    options.file_log = (!args.no_file_log).then_some(args.file_log);
    options.log_db = (!args.no_log_db).then_some(args.log_db);

    if let Some(render_target) = args.render_to {
        let workflow_path = if PathBuf::from(&args.workflow).is_absolute() {
            PathBuf::from(&args.workflow)
        } else {
            args.dir.join(&args.workflow)
        };
        let workflow = load_workflow(&workflow_path)?;
        std::fs::write(&render_target, render::workflow_to_dot(&workflow))?;
        println!("rendered {} to {}", workflow.name, render_target.display());
        return Ok(());
    }

    if args.ask_pass {
        let password = Password::new()
            .with_prompt("SSH password")
            .interact()
            .map_err(|error| CliError::config(format!("password prompt failed: {error}")))?;
        options.password = Some(password);
    }

    let outcome = execute_run(options).await?;
    if let Some(session_id) = outcome.session_id {
        eprintln!("session {session_id}");
    }
    if outcome.success {
        Ok(())
    } else {
        Err(CliError::WorkflowFailed(outcome.reason))
    }
}
