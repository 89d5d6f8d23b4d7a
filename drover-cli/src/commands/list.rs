//! `drover list` - enumerate workflow documents.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use drover_core::list_workflows;

// Layer 3: Internal
use crate::error::Result;

#[derive(Args)]
pub struct ListArgs {
    /// Directory to scan for .yaml|.yml|.json|.xml workflows
    #[arg(long)]
    dir: PathBuf,
}

pub async fn execute(args: ListArgs) -> Result<()> {
    let paths = list_workflows(&args.dir)?;
    if paths.is_empty() {
        println!("no workflows under {}", args.dir.display());
        return Ok(());
    }
    for path in paths {
        let shown = path.strip_prefix(&args.dir).unwrap_or(&path);
        println!("{}", shown.display());
    }
    Ok(())
}
