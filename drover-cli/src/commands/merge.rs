//! `drover log-merge` - combine log databases.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use drover_store::{merge_into, MergeOptions};

// Layer 3: Internal
use crate::error::{CliError, Result};

#[derive(Args)]
pub struct MergeArgs {
    /// Target database (created if missing)
    #[arg(long)]
    target: PathBuf,

    /// Scan a directory for .db files to merge
    #[arg(long)]
    scan: Option<PathBuf>,

    /// Source database files
    sources: Vec<PathBuf>,

    /// Count what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// Skip sessions already present (key: workflow_name|started_at)
    #[arg(long)]
    skip_duplicates: bool,
}

pub async fn execute(args: MergeArgs) -> Result<()> {
    let mut sources = args.sources.clone();
    if let Some(scan_dir) = &args.scan {
        let mut scanned: Vec<PathBuf> = std::fs::read_dir(scan_dir)
            .map_err(|error| {
                CliError::config(format!("cannot scan {}: {error}", scan_dir.display()))
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|extension| extension == "db")
                    && path != &args.target
            })
            .collect();
        scanned.sort();
        sources.extend(scanned);
    }

    if sources.is_empty() {
        return Err(CliError::config(
            "nothing to merge: pass source files or --scan DIR",
        ));
    }

    let options = MergeOptions {
        dry_run: args.dry_run,
        skip_duplicates: args.skip_duplicates,
    };
    let report = merge_into(&args.target, &sources, &options).await?;

    let prefix = if args.dry_run { "would merge" } else { "merged" };
    println!(
        "{prefix} {} sessions ({} skipped) from {} sources: {} records, {} node results",
        report.sessions_merged,
        report.sessions_skipped,
        report.sources,
        report.records_copied,
        report.node_results_copied,
    );
    Ok(())
}
