//! `drover db-clear` - delete a log database.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use drover_store::{discover_service, SERVICE_PORT_BASE, SERVICE_PORT_END};

// Layer 3: Internal
use crate::error::{CliError, Result};

#[derive(Args)]
pub struct ClearArgs {
    /// Log database to delete
    #[arg(long)]
    db: PathBuf,

    /// Delete even if a log service currently holds the database
    #[arg(long)]
    force: bool,
}

pub async fn execute(args: ClearArgs) -> Result<()> {
    if !args.db.exists() {
        return Err(CliError::config(format!(
            "no database at {}",
            args.db.display()
        )));
    }

    if !args.force {
        if let Some(info) = discover_service(&args.db, SERVICE_PORT_BASE..=SERVICE_PORT_END).await {
            return Err(CliError::runtime(format!(
                "a log service on port {} holds {}; stop it or pass --force",
                info.port, info.db_path
            )));
        }
    }

    // The main file plus SQLite's WAL side files.
    let mut removed = Vec::new();
    for path in side_files(&args.db) {
        if path.exists() {
            std::fs::remove_file(&path)?;
            removed.push(path);
        }
    }

    for path in &removed {
        println!("removed {}", path.display());
    }
    Ok(())
}

fn side_files(db: &std::path::Path) -> Vec<PathBuf> {
    let base = db.display().to_string();
    vec![
        db.to_path_buf(),
        PathBuf::from(format!("{base}-wal")),
        PathBuf::from(format!("{base}-shm")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_files() {
        let files = side_files(std::path::Path::new("/tmp/run.db"));
        let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(
            names,
            vec!["/tmp/run.db", "/tmp/run.db-wal", "/tmp/run.db-shm"]
        );
    }
}
