//! `drover logs` - query the execution log database.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use drover_store::{LogLevel, LogReader, LogRecord, Session, SessionFilter};
use regex::Regex;

// Layer 3: Internal
use crate::error::{CliError, Result};

#[derive(Args)]
pub struct LogsArgs {
    /// Log database path
    #[arg(long)]
    db: PathBuf,

    /// Session id (default: the latest session)
    #[arg(long)]
    session: Option<i64>,

    /// Only records from this node id
    #[arg(long)]
    node: Option<String>,

    /// Minimum level (DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    level: Option<String>,

    /// Cap the number of rows printed
    #[arg(long)]
    limit: Option<usize>,

    /// List sessions instead of records
    #[arg(long)]
    list: bool,

    /// List node ids in the session
    #[arg(long)]
    list_nodes: bool,

    /// Print the session summary
    #[arg(long)]
    summary: bool,

    /// Filter sessions by workflow name (implies --list)
    #[arg(long)]
    workflow: Option<String>,

    /// Filter sessions by overlay name (implies --list)
    #[arg(long)]
    overlay: Option<String>,

    /// Filter sessions by inventory name (implies --list)
    #[arg(long)]
    inventory: Option<String>,

    /// Sessions started after this RFC 3339 timestamp (implies --list)
    #[arg(long)]
    after: Option<String>,

    /// Sessions started within a window like 4h, 2d, 1w (implies --list)
    #[arg(long)]
    since: Option<String>,

    /// Sessions ended within a window like 4h, 2d, 1w (implies --list)
    #[arg(long)]
    ended_since: Option<String>,
}

pub async fn execute(args: LogsArgs) -> Result<()> {
    if !args.db.exists() {
        return Err(CliError::config(format!(
            "no database at {}",
            args.db.display()
        )));
    }
    let reader = LogReader::open(&args.db).await?;

    let listing = args.list
        || args.workflow.is_some()
        || args.overlay.is_some()
        || args.inventory.is_some()
        || args.after.is_some()
        || args.since.is_some()
        || args.ended_since.is_some();

    if listing {
        let filter = SessionFilter {
            workflow_name: args.workflow.clone(),
            overlay_name: args.overlay.clone(),
            inventory_name: args.inventory.clone(),
            started_after: started_after(&args)?,
            ended_after: args
                .ended_since
                .as_deref()
                .map(parse_window)
                .transpose()?
                .map(|window| Utc::now() - window),
            limit: args.limit,
        };
        for session in reader.list_sessions_filtered(&filter).await? {
            print_session(&session);
        }
        return Ok(());
    }

    let session_id = match args.session {
        Some(session_id) => session_id,
        None => reader
            .latest_session_id()
            .await?
            .ok_or_else(|| CliError::runtime("database has no sessions"))?,
    };

    if args.summary {
        let summary = reader.summary(session_id).await?;
        print_session(&summary.session);
        println!(
            "nodes: {} ({} success, {} failed)",
            summary.nodes_total, summary.nodes_success, summary.nodes_failed
        );
        println!(
            "records: {} ({} errors, {} warnings)",
            summary.log_count, summary.error_count, summary.warn_count
        );
        for result in reader.node_results(session_id).await? {
            let reason = result
                .reason
                .as_deref()
                .map(|reason| format!(" - {reason}"))
                .unwrap_or_default();
            println!("  {} {}{}", result.status, result.node_id, reason);
        }
        return Ok(());
    }

    if args.list_nodes {
        for node in reader.nodes_in_session(session_id).await? {
            println!("{node}");
        }
        return Ok(());
    }

    let records = match (&args.node, &args.level) {
        (Some(node), _) => reader.logs_by_node(session_id, node).await?,
        (None, Some(level)) => {
            let level: LogLevel = level
                .parse()
                .map_err(|reason: String| CliError::config(reason))?;
            reader.logs_by_level(session_id, level).await?
        }
        (None, None) => reader.logs_in_session(session_id).await?,
    };

    // --node and --level compose; --node wins the query, --level trims.
    let min_level = match (&args.node, &args.level) {
        (Some(_), Some(level)) => Some(
            level
                .parse::<LogLevel>()
                .map_err(|reason: String| CliError::config(reason))?,
        ),
        _ => None,
    };

    let mut printed = 0usize;
    for record in &records {
        if let Some(min_level) = min_level {
            if record.level < min_level {
                continue;
            }
        }
        if let Some(limit) = args.limit {
            if printed >= limit {
                break;
            }
        }
        print_record(record);
        printed += 1;
    }
    Ok(())
}

fn started_after(args: &LogsArgs) -> Result<Option<DateTime<Utc>>> {
    if let Some(after) = &args.after {
        let parsed = DateTime::parse_from_rfc3339(after)
            .map_err(|error| CliError::config(format!("bad --after timestamp: {error}")))?;
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    if let Some(since) = &args.since {
        return Ok(Some(Utc::now() - parse_window(since)?));
    }
    Ok(None)
}

/// Parse `4h` / `2d` / `1w` windows.
fn parse_window(raw: &str) -> Result<Duration> {
    #[allow(clippy::unwrap_used)] // literal pattern
    let pattern = Regex::new(r"^(\d+)([hdw])$").unwrap();
    let capture = pattern
        .captures(raw.trim())
        .ok_or_else(|| CliError::config(format!("bad window '{raw}': expected Nh, Nd, or Nw")))?;
    let count: i64 = capture[1]
        .parse()
        .map_err(|_| CliError::config(format!("bad window '{raw}'")))?;
    Ok(match &capture[2] {
        "h" => Duration::hours(count),
        "d" => Duration::days(count),
        _ => Duration::weeks(count),
    })
}

fn print_session(session: &Session) {
    let ended = session
        .ended_at
        .map(|ended_at| ended_at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>5}  {}  {:<9}  {:>3} nodes  {}  {}",
        session.id,
        session.started_at.format("%Y-%m-%d %H:%M:%S"),
        session.status,
        session.node_count,
        ended,
        session.workflow_name,
    );
}

fn print_record(record: &LogRecord) {
    let action = record
        .action_name
        .as_deref()
        .map(|action| format!(" {action}"))
        .unwrap_or_default();
    println!(
        "{} {:<5} {:<16}{} {}",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.level,
        record.node_id,
        action,
        record.message,
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("4h").unwrap(), Duration::hours(4));
        assert_eq!(parse_window("2d").unwrap(), Duration::days(2));
        assert_eq!(parse_window("1w").unwrap(), Duration::weeks(1));
        assert!(parse_window("soon").is_err());
        assert!(parse_window("4m").is_err());
    }
}
