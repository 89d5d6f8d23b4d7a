//! The run pipeline: everything between "CLI parsed" and "exit code".
//!
//! Builds the actor system, opens the session, wires the output sinks,
//! fans the workflow out over the node group, publishes the report, and
//! tears everything down in order.

// Layer 1: Standard library
use std::path::PathBuf;
use std::sync::Arc;

// Layer 2: Third-party
use drover_actor::{
    encode_args, ActorFactory, ActorSystem, LoaderActor, SystemConfig,
};
use drover_shell::HostLimit;
use drover_store::{
    discover_service, LogHandle, LogLevel, LogStore, NewSession, RemoteStore, SessionContext,
    SessionStatus, SERVICE_PORT_BASE, SERVICE_PORT_END,
};

// Layer 3: Internal
use crate::actors::{
    EnvActor, NodeGroupActor, OutputMultiplexerActor, SubWorkflowActor, ENV, LOADER, NODE_GROUP,
    OUTPUT_MULTIPLEXER,
};
use crate::context::RuntimeContext;
use crate::cow;
use crate::error::EngineError;
use crate::interpreter::{DEFAULT_MAX_STEPS, SUB_WORKFLOW_ACTOR};
use crate::inventory::Inventory;
use crate::output::{ConsoleAccumulator, DatabaseAccumulator, FileAccumulator, Multiplexer};
use crate::report::{ReportContext, Reporter};
use crate::workflow::load_workflow;

/// Everything the `run` subcommand decides.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding workflow documents.
    pub workflow_dir: PathBuf,

    /// Workflow file, relative to `workflow_dir` unless absolute.
    pub workflow: String,

    /// Inventory file; defaults to `<dir>/hosts.ini`, falling back to a
    /// single implicit `localhost` node.
    pub inventory: Option<PathBuf>,

    /// Overlay name recorded on the session and passed to the loader.
    pub overlay: Option<String>,

    /// User worker pool width.
    pub threads: usize,

    /// Step budget for the top-level run.
    pub max_steps: u64,

    /// Suppress console output (entries are still counted).
    pub quiet: bool,

    /// Append console-equivalent output to this file.
    pub file_log: Option<PathBuf>,

    /// Log database; `None` disables structured logging.
    pub log_db: Option<PathBuf>,

    /// Password applied to hosts that have none (`--ask-pass`).
    pub password: Option<String>,

    /// Comma-separated host restriction.
    pub limit: Option<String>,

    /// Custom cow body for the run banner; `Some` enables the banner.
    pub cowfile: Option<PathBuf>,
}

impl RunOptions {
    /// Defaults matching the CLI's.
    pub fn new(workflow_dir: impl Into<PathBuf>, workflow: impl Into<String>) -> Self {
        Self {
            workflow_dir: workflow_dir.into(),
            workflow: workflow.into(),
            inventory: None,
            overlay: None,
            threads: 4,
            max_steps: DEFAULT_MAX_STEPS,
            quiet: false,
            file_log: None,
            log_db: None,
            password: None,
            limit: None,
            cowfile: None,
        }
    }
}

/// What the run pipeline tells the CLI.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub reason: String,
    pub session_id: Option<i64>,
}

/// Execute one workflow run end to end.
///
/// Configuration problems (missing files, empty host selection) surface
/// as `Err` before a session opens; workflow failures surface as an `Ok`
/// outcome with `success = false` and a `FAILED` session.
pub async fn execute_run(options: RunOptions) -> Result<RunOutcome, EngineError> {
    let workflow_path = resolve_workflow_path(&options);
    if !workflow_path.is_file() {
        return Err(EngineError::workflow_read(
            workflow_path.display().to_string(),
            "no such file",
        ));
    }

    let inventory = load_inventory(&options)?;
    let limit = options.limit.as_deref().and_then(HostLimit::parse);

    let system = ActorSystem::new(SystemConfig::with_user_workers(options.threads));

    // The log destination: a cooperating log service when one already
    // serves this database, the embedded store otherwise.
    let log = match &options.log_db {
        None => None,
        Some(db_path) => Some(open_log(db_path, &system).await?),
    };

    let session_id = match &log {
        None => 0,
        Some(log) => {
            log.open_session(NewSession {
                workflow_name: options.workflow.clone(),
                overlay_name: options.overlay.clone(),
                inventory_name: Some(inventory.name().to_string()),
                node_count: inventory.len() as i64,
                context: capture_context(),
            })
            .await?
        }
    };

    let ctx = RuntimeContext::new(system.downgrade(), log.clone(), session_id);

    register_actors(&system, &ctx, &options, &inventory, limit, session_id)?;

    if let Some(cowfile) = &options.cowfile {
        let banner = match std::fs::read_to_string(cowfile) {
            Ok(body) => cow::cowsay_with(&body, &options.workflow),
            Err(_) => cow::cowsay(&options.workflow),
        };
        ctx.emit("cli", "cowsay", &banner).await;
    }

    ctx.log_message(
        "cli",
        LogLevel::Info,
        format!("run start: {}", workflow_path.display()),
    )
    .await;

    let outcome = drive(&ctx, &workflow_path, options.max_steps).await;

    // Report from the database before the session closes; flush first so
    // the sections see every record the run produced.
    if let Some(log) = &log {
        if let Err(error) = log.flush().await {
            tracing::warn!(%error, "pre-report flush failed");
        }
        let workflow = load_workflow(&workflow_path).ok().map(Arc::new);
        let report_ctx = ReportContext {
            log: log.clone(),
            session_id,
            workflow,
            workflow_path: Some(workflow_path.clone()),
        };
        if let Err(error) = Reporter::standard().publish(&report_ctx, &ctx).await {
            tracing::warn!(%error, "report generation failed");
        }
    }

    let status = if outcome.success {
        SessionStatus::Completed
    } else {
        SessionStatus::Failed
    };
    if let Some(log) = &log {
        if let Err(error) = log.end_session(session_id, status).await {
            tracing::error!(%error, "closing session failed");
        }
    }

    // Flush file sinks, then stop everything.
    let _ = system
        .call_by_action_name(OUTPUT_MULTIPLEXER, "close", "[]")
        .await;
    if let Some(log) = &log {
        if let Err(error) = log.close().await {
            tracing::error!(%error, "closing log store failed");
        }
    }
    if let Err(error) = system.shutdown().await {
        tracing::warn!(%error, "actor system shutdown");
    }

    Ok(RunOutcome {
        success: outcome.success,
        reason: outcome.reason,
        session_id: (session_id != 0).then_some(session_id),
    })
}

struct DriveOutcome {
    success: bool,
    reason: String,
}

/// The node-group conversation: create, load, run.
async fn drive(ctx: &RuntimeContext, workflow_path: &std::path::Path, max_steps: u64) -> DriveOutcome {
    let created = ctx.call(NODE_GROUP, "createNodeActors", "[]").await;
    if !created.success {
        return DriveOutcome {
            success: false,
            reason: created.result,
        };
    }

    let path_arg = encode_args(&[workflow_path.display().to_string().as_str()]);
    let loaded = ctx
        .call(NODE_GROUP, "applyWorkflowToAllNodes", &path_arg)
        .await;
    if !loaded.success {
        return DriveOutcome {
            success: false,
            reason: loaded.result,
        };
    }

    let max_arg = encode_args(&[max_steps.to_string().as_str()]);
    let ran = ctx.call(NODE_GROUP, "runUntilEnd", &max_arg).await;
    DriveOutcome {
        success: ran.success,
        reason: ran.result,
    }
}

fn resolve_workflow_path(options: &RunOptions) -> PathBuf {
    let path = PathBuf::from(&options.workflow);
    if path.is_absolute() {
        path
    } else {
        options.workflow_dir.join(path)
    }
}

fn load_inventory(options: &RunOptions) -> Result<Inventory, EngineError> {
    if let Some(path) = &options.inventory {
        let mut inventory = Inventory::load(path)?;
        apply_password(&mut inventory, options);
        return Ok(inventory);
    }

    let default_path = options.workflow_dir.join("hosts.ini");
    if default_path.is_file() {
        let mut inventory = Inventory::load(&default_path)?;
        apply_password(&mut inventory, options);
        return Ok(inventory);
    }

    // No inventory means drive this machine.
    Inventory::parse("localhost", "localhost\n")
}

fn apply_password(inventory: &mut Inventory, options: &RunOptions) {
    if let Some(password) = &options.password {
        inventory.apply_default_password(password);
    }
}

fn register_actors(
    system: &ActorSystem,
    ctx: &RuntimeContext,
    options: &RunOptions,
    inventory: &Inventory,
    limit: Option<HostLimit>,
    session_id: i64,
) -> Result<(), EngineError> {
    let mut multiplexer = Multiplexer::new();
    multiplexer.push(Box::new(if options.quiet {
        ConsoleAccumulator::quiet()
    } else {
        ConsoleAccumulator::new()
    }));
    if let Some(path) = &options.file_log {
        multiplexer.push(Box::new(FileAccumulator::open(path)?));
    }
    if let Some(log) = ctx.log() {
        multiplexer.push(Box::new(DatabaseAccumulator::new(log.clone(), session_id)));
    }

    system.register(
        OUTPUT_MULTIPLEXER,
        Box::new(OutputMultiplexerActor::new(multiplexer)),
    )?;
    system.register(ENV, Box::new(EnvActor::new()))?;
    system.register(
        SUB_WORKFLOW_ACTOR,
        Box::new(SubWorkflowActor::new(
            ctx.clone(),
            Some(options.workflow_dir.clone()),
        )),
    )?;

    let factory = ActorFactory::new();
    factory.register_kind("envProbe", |_args| Ok(Box::new(EnvActor::new())));
    let overlay_dir = options
        .overlay
        .as_ref()
        .map(|overlay| options.workflow_dir.join(overlay));
    system.register(LOADER, Box::new(LoaderActor::new(factory, overlay_dir)))?;

    let node_group = NodeGroupActor::new(ctx.clone(), inventory.clone(), limit)
        .with_base_dir(options.workflow_dir.clone())
        .with_max_steps(options.max_steps);
    system.register(NODE_GROUP, Box::new(node_group))?;

    Ok(())
}

/// Best-effort execution context for the session row.
fn capture_context() -> SessionContext {
    SessionContext {
        cwd: std::env::current_dir()
            .ok()
            .map(|cwd| cwd.display().to_string()),
        git_commit: git(&["rev-parse", "HEAD"]),
        git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
        command_line: Some(
            std::env::args().collect::<Vec<_>>().join(" "),
        ),
        tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        tool_commit: option_env!("DROVER_BUILD_COMMIT").map(str::to_string),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = std::process::Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

async fn open_log(db_path: &std::path::Path, system: &ActorSystem) -> Result<LogHandle, EngineError> {
    if let Some(info) = discover_service(db_path, SERVICE_PORT_BASE..=SERVICE_PORT_END).await {
        tracing::info!(port = info.port, "joining running log service");
        let remote = RemoteStore::connect(format!("127.0.0.1:{}", info.port)).await?;
        return Ok(LogHandle::Remote(Arc::new(remote)));
    }
    let store = LogStore::open_with_pool(db_path, system.db_pool().clone()).await?;
    Ok(LogHandle::Embedded(store))
}
