//! Daemon runtime: cron scheduler + singleton pass processor + socket server.
//!
//! The processor task is the single consumer of the pass queue, so at most
//! one pass executes at any instant. Scheduled firings that land while a
//! pass is running are skipped; manual socket requests queue behind the
//! in-flight pass and block their caller until it finishes.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use cron::Schedule;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

use stencil_core::{config, report::PassReport, state};
use stencil_sync::{
    cleanup_prefix,
    pipeline::{self, SyncScope},
};

use crate::error::{io_err, DaemonError};
use crate::job;
use crate::paths::{logs_dir, socket_path, stencil_root, DAEMON_LABEL};
use crate::protocol::{DaemonRequest, DaemonResponse};

// ---------------------------------------------------------------------------
// Pass jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum PassTarget {
    /// Every configured scan root.
    All,
    /// One explicit root (force-synchronization).
    Root(PathBuf),
    /// Prefix cleanup only, no scan.
    Prefix(String),
}

impl PassTarget {
    fn label(&self) -> String {
        match self {
            PassTarget::All => "all".to_string(),
            PassTarget::Root(root) => root.display().to_string(),
            PassTarget::Prefix(prefix) => format!("cleanup:{prefix}"),
        }
    }
}

struct PassJob {
    target: PassTarget,
    source: &'static str,
    respond_to: oneshot::Sender<Result<PassSummary, String>>,
}

/// Wire-friendly digest of one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub target: String,
    pub source: String,
    pub scanned: usize,
    pub generated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub finished_at_unix: u64,
}

#[derive(Debug, Clone, Default)]
struct RuntimeStats {
    passes: u64,
    last_pass: Option<PassSummary>,
}

// ---------------------------------------------------------------------------
// Runtime entry
// ---------------------------------------------------------------------------

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let schedule = load_schedule(&home)?;
    let stats = Arc::new(RwLock::new(RuntimeStats::default()));
    let pass_running = Arc::new(AtomicBool::new(false));
    let started_at_unix = unix_seconds_now();

    let (pass_tx, pass_rx) = mpsc::channel::<PassJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let pass_tx = pass_tx.clone();
        let pass_running = pass_running.clone();
        tokio::spawn(async move {
            let result = scheduler_task(schedule, pass_tx, pass_running, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let stats = stats.clone();
        let pass_running = pass_running.clone();
        tokio::spawn(async move {
            let result =
                pass_processor_task(home, stats, pass_running, pass_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let stats = stats.clone();
        let pass_tx = pass_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                stats,
                pass_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (scheduler_result, processor_result, socket_result, rotation_result, signal_result) =
        tokio::join!(
            scheduler_handle,
            processor_handle,
            socket_handle,
            rotation_handle,
            signal_handle
        );

    handle_join("scheduler", scheduler_result)?;
    handle_join("pass_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Resolve the cron cadence: config override, falling back to the declared
/// job definition.
fn load_schedule(home: &Path) -> Result<Schedule, DaemonError> {
    use std::str::FromStr;

    let job = job::synchronizer_job();
    match config::load_at(home)?.expression {
        Some(expression) => Ok(Schedule::from_str(&expression)?),
        None => Ok(job.schedule()?),
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

async fn scheduler_task(
    schedule: Schedule,
    pass_tx: mpsc::Sender<PassJob>,
    pass_running: Arc<AtomicBool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            tracing::warn!("cron expression has no upcoming firings, scheduler exiting");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        // Singleton: a firing that lands mid-pass is skipped, not queued.
        if pass_running.load(Ordering::SeqCst) {
            tracing::info!("pass already running, skipping this firing");
            continue;
        }

        match enqueue_pass(&pass_tx, PassTarget::All, "schedule").await {
            Ok(summary) => {
                tracing::info!(
                    scanned = summary.scanned,
                    generated = summary.generated,
                    unchanged = summary.unchanged,
                    removed = summary.removed,
                    failed = summary.failed,
                    duration_ms = summary.duration_ms,
                    "scheduled pass completed",
                );
            }
            Err(err) => {
                // Including a state-table outage: log and retry next firing.
                tracing::error!(error = %err, "scheduled pass failed");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pass processor — single consumer, so never two passes concurrently
// ---------------------------------------------------------------------------

async fn pass_processor_task(
    home: PathBuf,
    stats: Arc<RwLock<RuntimeStats>>,
    pass_running: Arc<AtomicBool>,
    mut pass_rx: mpsc::Receiver<PassJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = pass_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();

                pass_running.store(true, Ordering::SeqCst);
                let target = job.target.clone();
                let home_for_pass = home.clone();
                let result = tokio::task::spawn_blocking(move || {
                    execute_target(&home_for_pass, &target)
                })
                .await;
                // Released on every exit path, including failure.
                pass_running.store(false, Ordering::SeqCst);

                let outcome = match result {
                    Ok(Ok(report)) => {
                        let summary =
                            build_pass_summary(&job.target, job.source, &report, started.elapsed());
                        let mut guard = stats.write().await;
                        guard.passes += 1;
                        guard.last_pass = Some(summary.clone());
                        drop(guard);
                        Ok(summary)
                    }
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(err) => Err(format!("pass task join error: {err}")),
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }
    Ok(())
}

fn execute_target(home: &Path, target: &PassTarget) -> Result<PassReport, stencil_sync::SyncError> {
    match target {
        PassTarget::All => pipeline::run(home, SyncScope::All, false),
        PassTarget::Root(root) => pipeline::run(home, SyncScope::Root(root.clone()), false),
        PassTarget::Prefix(prefix) => {
            let store = state::SqliteStateStore::open_at(home)?;
            let mut report = PassReport::new(Utc::now());
            report.removed = cleanup_prefix(&store, prefix)?;
            Ok(report)
        }
    }
}

fn build_pass_summary(
    target: &PassTarget,
    source: &'static str,
    report: &PassReport,
    duration: Duration,
) -> PassSummary {
    PassSummary {
        target: target.label(),
        source: source.to_string(),
        scanned: report.scanned,
        generated: report.generated,
        unchanged: report.unchanged,
        removed: report.removed,
        failed: report.failures.len(),
        duration_ms: duration.as_millis() as u64,
        finished_at_unix: unix_seconds_now(),
    }
}

async fn enqueue_pass(
    pass_tx: &mpsc::Sender<PassJob>,
    target: PassTarget,
    source: &'static str,
) -> Result<PassSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    pass_tx
        .send(PassJob {
            target,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("pass queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("pass response"))?;
    outcome.map_err(DaemonError::Protocol)
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    home: PathBuf,
    stats: Arc<RwLock<RuntimeStats>>,
    pass_tx: mpsc::Sender<PassJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let home = home.clone();
                let stats = stats.clone();
                let pass_tx = pass_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        stats,
                        pass_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    stats: Arc<RwLock<RuntimeStats>>,
    pass_tx: mpsc::Sender<PassJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<DaemonRequest, _> = serde_json::from_str(&line);
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let cmd = request.cmd.clone();
        let response = match cmd.as_str() {
            "status" => {
                let payload =
                    build_status_payload(&home, stats.clone(), started_at_unix).await;
                DaemonResponse::ok(payload)
            }
            "sync" => {
                let target = match request.root {
                    Some(root) => PassTarget::Root(PathBuf::from(root)),
                    None => PassTarget::All,
                };
                match enqueue_pass(&pass_tx, target, "socket").await {
                    Ok(summary) => DaemonResponse::ok(json!(summary)),
                    Err(err) => DaemonResponse::error(err.to_string()),
                }
            }
            "cleanup" => match request.prefix {
                Some(prefix) => {
                    match enqueue_pass(&pass_tx, PassTarget::Prefix(prefix), "socket").await {
                        Ok(summary) => DaemonResponse::ok(json!(summary)),
                        Err(err) => DaemonResponse::error(err.to_string()),
                    }
                }
                None => DaemonResponse::error("cleanup requires a prefix"),
            },
            "stop" => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(
    home: &Path,
    stats: Arc<RwLock<RuntimeStats>>,
    started_at_unix: u64,
) -> Value {
    let job = job::synchronizer_job();
    let (expression, roots) = match config::load_at(home) {
        Ok(cfg) => (
            cfg.expression
                .unwrap_or_else(|| job.expression.to_string()),
            cfg.roots,
        ),
        Err(_) => (job.expression.to_string(), Vec::new()),
    };

    let snapshot = {
        let guard = stats.read().await;
        guard.clone()
    };

    json!({
        "running": true,
        "label": DAEMON_LABEL,
        "job": job.name,
        "singleton": job.singleton,
        "expression": expression,
        "started_at_unix": started_at_unix,
        "passes": snapshot.passes,
        "last_pass": snapshot.last_pass,
        "roots": roots,
        "socket": socket_path(home).display().to_string(),
        "state_db": state::db_path_at(home).display().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Housekeeping
// ---------------------------------------------------------------------------

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    // Skip the first (immediate) tick to avoid rotating on startup.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                tokio::task::spawn_blocking(move || {
                    crate::log_rotation::rotate_logs(&home);
                })
                .await
                .ok(); // rotation errors are logged inside rotate_logs; never crash the daemon
            }
        }
    }
    Ok(())
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = stencil_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    let logs = logs_dir(home);
    if !logs.exists() {
        fs::create_dir_all(&logs).map_err(|e| io_err(&logs, e))?;
    }
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
