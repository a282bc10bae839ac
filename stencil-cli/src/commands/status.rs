//! `stencil status` — tracked artifacts and daemon visibility.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stencil_core::{
    config,
    state::{SqliteStateStore, StateStore},
    types::ArtifactKind,
};
use stencil_daemon::{request_status, DaemonError};

/// Arguments for `stencil status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let cfg = config::load_at(&home).context("failed to load configuration")?;
        let store =
            SqliteStateStore::open_at(&home).context("failed to open the state database")?;
        let records = load_records(&store)?;
        let daemon = daemon_status(&home);

        if self.json {
            print_json(&cfg.roots, records, daemon)?;
            return Ok(());
        }

        print_human(&cfg.roots, records, daemon);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct TrackedRecord {
    location: String,
    kind: String,
    fingerprint: String,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "location")]
    location: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "fingerprint")]
    fingerprint: String,
}

fn load_records(store: &dyn StateStore) -> Result<Vec<TrackedRecord>> {
    let mut records = Vec::new();
    for location in store
        .locations_with_prefix("")
        .context("failed to list tracked artifacts")?
    {
        let fingerprint = store
            .get(&location)
            .context("failed to read tracked artifact")?
            .map(|fp| fp.0)
            .unwrap_or_default();
        let kind = ArtifactKind::for_location(&location)
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        records.push(TrackedRecord {
            location: location.0,
            kind,
            fingerprint,
        });
    }
    Ok(records)
}

fn daemon_status(home: &Path) -> serde_json::Value {
    match request_status(home) {
        Ok(status) => status,
        Err(DaemonError::DaemonNotRunning { socket }) => serde_json::json!({
            "running": false,
            "socket": socket.display().to_string(),
        }),
        Err(err) => serde_json::json!({
            "running": false,
            "error": err.to_string(),
        }),
    }
}

#[derive(Serialize)]
struct StatusJson {
    roots: Vec<PathBuf>,
    tracked: usize,
    records: Vec<TrackedRecord>,
    daemon: serde_json::Value,
}

fn print_json(
    roots: &[PathBuf],
    records: Vec<TrackedRecord>,
    daemon: serde_json::Value,
) -> Result<()> {
    let payload = StatusJson {
        roots: roots.to_vec(),
        tracked: records.len(),
        records,
        daemon,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_human(roots: &[PathBuf], records: Vec<TrackedRecord>, daemon: serde_json::Value) {
    println!(
        "Stencil v{} | {} root(s) | {} tracked artifact(s)",
        env!("CARGO_PKG_VERSION"),
        roots.len(),
        records.len(),
    );

    for root in roots {
        println!("  root: {}", root.display());
    }

    if records.is_empty() {
        println!("No artifacts tracked yet. Run 'stencil sync' after registering a root.");
    } else {
        let rows: Vec<RecordRow> = records
            .into_iter()
            .map(|record| RecordRow {
                location: record.location,
                kind: record.kind,
                fingerprint: short_fingerprint(&record.fingerprint),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    print_daemon_line(&daemon);
}

fn print_daemon_line(daemon: &serde_json::Value) {
    let running = daemon
        .get("running")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if !running {
        println!("daemon: {}", "not running".yellow());
        return;
    }

    let expression = daemon
        .get("expression")
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    let last_pass = daemon
        .get("last_pass")
        .and_then(|v| v.get("finished_at_unix"))
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "daemon: {} (cadence '{}', last pass {})",
        "running".green(),
        expression,
        last_pass
    );
}

fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}
