use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use stencil_core::config;

fn stencil_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_stencil") {
        return PathBuf::from(path);
    }

    let this_test = std::env::current_exe().expect("current_exe");
    let deps_dir = this_test.parent().expect("deps dir");
    let debug_dir = deps_dir.parent().expect("debug dir");

    let direct = {
        #[cfg(windows)]
        {
            debug_dir.join("stencil.exe")
        }
        #[cfg(not(windows))]
        {
            debug_dir.join("stencil")
        }
    };
    if direct.exists() {
        return direct;
    }

    let mut candidates: Vec<_> = std::fs::read_dir(deps_dir)
        .expect("read deps dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            name.starts_with("stencil-") && !name.ends_with(".d") && p.is_file()
        })
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .expect("unable to locate stencil binary in target/debug or target/debug/deps")
}

struct DaemonProcess {
    child: Child,
    binary: PathBuf,
    home: PathBuf,
}

impl DaemonProcess {
    fn start(binary: PathBuf, home: PathBuf) -> Self {
        let child = Command::new(&binary)
            .env("HOME", &home)
            .env("USERPROFILE", &home)
            .args(["daemon", "start"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn daemon");

        Self {
            child,
            binary,
            home,
        }
    }

    fn stop(&mut self) {
        let _ = Command::new(&self.binary)
            .env("HOME", &self.home)
            .env("USERPROFILE", &self.home)
            .args(["daemon", "stop"])
            .status();

        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            sleep(Duration::from_millis(50));
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

fn daemon_status(binary: &Path, home: &Path) -> Option<serde_json::Value> {
    let output = Command::new(binary)
        .env("HOME", home)
        .env("USERPROFILE", home)
        .args(["daemon", "status"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    serde_json::from_slice(&output.stdout).ok()
}

fn daemon_running(binary: &Path, home: &Path) -> bool {
    daemon_status(binary, home)
        .and_then(|value| value.get("running").and_then(|v| v.as_bool()))
        .unwrap_or(false)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn scheduled_firings_synchronize_registered_roots() {
    let home = TempDir::new().expect("home");
    let tree = TempDir::new().expect("tree");

    // Register the root and a fast cadence before the daemon boots.
    let mut cfg = config::Config::default();
    cfg.add_root(tree.path().canonicalize().expect("canonical tree"));
    cfg.expression = Some("* * * * * *".to_string());
    config::save_at(home.path(), &cfg).expect("save config");

    let binary = stencil_bin_path();
    let mut daemon = DaemonProcess::start(binary.clone(), home.path().to_path_buf());
    assert!(
        wait_until(Duration::from_secs(5), || daemon_running(
            &binary,
            home.path()
        )),
        "daemon did not report running state in time",
    );

    let status = daemon_status(&binary, home.path()).expect("status payload");
    assert_eq!(status["singleton"], serde_json::json!(true));
    assert_eq!(status["expression"], serde_json::json!("* * * * * *"));

    // A new artifact appears; the next firing must pick it up unprompted.
    let source = tree.path().join("auto.jslib");
    std::fs::write(&source, "function auto() {\n}\n").expect("write artifact");

    let output = tree.path().join("auto.exports.js");
    assert!(
        wait_until(Duration::from_secs(10), || output.exists()),
        "scheduled pass did not generate output within timeout",
    );

    // The artifact disappears; a later firing prunes record and output.
    std::fs::remove_file(&source).expect("remove artifact");
    assert!(
        wait_until(Duration::from_secs(10), || !output.exists()),
        "scheduled pass did not prune removed artifact within timeout",
    );

    daemon.stop();
}

#[test]
fn manual_sync_routes_through_the_running_daemon() {
    let home = TempDir::new().expect("home");
    let tree = TempDir::new().expect("tree");

    // Slow cadence so only the manual request can do the work.
    let mut cfg = config::Config::default();
    cfg.add_root(tree.path().canonicalize().expect("canonical tree"));
    cfg.expression = Some("0 0 0 1 1 *".to_string());
    config::save_at(home.path(), &cfg).expect("save config");

    std::fs::write(tree.path().join("manual.jslib"), "function manual() {\n}\n")
        .expect("write artifact");

    let binary = stencil_bin_path();
    let mut daemon = DaemonProcess::start(binary.clone(), home.path().to_path_buf());
    assert!(
        wait_until(Duration::from_secs(5), || daemon_running(
            &binary,
            home.path()
        )),
        "daemon did not report running state in time",
    );

    let output = Command::new(&binary)
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .arg("sync")
        .output()
        .expect("run stencil sync");
    assert!(
        output.status.success(),
        "sync failed: {}",
        String::from_utf8_lossy(&output.stderr),
    );
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(
        stdout.contains("via daemon"),
        "sync should route through the daemon: {stdout}"
    );
    assert!(tree.path().join("manual.exports.js").exists());

    let status = daemon_status(&binary, home.path()).expect("status payload");
    assert_eq!(status["last_pass"]["source"], serde_json::json!("socket"));

    daemon.stop();
}
