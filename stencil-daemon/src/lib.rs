//! Daemon runtime: cron scheduler + singleton pass processor + socket server.

mod error;
pub mod job;
pub mod launchd;
pub mod log_rotation;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use job::{synchronizer_job, JobDefinition};
pub use launchd::{generate_plist, install as install_launchd, uninstall as uninstall_launchd};
pub use protocol::{
    request_cleanup, request_status, request_stop, request_sync, send_request, DaemonRequest,
    DaemonResponse,
};
pub use runtime::{run, start_blocking, PassSummary};
