//! Declared metadata for the scheduled synchronizer job.

use std::str::FromStr;

use cron::Schedule;
use serde::Serialize;

/// Cadence used when the configuration does not override it.
///
/// Six-field cron with seconds: fire at second 0 and 55 of every minute.
pub const DEFAULT_EXPRESSION: &str = "0/55 * * * * *";

/// Static description of the scheduled job, the daemon's contract with its
/// operators: what fires, how often, and under which execution guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDefinition {
    pub name: &'static str,
    pub group: &'static str,
    /// Module path of the runtime that executes the job.
    pub module: &'static str,
    pub description: &'static str,
    pub expression: &'static str,
    /// Always true: at most one pass runs at any instant, system-wide.
    pub singleton: bool,
}

/// The one job this daemon schedules.
pub fn synchronizer_job() -> JobDefinition {
    JobDefinition {
        name: "stencil-internal-artifact-synchronizer-job",
        group: "internal",
        module: "stencil_daemon::runtime",
        description: "Stencil artifact synchronizer job",
        expression: DEFAULT_EXPRESSION,
        singleton: true,
    }
}

impl JobDefinition {
    /// Parse this job's cron expression.
    pub fn schedule(&self) -> Result<Schedule, cron::error::Error> {
        Schedule::from_str(self.expression)
    }
}
