//! Idempotent power-on through the hypervisor's control programs.

use std::sync::Arc;

use tracing::debug;

use crate::executor::{CommandOutput, CommandRunner};
use crate::logging::Logger;
use crate::target::ValidatedTarget;

/// Substring of `status` output that marks a workload as already up.
const RUNNING_MARKER: &str = "running";

/// Result of a power-on attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    /// The workload was already running; no start was issued.
    AlreadyRunning,
    /// A start command was issued and succeeded.
    Started,
}

/// Failures while checking or starting a workload.
#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    /// `status` could not be run or exited non-zero; no start was attempted.
    #[error("failed to check status of {label} {id} - {name}: {reason}")]
    Status {
        /// `VM` or `LXC`.
        label: &'static str,
        /// Workload id.
        id: String,
        /// Workload name.
        name: String,
        /// What went wrong.
        reason: String,
    },
    /// `start` could not be run or exited non-zero.
    #[error("failed to start {label} {id} - {name}: {reason}")]
    Start {
        /// `VM` or `LXC`.
        label: &'static str,
        /// Workload id.
        id: String,
        /// Workload name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Starts validated workloads unless they are already running.
#[derive(Clone)]
pub struct PowerDispatcher {
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
}

impl PowerDispatcher {
    /// Create a dispatcher using `runner` for `qm`/`pct` calls.
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Logger) -> Self {
        Self { runner, logger }
    }

    /// Check the workload's state and start it if it is not running.
    ///
    /// Runs `<program> status <id>`; if the output mentions `running`,
    /// logs and returns [`PowerOutcome::AlreadyRunning`] without starting.
    /// Otherwise runs `<program> start <id>` exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::Status`] or [`PowerError::Start`] when the
    /// respective command cannot be run or exits non-zero. Nothing is retried.
    pub async fn power_on(&self, target: &ValidatedTarget) -> Result<PowerOutcome, PowerError> {
        let kind = target.kind();
        let program = kind.program();
        let label = kind.label();
        let id = target.id();
        let name = target.name();

        let status = run_checked(self.runner.as_ref(), program, &["status", id])
            .await
            .map_err(|reason| PowerError::Status {
                label,
                id: id.to_owned(),
                name: name.to_owned(),
                reason,
            })?;

        if status.output().contains(RUNNING_MARKER) {
            self.logger
                .info(format!("{label} {id} - {name} is already running"));
            return Ok(PowerOutcome::AlreadyRunning);
        }
        debug!(program, id, "workload not running, starting");

        run_checked(self.runner.as_ref(), program, &["start", id])
            .await
            .map_err(|reason| PowerError::Start {
                label,
                id: id.to_owned(),
                name: name.to_owned(),
                reason,
            })?;

        self.logger.info(format!("Powered on {label} {id} - {name}"));
        Ok(PowerOutcome::Started)
    }
}

/// Run a command and turn spawn failures and non-zero exits into a reason.
async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, String> {
    let output = runner.run(program, args).await.map_err(|e| e.to_string())?;
    if !output.success() {
        let detail = output.output();
        return Err(match output.exit_code {
            Some(code) if detail.is_empty() => format!("exit status {code}"),
            Some(code) => format!("exit status {code}: {detail}"),
            None => format!("terminated by signal: {detail}"),
        });
    }
    Ok(output)
}
