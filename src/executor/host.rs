//! Host process runner backed by `std::process::Command`.

use std::process::Stdio;

use tracing::debug;

use super::{CommandError, CommandOutput, CommandRunner};

/// Runs commands directly on the host.
///
/// Each invocation runs on tokio's blocking pool so a slow `qm` or `pct`
/// only holds up the session that issued it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRunner;

impl HostRunner {
    /// Create a host runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let program_owned = program.to_owned();
        let args_owned: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        debug!(program = %program, args = ?args, "running command");

        let result = tokio::task::spawn_blocking(move || {
            std::process::Command::new(&program_owned)
                .args(&args_owned)
                .stdin(Stdio::null())
                .output()
        })
        .await
        .map_err(|e| CommandError::Fault {
            program: program.to_owned(),
            reason: e.to_string(),
        })?;

        let output = result.map_err(|source| CommandError::Spawn {
            program: program.to_owned(),
            source,
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
        })
    }
}
