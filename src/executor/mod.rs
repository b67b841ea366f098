//! External command execution used by the power dispatcher.
//!
//! Commands are always given as a program plus a separate argument vector.
//! Nothing is passed through a shell, so ids and names derived from network
//! payloads and descriptor files cannot inject extra commands.

use async_trait::async_trait;

pub mod host;

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code (`None` when killed by a signal).
    pub exit_code: Option<i32>,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Combined stdout+stderr output, separated by a newline when both are non-empty.
    pub fn output(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Errors produced while invoking a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The process could not be spawned.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The blocking task running the command panicked or was cancelled.
    #[error("{program} task failed: {reason}")]
    Fault {
        /// Program name.
        program: String,
        /// Join error description.
        reason: String,
    },
}

/// Runs external programs and captures their output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit.
    ///
    /// A non-zero exit is not an error at this layer; inspect
    /// [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}
