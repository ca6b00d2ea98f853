// src/system/transport.rs

//! The transports that actually run a composed command string.
//!
//! A transport knows nothing about session state: it receives one fully
//! composed command, runs it to completion, and reports the captured
//! outcome. Connection-level problems (a missing `ssh` binary, a spawn
//! failure) surface as errors distinct from "the command ran and failed".

use crate::models::{ExecOptions, ExecResult, RemoteTarget};
use std::io::Write;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Command '{command}' could not be executed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Shell invocation '{0}' could not be parsed.")]
    ShellParse(String),
    #[error("Command exited with status {}.", .0.exit_status)]
    UnexpectedExit(ExecResult),
}

/// Whether a transport reaches a remote host or the local machine. The
/// session layer uses this to raise the kind-matching failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    Remote,
    Local,
}

/// A mechanism that executes one command string and captures its outcome.
///
/// Contract: a command that *ran* and exited non-zero is returned as an
/// `Err(TransportError::UnexpectedExit)` carrying the full result, unless
/// `warn_only` asked for it back as a plain `Ok`. A command that could not
/// be started at all is a different error kind and carries no result.
pub trait Transport {
    fn locality(&self) -> Locality;

    fn execute(&mut self, command: &str, opts: &ExecOptions)
    -> Result<ExecResult, TransportError>;
}

/// Runs `output`-style capture on a prepared process invocation and applies
/// the shared suppress/warn-only handling. Both concrete transports funnel
/// through here so they cannot drift apart.
fn capture(
    mut process: StdCommand,
    command: &str,
    opts: &ExecOptions,
) -> Result<ExecResult, TransportError> {
    let output = process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| TransportError::CommandFailed {
            command: command.to_string(),
            source: e,
        })?;

    let stdout = String::from_utf8(output.stdout).map_err(|e| TransportError::InvalidUtf8Output {
        command: command.to_string(),
        source: e,
    })?;
    let stderr = String::from_utf8(output.stderr).map_err(|e| TransportError::InvalidUtf8Output {
        command: command.to_string(),
        source: e,
    })?;

    if !opts.suppress {
        // Mirror the captured streams once the command is done. Not a live
        // relay, but enough for interactive troubleshooting.
        print!("{stdout}");
        eprint!("{stderr}");
        let _ = std::io::stdout().flush();
    }

    let result = ExecResult {
        exit_status: output.status.code().unwrap_or(-1),
        stdout,
        stderr,
    };

    if !result.success() && !opts.warn_only {
        return Err(TransportError::UnexpectedExit(result));
    }
    Ok(result)
}

/// Executes commands on a remote host through the system `ssh` client, one
/// subprocess per command. The remote login shell interprets the command
/// string, so `~`, `$HOME` and relative paths are expanded remotely.
#[derive(Debug, Clone)]
pub struct SshTransport {
    target: RemoteTarget,
}

impl SshTransport {
    pub fn new(target: RemoteTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }
}

impl Transport for SshTransport {
    fn locality(&self) -> Locality {
        Locality::Remote
    }

    fn execute(
        &mut self,
        command: &str,
        opts: &ExecOptions,
    ) -> Result<ExecResult, TransportError> {
        log::debug!("ssh {}: {}", self.target.destination(), command);
        let mut process = StdCommand::new("ssh");
        process.arg(self.target.destination()).arg(command);
        capture(process, command, opts)
    }
}

/// Executes commands through a local shell subprocess (`sh -c` by default).
#[derive(Debug, Clone)]
pub struct LocalShellTransport {
    program: String,
    args: Vec<String>,
}

impl Default for LocalShellTransport {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

impl LocalShellTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom shell invocation, e.g. `"bash -c"` when commands rely
    /// on bashisms such as `source`.
    pub fn with_shell(invocation: &str) -> Result<Self, TransportError> {
        let mut parts = shlex::split(invocation)
            .ok_or_else(|| TransportError::ShellParse(invocation.to_string()))?;
        if parts.is_empty() {
            return Err(TransportError::ShellParse(invocation.to_string()));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

impl Transport for LocalShellTransport {
    fn locality(&self) -> Locality {
        Locality::Local
    }

    fn execute(
        &mut self,
        command: &str,
        opts: &ExecOptions,
    ) -> Result<ExecResult, TransportError> {
        log::debug!("{} {:?}: {}", self.program, self.args, command);
        let mut process = StdCommand::new(&self.program);
        process.args(&self.args).arg(command);
        capture(process, command, opts)
    }
}

// MARK: --- UNIT TESTS ---
