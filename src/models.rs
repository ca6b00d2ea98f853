// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// The captured outcome of one executed command, identical in shape for
/// remote and local transports. Created per execution, never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Exit status reported by the shell. `-1` if the process was killed
    /// before reporting one (e.g. by a signal).
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// `true` when the command reported a zero exit status.
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Transport-level execution hints. These never change what the session
/// layer does; they only steer how the transport runs one command.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ExecOptions {
    /// Do not mirror the captured output to the caller's terminal.
    pub suppress: bool,
    /// Return a non-zero exit as an ordinary `ExecResult` instead of an
    /// `UnexpectedExit` error.
    pub warn_only: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            suppress: true,
            warn_only: false,
        }
    }
}

/// Per-call options for [`Session::run`](crate::Session::run).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunOptions {
    /// Prefix the command with the stored working directory, if any.
    pub use_dir: bool,
    /// Prefix the command with the stored activation script, if any.
    pub use_venv: bool,
    /// Passed through to the transport: hide the command's output.
    pub suppress: bool,
    /// Passed through to the transport: do not fail the call on a non-zero
    /// exit. The session still applies its own strictness afterwards.
    pub warn_only: bool,
    /// Echo the composed command instead of executing it.
    pub dry_run: bool,
    /// Override the session's strict flag for this call only.
    pub strict_override: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_dir: true,
            use_venv: true,
            suppress: true,
            warn_only: false,
            dry_run: false,
            strict_override: None,
        }
    }
}

impl RunOptions {
    /// Options for commands the session issues on its own behalf (directory
    /// and activation probes): output hidden, exit status left for the
    /// session to judge.
    pub(crate) fn probe() -> Self {
        Self {
            warn_only: true,
            ..Self::default()
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn warn_only() -> Self {
        Self {
            warn_only: true,
            ..Self::default()
        }
    }
}

/// Address of a remote host reachable through the system `ssh` client.
/// Authentication (keys, agent, ssh config) is the client's business.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: Option<String>,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            host: host.into(),
            user: user.map(str::to_string),
        }
    }

    /// The `[user@]host` destination string handed to `ssh`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.destination())
    }
}
