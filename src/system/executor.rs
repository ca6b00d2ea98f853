// src/system/executor.rs

//! The stateful session layer.
//!
//! A [`Session`] wraps a transport and remembers two pieces of shell
//! context between calls: the working directory and an activated
//! environment script. Neither lives in a real shell process; both are
//! replayed as prefixes on every outgoing command (see
//! [`compose`](super::compose)). The session also owns the failure policy:
//! in strict mode a non-zero exit raises a typed error, otherwise it is
//! logged and handed back to the caller.

use crate::models::{ExecOptions, ExecResult, RemoteTarget, RunOptions};
use crate::system::compose;
use crate::system::transport::{Locality, LocalShellTransport, SshTransport, Transport, TransportError};
use colored::Colorize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Remote command '{command}' failed: {detail}")]
    Remote { command: String, detail: String },
    #[error("Local command '{command}' failed: {detail}")]
    Local { command: String, detail: String },
    /// The transport itself was unusable (spawn failure, bad output
    /// encoding). Never produced for a command that merely exited non-zero.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A command-execution session that behaves like a continuously maintained
/// shell, without keeping a shell process alive.
///
/// State is private to one instance and every operation takes `&mut self`,
/// so one session serves one logical workflow at a time. Workflows needing
/// independent working directories on the same host must each own a
/// session.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    dir: Option<String>,
    venv: Option<String>,
    strict: bool,
}

/// A session executing on a remote host through the system `ssh` client.
pub type RemoteSession = Session<SshTransport>;

/// A session executing through a local shell subprocess.
pub type LocalSession = Session<LocalShellTransport>;

impl RemoteSession {
    pub fn open(target: RemoteTarget, strict: bool) -> Self {
        Self::new(SshTransport::new(target), strict)
    }
}

impl LocalSession {
    pub fn open(strict: bool) -> Self {
        Self::new(LocalShellTransport::new(), strict)
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, strict: bool) -> Self {
        Self {
            transport,
            dir: None,
            venv: None,
            strict,
        }
    }

    /// The stored working directory, always a `pwd`-confirmed absolute
    /// path. `None` means commands run in the transport's default location.
    pub fn dir(&self) -> Option<&str> {
        self.dir.as_deref()
    }

    /// The stored activation script, always an absolute path.
    pub fn venv(&self) -> Option<&str> {
        self.venv.as_deref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Changes the stored working directory, or clears it when `path` is
    /// `None`.
    ///
    /// The change is validated by round-tripping `cd <path> && pwd` through
    /// the transport, and what gets stored is the canonical absolute path
    /// `pwd` printed, never the raw argument. Relative paths, `~` and shell
    /// variables therefore work: the shell on the other side expands them.
    /// The probe runs with the current stored state applied, so successive
    /// relative `chdir` calls compose.
    ///
    /// On a failed probe: strict mode raises the kind-matching error with
    /// the captured stderr, otherwise the failure is logged and the stored
    /// directory stays as it was.
    pub fn chdir(&mut self, path: Option<&str>) -> Result<(), ExecError> {
        let Some(path) = path else {
            self.dir = None;
            return Ok(());
        };
        let probe = format!("cd {path} && pwd");
        let res = self.issue(&probe, &RunOptions::probe())?;
        if !res.success() {
            return self.enforce("Could not change directory", &probe, &res);
        }
        self.dir = Some(res.stdout.trim().to_string());
        Ok(())
    }

    /// Activates an environment script (e.g. a virtualenv's
    /// `bin/activate`), to be sourced ahead of every subsequent command.
    ///
    /// The script path is split on its last `/`; the directory part is
    /// canonicalized with the same `pwd` probe as [`Session::chdir`] so the
    /// stored activation path is absolute even when the argument was
    /// relative. A path without a slash resolves against the session's
    /// current context. The `source` itself is then executed once to verify
    /// the script before it is stored.
    ///
    /// Returns the exit status of the command that decided the outcome
    /// (`0` on success). Failures follow the strict/non-strict policy and
    /// leave the activation unset.
    pub fn activate_env(&mut self, path: &str) -> Result<i32, ExecError> {
        let (dir_part, script) = match path.rsplit_once('/') {
            Some(("", script)) => ("/", script),
            Some(split) => split,
            None => (".", path),
        };
        let probe = format!("cd {dir_part} && pwd");
        let res = self.issue(&probe, &RunOptions::probe())?;
        if !res.success() {
            self.enforce("Could not resolve the activation script path", &probe, &res)?;
            return Ok(res.exit_status);
        }
        let abspath = format!("{}/{}", res.stdout.trim(), script);

        let command = format!("source {abspath}");
        let res = self.issue(&command, &RunOptions::probe())?;
        if !res.success() {
            self.enforce("Could not activate the environment", &command, &res)?;
            return Ok(res.exit_status);
        }
        self.venv = Some(abspath);
        Ok(res.exit_status)
    }

    /// Clears the stored activation unconditionally. No command is issued
    /// and this never fails.
    pub fn deactivate_env(&mut self) {
        self.venv = None;
    }

    /// Composes the stored state into `command` and executes it.
    ///
    /// Returns `Ok(None)` for a dry run (the composed command is echoed,
    /// nothing executes, nothing can fail). Otherwise the result is
    /// inspected against the effective strictness (`strict_override` if
    /// set, the session flag if not): strict raises the kind-matching
    /// [`ExecError`], non-strict logs and returns the failing result.
    ///
    /// `warn_only` and the session's strictness are independent gates: the
    /// first tells the *transport* not to fail the call on a non-zero exit,
    /// but a strict session will still raise afterwards.
    pub fn run(&mut self, command: &str, opts: &RunOptions) -> Result<Option<ExecResult>, ExecError> {
        let composed = self.compose_with_state(command, opts);
        if opts.dry_run {
            println!("{} {}", "→".blue(), composed.green());
            return Ok(None);
        }
        let res = self.execute(&composed, opts)?;
        if !res.success() {
            if opts.strict_override.unwrap_or(self.strict) {
                return Err(self.classify(&composed, &res));
            }
            log::warn!(
                "Command '{}' exited with status {}: {}",
                composed,
                res.exit_status,
                res.stderr.trim()
            );
        }
        Ok(Some(res))
    }

    /// Like [`Session::run`], but hands back the command's stdout trimmed
    /// of surrounding whitespace. The dry-run `None` passes through.
    pub fn get_output(&mut self, command: &str, opts: &RunOptions) -> Result<Option<String>, ExecError> {
        Ok(self
            .run(command, opts)?
            .map(|res| res.stdout.trim().to_string()))
    }

    fn compose_with_state(&self, command: &str, opts: &RunOptions) -> String {
        compose::compose_command(
            command,
            self.dir.as_deref().filter(|_| opts.use_dir),
            self.venv.as_deref().filter(|_| opts.use_venv),
        )
    }

    /// Internal execution path for self-issued probes: composed with the
    /// stored state, output suppressed, exit status left for the caller to
    /// judge.
    fn issue(&mut self, command: &str, opts: &RunOptions) -> Result<ExecResult, ExecError> {
        let composed = self.compose_with_state(command, opts);
        self.execute(&composed, opts)
    }

    fn execute(&mut self, composed: &str, opts: &RunOptions) -> Result<ExecResult, ExecError> {
        log::debug!("Executing: {composed}");
        let exec_opts = ExecOptions {
            suppress: opts.suppress,
            warn_only: opts.warn_only,
        };
        match self.transport.execute(composed, &exec_opts) {
            Ok(res) => Ok(res),
            // A ran-but-failed command comes back wrapped in the transport's
            // error path; unwrap it so both paths share one result shape.
            Err(TransportError::UnexpectedExit(res)) => Ok(res),
            Err(e) => Err(ExecError::Transport(e)),
        }
    }

    /// Applies the session's configured strictness to a failed internal
    /// operation: raise with the captured stderr, or log and carry on.
    fn enforce(&self, what: &str, command: &str, res: &ExecResult) -> Result<(), ExecError> {
        if self.strict {
            return Err(self.classify(command, res));
        }
        log::warn!("{}. Error message: {}", what, res.stderr.trim());
        Ok(())
    }

    fn classify(&self, command: &str, res: &ExecResult) -> ExecError {
        let stderr = res.stderr.trim();
        let detail = if stderr.is_empty() {
            format!("exit status {}", res.exit_status)
        } else {
            stderr.to_string()
        };
        match self.transport.locality() {
            Locality::Remote => ExecError::Remote {
                command: command.to_string(),
                detail,
            },
            Locality::Local => ExecError::Local {
                command: command.to_string(),
                detail,
            },
        }
    }
}

// MARK: --- UNIT TESTS ---


// MARK: --- LOCAL END-TO-END TESTS ---

#[cfg(test)]
mod local_tests {
    use super::*;
    use std::fs;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_chdir_changes_where_commands_run() {
        init_logging();
        let scratch = tempfile::tempdir().unwrap();
        fs::create_dir(scratch.path().join("inner")).unwrap();
        fs::write(scratch.path().join("inner/marker.txt"), "x").unwrap();

        let mut session = LocalSession::open(true);
        let before = session
            .get_output("ls", &RunOptions::default())
            .unwrap()
            .unwrap();

        let inner = scratch.path().join("inner").display().to_string();
        session.chdir(Some(&inner)).unwrap();
        let after = session
            .get_output("ls", &RunOptions::default())
            .unwrap()
            .unwrap();
        let again = session
            .get_output("ls", &RunOptions::default())
            .unwrap()
            .unwrap();

        assert_ne!(before, after);
        assert_eq!(after, "marker.txt");
        // Repeated reads under fixed state are identical.
        assert_eq!(after, again);

        // The stored directory is exactly what `pwd` reports from inside.
        let pwd = session
            .get_output("pwd", &RunOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(session.dir(), Some(pwd.as_str()));

        session.chdir(None).unwrap();
        let reverted = session
            .get_output("ls", &RunOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(before, reverted);
    }

    #[test]
    fn test_relative_chdir_resolves_against_stored_directory() {
        init_logging();
        let scratch = tempfile::tempdir().unwrap();
        fs::create_dir(scratch.path().join("a")).unwrap();
        fs::create_dir(scratch.path().join("a/b")).unwrap();

        let mut session = LocalSession::open(true);
        let root = scratch.path().display().to_string();
        session.chdir(Some(&root)).unwrap();
        session.chdir(Some("a")).unwrap();
        session.chdir(Some("b")).unwrap();

        let dir = session.dir().unwrap();
        assert!(dir.ends_with("/a/b"), "unexpected dir: {dir}");
    }

    #[test]
    fn test_chdir_to_missing_path_strict_and_nonstrict() {
        init_logging();
        let mut session = LocalSession::open(true);
        let err = session.chdir(Some("comex-no-such-dir-3b1d")).unwrap_err();
        assert!(matches!(err, ExecError::Local { .. }));
        assert_eq!(session.dir(), None);

        session.set_strict(false);
        session.chdir(Some("comex-no-such-dir-3b1d")).unwrap();
        assert_eq!(session.dir(), None);
    }

    #[test]
    fn test_failing_command_strict_and_nonstrict() {
        init_logging();
        let mut session = LocalSession::open(true);
        let err = session
            .run("ls comex-no-such-file-7c2a", &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExecError::Local { .. }));

        session.set_strict(false);
        let res = session
            .run("ls comex-no-such-file-7c2a", &RunOptions::default())
            .unwrap()
            .unwrap();
        assert_ne!(res.exit_status, 0);
        assert!(!res.stderr.is_empty());
    }

    #[test]
    fn test_activation_script_shapes_later_commands() {
        init_logging();
        let scratch = tempfile::tempdir().unwrap();
        fs::write(
            scratch.path().join("activate"),
            "export COMEX_TEST_MARKER=armed\n",
        )
        .unwrap();

        // `source` is a bashism; the default `sh` may be dash.
        let shell = LocalShellTransport::with_shell("bash -c").unwrap();
        let mut session = Session::new(shell, true);

        let script = scratch.path().join("activate").display().to_string();
        let status = session.activate_env(&script).unwrap();
        assert_eq!(status, 0);
        assert!(session.venv().is_some());

        let marker = session
            .get_output("echo \"$COMEX_TEST_MARKER\"", &RunOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(marker, "armed");

        session.deactivate_env();
        let marker = session
            .get_output("echo \"$COMEX_TEST_MARKER\"", &RunOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(marker, "");
    }

    #[test]
    fn test_activation_failure_with_real_shell() {
        init_logging();
        let shell = LocalShellTransport::with_shell("bash -c").unwrap();
        let mut session = Session::new(shell, true);

        let err = session.activate_env("/comex-missing/activate").unwrap_err();
        assert!(matches!(err, ExecError::Local { .. }));
        assert_eq!(session.venv(), None);
    }
}
