//! Stateful command execution over SSH and local shell sessions.
//!
//! A [`Session`] remembers the working directory and an activated
//! environment script across successive command invocations, without
//! keeping a persistent shell process alive: every outgoing command is
//! prefixed with the stored context before it is handed to a transport
//! (the system `ssh` client, or a local shell subprocess). Directory
//! changes are validated and canonicalized through a `pwd` round-trip, so
//! relative paths, `~` and shell variables all work: they are expanded by
//! the shell on the executing side.
//!
//! ```no_run
//! use comex::{RemoteSession, RemoteTarget, RunOptions};
//!
//! # fn main() -> Result<(), comex::ExecError> {
//! let target = RemoteTarget::new("uberspace.de", Some("alice"));
//! let mut session = RemoteSession::open(target, true);
//!
//! session.chdir(Some("~/html"))?;
//! session.activate_env("~/venvs/site/bin/activate")?;
//! let _version = session.get_output("python --version", &RunOptions::default())?;
//! # Ok(()) }
//! ```
//!
//! In strict mode every non-zero exit raises a typed error carrying the
//! captured stderr ([`ExecError::Remote`] or [`ExecError::Local`],
//! matching the transport); in non-strict mode failures are logged and the
//! result is returned for the caller to inspect. Sessions are synchronous
//! and single-threaded: one outstanding command at a time, no retries, no
//! timeouts.

pub mod models;
pub mod system;

pub use models::{ExecOptions, ExecResult, RemoteTarget, RunOptions};
pub use system::executor::{ExecError, LocalSession, RemoteSession, Session};
pub use system::transport::{
    Locality, LocalShellTransport, SshTransport, Transport, TransportError,
};
